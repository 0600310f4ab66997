//! Shared data models for the shorts pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Per-video tracking records and their status lifecycle
//! - Scraped channel listings
//! - The persisted tracking state (ordered mapping + global metadata)

pub mod record;
pub mod tracking;

// Re-export common types
pub use record::{ScrapedVideo, VideoId, VideoRecord, VideoStatus};
pub use tracking::{MergeStats, TrackingState};
