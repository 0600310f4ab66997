//! Channel-to-shorts automation pipeline.
//!
//! Tracks every discovered source video through
//! discover -> download -> split/compose -> publish, persisting state after
//! each transition so an interrupted run resumes where it left off.

pub mod compose;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod scrape;
pub mod tracking;
pub mod upload;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{Collaborators, EditedSegment, PipelineOrchestrator, PublishOutcome};
pub use tracking::TrackingStore;
