//! Media mechanism layer for the shorts pipeline.
//!
//! Wraps the external tools (FFmpeg, FFprobe, yt-dlp) and contains the two
//! pure pieces of the composition stage:
//!
//! - [`layout`]: the composition planner that turns source/target dimensions
//!   into a geometric layout plan (split screen or blurred background)
//! - [`filtergraph`]: the builder that turns a layout plan into an ordered,
//!   typed composition program and renders it to FFmpeg filter syntax

pub mod command;
pub mod download;
pub mod error;
pub mod filtergraph;
pub mod layout;
pub mod overlay;
pub mod probe;
pub mod split;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use filtergraph::{AudioMap, FilterGraph, FilterOp, FilterStep};
pub use layout::{AspectBranch, BlurLayout, Canvas, LayoutPlan, Planner, SplitLayout};
pub use probe::{probe_video, VideoInfo};
