//! Pipeline configuration.
//!
//! Loaded once from a JSON file, validated eagerly, and threaded by value
//! into every component constructor. Invalid layout geometry is rejected here
//! before any state is touched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use shorts_media::layout::{Canvas, Planner};

use crate::error::{PipelineError, PipelineResult};

/// Working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Downloaded source videos
    #[serde(default = "default_downloads_dir")]
    pub downloads: PathBuf,
    /// Cut and composed segments
    #[serde(default = "default_processed_dir")]
    pub processed: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads: default_downloads_dir(),
            processed: default_processed_dir(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

/// Output canvas and segmenting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    /// Strip at the top of the canvas reserved for the part label
    #[serde(default = "default_header_height")]
    pub header_height: u32,
    /// Target duration of each cut segment
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,
    /// Hard cap on segments per source video; excess segments are dropped
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            header_height: default_header_height(),
            segment_seconds: default_segment_seconds(),
            max_segments: default_max_segments(),
            frame_rate: default_frame_rate(),
        }
    }
}

fn default_canvas_width() -> u32 {
    1080
}

fn default_canvas_height() -> u32 {
    1920
}

fn default_header_height() -> u32 {
    180
}

fn default_segment_seconds() -> u32 {
    60
}

fn default_max_segments() -> usize {
    10
}

fn default_frame_rate() -> u32 {
    30
}

/// Split-screen mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitScreenConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fraction of the non-header canvas given to the main content
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
    /// Mirror the main stream horizontally
    #[serde(default = "default_mirror_main")]
    pub mirror_main: bool,
    /// Directory of filler clips stacked beneath the main content
    #[serde(default = "default_filler_dir")]
    pub filler_dir: PathBuf,
}

impl Default for SplitScreenConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_fraction: default_top_fraction(),
            mirror_main: default_mirror_main(),
            filler_dir: default_filler_dir(),
        }
    }
}

fn default_top_fraction() -> f64 {
    0.70
}

fn default_mirror_main() -> bool {
    true
}

fn default_filler_dir() -> PathBuf {
    PathBuf::from("assets/filler")
}

/// Header label settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Label text, `{n}` substituted with the part number
    #[serde(default = "default_part_text_format")]
    pub part_text_format: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            part_text_format: default_part_text_format(),
            font_size: default_font_size(),
        }
    }
}

fn default_part_text_format() -> String {
    "Part {n}".to_string()
}

fn default_font_size() -> u32 {
    80
}

/// Publish settings. Templates substitute `{title}`, `{part}`, `{total}` and
/// `{url}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_title_template")]
    pub title_template: String,
    #[serde(default = "default_description_template")]
    pub description_template: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default = "default_privacy_status")]
    pub privacy_status: String,
    /// Rate-limiting pause between consecutive uploads, skipped after the
    /// final one
    #[serde(default = "default_upload_delay_secs")]
    pub delay_between_uploads_secs: u64,
    /// Environment variable holding the upload bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            title_template: default_title_template(),
            description_template: default_description_template(),
            tags: Vec::new(),
            category_id: default_category_id(),
            privacy_status: default_privacy_status(),
            delay_between_uploads_secs: default_upload_delay_secs(),
            token_env: default_token_env(),
        }
    }
}

fn default_title_template() -> String {
    "{title} - Part {part} #shorts".to_string()
}

fn default_description_template() -> String {
    "{title} (Part {part}/{total})\nFull video: {url}".to_string()
}

fn default_category_id() -> String {
    "24".to_string()
}

fn default_privacy_status() -> String {
    "public".to_string()
}

fn default_upload_delay_secs() -> u64 {
    10
}

fn default_token_env() -> String {
    "SHORTS_UPLOAD_TOKEN".to_string()
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source channel URL to scrape
    pub channel_url: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub split_screen: SplitScreenConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::config(format!("invalid {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configured geometry and settings. Called before any state
    /// is read or mutated.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.channel_url.is_empty() {
            return Err(PipelineError::config("channel_url must be set"));
        }
        if self.video.segment_seconds == 0 {
            return Err(PipelineError::config("segment_seconds must be positive"));
        }
        if self.video.max_segments == 0 {
            return Err(PipelineError::config("max_segments must be positive"));
        }
        // The planner enforces the layout constraints (fraction range, header
        // fitting the canvas); an invalid combination is fatal here.
        Planner::new(
            Canvas::new(self.video.canvas_width, self.video.canvas_height),
            self.video.header_height,
            self.split_screen.top_fraction,
            self.split_screen.mirror_main,
        )
        .map_err(|e| PipelineError::config(e.to_string()))?;
        Ok(())
    }

    /// Create the working directories.
    pub async fn ensure_directories(&self) -> PipelineResult<()> {
        tokio::fs::create_dir_all(&self.paths.downloads).await?;
        tokio::fs::create_dir_all(&self.paths.processed).await?;
        Ok(())
    }
}
