//! Collaborator contracts.
//!
//! The orchestrator only ever talks to the outside world through these
//! traits. Real implementations live in [`crate::scrape`], [`crate::upload`],
//! [`crate::compose`] and the `shorts-media` wrappers; tests substitute
//! mocks.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shorts_models::{ScrapedVideo, VideoId};

use crate::error::PipelineResult;

/// Fetches the current video listing of a source channel, newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn discover(&self, channel_url: &str) -> PipelineResult<Vec<ScrapedVideo>>;
}

/// Downloads one source video to local storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, url: &str, id: &VideoId) -> PipelineResult<PathBuf>;
}

/// Cuts a source file into consecutive time-based segments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Splitter: Send + Sync {
    async fn cut(
        &self,
        path: &Path,
        id: &VideoId,
        segment_seconds: u32,
    ) -> PipelineResult<Vec<PathBuf>>;
}

/// Composes one cut segment into the vertical output format.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, segment: &Path, part: u32) -> PipelineResult<PathBuf>;
}

/// Everything the platform needs to publish one part.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: String,
}

/// Publishes one composed segment, returning the platform's media id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn publish(&self, request: &UploadRequest) -> PipelineResult<String>;
}

/// Inter-upload pacing. A trait so tests can count and skip the real sleep.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Pacer backed by the tokio timer.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Downloader backed by yt-dlp, writing `<downloads>/<id>.mp4`.
pub struct YtDlpDownloader {
    downloads_dir: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn fetch(&self, url: &str, id: &VideoId) -> PipelineResult<PathBuf> {
        let path = self.downloads_dir.join(format!("{id}.mp4"));
        shorts_media::download::download_video(url, &path).await?;
        Ok(path)
    }
}

/// Splitter backed by the FFmpeg segment muxer, cutting into the processed
/// directory.
pub struct SegmentSplitter {
    processed_dir: PathBuf,
}

impl SegmentSplitter {
    pub fn new(processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
        }
    }
}

#[async_trait]
impl Splitter for SegmentSplitter {
    async fn cut(
        &self,
        path: &Path,
        id: &VideoId,
        segment_seconds: u32,
    ) -> PipelineResult<Vec<PathBuf>> {
        let segments =
            shorts_media::split::cut_segments(path, &self.processed_dir, id.as_str(), segment_seconds)
                .await?;
        Ok(segments)
    }
}
