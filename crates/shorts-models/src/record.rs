//! Per-video tracking records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a source video, as assigned by the source platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a tracked video.
///
/// Transitions only move forward: pending -> downloaded -> processed ->
/// completed. `Partial` is terminal but retryable: the record is picked up
/// again on the next run because it is not `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Discovered but not yet downloaded
    #[default]
    Pending,
    /// Source file downloaded
    Downloaded,
    /// Split and composed into edited segments
    Processed,
    /// Every segment published successfully
    Completed,
    /// Some but not all segments published
    Partial,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Downloaded => "downloaded",
            VideoStatus::Processed => "processed",
            VideoStatus::Completed => "completed",
            VideoStatus::Partial => "partial",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a scraped channel listing, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedVideo {
    pub id: VideoId,
    pub title: String,
    pub view_count: u64,
    pub duration_label: String,
    pub published_label: String,
    pub url: String,
}

/// Persisted state of one discovered source video.
///
/// Field names are part of the on-disk contract; the tracking file must stay
/// readable across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Video title (immutable after first discovery)
    pub title: String,

    /// Source watch URL (immutable after first discovery)
    pub source_url: String,

    /// View count, refreshed on re-discovery
    pub view_count: u64,

    /// Human duration label as scraped, e.g. "12:34"
    #[serde(default)]
    pub duration_label: String,

    /// Free-text publish label as scraped, e.g. "2 days ago"
    #[serde(default)]
    pub published_label: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: VideoStatus,

    /// Number of retained segments, set when processing completes
    #[serde(default)]
    pub total_parts: u32,

    /// External media ids of successfully published parts, in part order
    #[serde(default)]
    pub uploaded_part_ids: Vec<String>,

    /// Download timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,

    /// Timestamp of the most recent publish pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_upload_at: Option<DateTime<Utc>>,
}

impl VideoRecord {
    /// Create a fresh pending record from a scraped listing entry.
    pub fn from_scraped(video: &ScrapedVideo) -> Self {
        Self {
            title: video.title.clone(),
            source_url: video.url.clone(),
            view_count: video.view_count,
            duration_label: video.duration_label.clone(),
            published_label: video.published_label.clone(),
            status: VideoStatus::Pending,
            total_parts: 0,
            uploaded_part_ids: Vec::new(),
            downloaded_at: None,
            last_upload_at: None,
        }
    }

    /// Refresh the fields that change between scrapes. Status, part ids and
    /// timestamps are never touched here.
    pub fn refresh(&mut self, video: &ScrapedVideo) {
        self.view_count = video.view_count;
        self.duration_label = video.duration_label.clone();
        self.published_label = video.published_label.clone();
    }

    /// Mark the source file as downloaded.
    pub fn mark_downloaded(&mut self) {
        self.status = VideoStatus::Downloaded;
        self.downloaded_at = Some(Utc::now());
    }

    /// Mark splitting/composition as finished with the retained part count.
    pub fn mark_processed(&mut self, total_parts: u32) {
        self.status = VideoStatus::Processed;
        self.total_parts = total_parts;
    }

    /// Record the outcome of a publish pass.
    ///
    /// `uploaded_part_ids` holds this pass's successes in order; the part
    /// numbering is compacted to `1..=N` by position.
    pub fn mark_published(&mut self, uploaded_ids: Vec<String>, any_failed: bool) {
        self.uploaded_part_ids = uploaded_ids;
        self.last_upload_at = Some(Utc::now());
        self.status = if any_failed {
            VideoStatus::Partial
        } else {
            VideoStatus::Completed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped(id: &str, views: u64) -> ScrapedVideo {
        ScrapedVideo {
            id: VideoId::from(id),
            title: format!("Video {id}"),
            view_count: views,
            duration_label: "10:00".to_string(),
            published_label: "1 day ago".to_string(),
            url: format!("https://www.youtube.com/watch?v={id}"),
        }
    }

    #[test]
    fn test_new_record_is_pending() {
        let rec = VideoRecord::from_scraped(&scraped("abc", 100));
        assert_eq!(rec.status, VideoStatus::Pending);
        assert!(rec.uploaded_part_ids.is_empty());
        assert!(rec.downloaded_at.is_none());
    }

    #[test]
    fn test_refresh_leaves_lifecycle_untouched() {
        let mut rec = VideoRecord::from_scraped(&scraped("abc", 100));
        rec.mark_downloaded();
        rec.uploaded_part_ids = vec!["x".to_string()];
        let stamp = rec.downloaded_at;

        let mut update = scraped("abc", 5000);
        update.published_label = "2 days ago".to_string();
        rec.refresh(&update);

        assert_eq!(rec.view_count, 5000);
        assert_eq!(rec.published_label, "2 days ago");
        assert_eq!(rec.status, VideoStatus::Downloaded);
        assert_eq!(rec.uploaded_part_ids, vec!["x".to_string()]);
        assert_eq!(rec.downloaded_at, stamp);
    }

    #[test]
    fn test_publish_outcome_sets_status() {
        let mut rec = VideoRecord::from_scraped(&scraped("abc", 1));
        rec.mark_processed(3);

        rec.mark_published(vec!["a".into(), "b".into()], true);
        assert_eq!(rec.status, VideoStatus::Partial);
        assert_eq!(rec.uploaded_part_ids.len(), 2);

        rec.mark_published(vec!["a".into(), "b".into(), "c".into()], false);
        assert_eq!(rec.status, VideoStatus::Completed);
        assert_eq!(rec.uploaded_part_ids.len(), rec.total_parts as usize);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&VideoStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
        let back: VideoStatus = serde_json::from_str("\"downloaded\"").unwrap();
        assert_eq!(back, VideoStatus::Downloaded);
    }
}
