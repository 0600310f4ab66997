//! Persisted tracking state: ordered id -> record mapping plus channel
//! metadata.
//!
//! The map keeps insertion order, which is discovery order (newest first from
//! the scraper). Selection for processing walks that order; it is never
//! re-ranked by view count.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::{ScrapedVideo, VideoId, VideoRecord, VideoStatus};

/// Outcome of merging a scraped listing into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    /// Records inserted as pending
    pub inserted: usize,
    /// Existing records whose volatile fields were refreshed
    pub refreshed: usize,
}

/// Whole-file tracking state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingState {
    /// Source channel URL of the last discovery
    #[serde(default)]
    pub channel_url: String,

    /// Timestamp of the last discovery pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_discovery: Option<DateTime<Utc>>,

    /// Discovery-ordered mapping of video id -> record
    #[serde(default)]
    pub videos: IndexMap<VideoId, VideoRecord>,
}

impl TrackingState {
    /// Merge a scraped listing into the state.
    ///
    /// New ids are appended as pending records. Existing ids only get their
    /// volatile fields refreshed; status, part ids and timestamps are never
    /// touched by discovery.
    pub fn merge_discovered(&mut self, channel_url: &str, videos: &[ScrapedVideo]) -> MergeStats {
        self.channel_url = channel_url.to_string();
        self.last_discovery = Some(Utc::now());

        let mut stats = MergeStats::default();
        for video in videos {
            match self.videos.get_mut(&video.id) {
                Some(record) => {
                    record.refresh(video);
                    stats.refreshed += 1;
                }
                None => {
                    self.videos
                        .insert(video.id.clone(), VideoRecord::from_scraped(video));
                    stats.inserted += 1;
                }
            }
        }
        stats
    }

    /// First record in discovery order that is not completed, or `None` when
    /// everything is done. Partial records are eligible again here.
    pub fn next_actionable(&self) -> Option<(&VideoId, &VideoRecord)> {
        self.videos
            .iter()
            .find(|(_, record)| record.status != VideoStatus::Completed)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &VideoId) -> Option<&VideoRecord> {
        self.videos.get(id)
    }

    /// Mutable lookup, used by the orchestrator's read-modify-persist cycle.
    pub fn get_mut(&mut self, id: &VideoId) -> Option<&mut VideoRecord> {
        self.videos.get_mut(id)
    }

    /// Replace a whole record. All persisted mutation goes through whole-record
    /// replacement; there is no partial field patching in the store contract.
    pub fn put(&mut self, id: VideoId, record: VideoRecord) {
        self.videos.insert(id, record);
    }

    /// Count of records per status, for the status report.
    pub fn status_counts(&self) -> Vec<(VideoStatus, usize)> {
        let mut counts: Vec<(VideoStatus, usize)> = Vec::new();
        for record in self.videos.values() {
            match counts.iter_mut().find(|(s, _)| *s == record.status) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.status, 1)),
            }
        }
        counts
    }
}
