//! Pipeline orchestrator.
//!
//! Drives one video at a time through discover -> download -> split/compose
//! -> publish. Every public operation re-reads the tracking state, mutates
//! through whole-record replacement, and persists before returning, so a kill
//! at any point resumes from the last completed transition.
//!
//! Collaborator failures never escape: each one is logged and converted into
//! a status value or an empty result, and the next invocation naturally
//! re-selects any record that is not yet completed.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use shorts_models::{MergeStats, TrackingState, VideoId, VideoStatus};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::{Composer, Downloader, Pacer, Scraper, Splitter, UploadRequest, Uploader};
use crate::tracking::TrackingStore;

/// The external collaborators the orchestrator drives.
pub struct Collaborators {
    pub scraper: Box<dyn Scraper>,
    pub downloader: Box<dyn Downloader>,
    pub splitter: Box<dyn Splitter>,
    pub composer: Box<dyn Composer>,
    pub uploader: Box<dyn Uploader>,
    pub pacer: Box<dyn Pacer>,
}

/// One composed segment ready for publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedSegment {
    /// Part number baked into the segment's label
    pub part: u32,
    pub path: PathBuf,
}

/// Result of one publish pass.
#[derive(Debug, Clone, Default)]
pub struct PublishOutcome {
    /// External media ids of the successful uploads, in upload order
    pub uploaded: Vec<String>,
    /// Part numbers that failed to upload
    pub failed_parts: Vec<u32>,
}

impl PublishOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed_parts.is_empty()
    }
}

/// One line of the status report.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub id: VideoId,
    pub title: String,
    pub view_count: u64,
    pub duration_label: String,
    pub status: VideoStatus,
    pub uploaded_parts: usize,
    pub total_parts: u32,
    pub last_upload_at: Option<DateTime<Utc>>,
}

/// Snapshot of the tracking state for display.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub channel_url: String,
    pub last_discovery: Option<DateTime<Utc>>,
    pub total: usize,
    pub counts: Vec<(VideoStatus, usize)>,
    /// Pending records re-ranked by view count, highest first (display only;
    /// processing order stays discovery order)
    pub top_pending: Vec<ReportLine>,
    /// Most recently completed records, newest upload first
    pub recent_completed: Vec<ReportLine>,
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    store: TrackingStore,
    state: TrackingState,
    collaborators: Collaborators,
}

impl PipelineOrchestrator {
    /// Load the tracking state and wire up the collaborators.
    pub async fn open(
        config: PipelineConfig,
        store: TrackingStore,
        collaborators: Collaborators,
    ) -> PipelineResult<Self> {
        let state = store.load().await?;
        Ok(Self {
            config,
            store,
            state,
            collaborators,
        })
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    async fn persist(&self) -> PipelineResult<()> {
        self.store.save(&self.state).await
    }

    fn source_path(&self, id: &VideoId) -> PathBuf {
        self.config.paths.downloads.join(format!("{id}.mp4"))
    }

    /// Scrape the channel and merge the listing into the tracking state.
    /// New videos become pending; known videos only get their volatile fields
    /// refreshed.
    pub async fn discover(&mut self) -> PipelineResult<MergeStats> {
        let videos = self
            .collaborators
            .scraper
            .discover(&self.config.channel_url)
            .await?;
        let stats = self.state.merge_discovered(&self.config.channel_url, &videos);
        self.persist().await?;
        info!(
            "Discovery merged {} videos: {} new, {} refreshed",
            videos.len(),
            stats.inserted,
            stats.refreshed
        );
        Ok(stats)
    }

    /// First record in discovery order that is not completed.
    pub fn select_next(&self) -> Option<VideoId> {
        self.state.next_actionable().map(|(id, _)| id.clone())
    }

    /// Download the source file. Returns the local path on success; a failed
    /// download leaves the record pending for the next run.
    pub async fn advance_download(&mut self, id: &VideoId) -> PipelineResult<Option<PathBuf>> {
        let url = self
            .state
            .get(id)
            .map(|r| r.source_url.clone())
            .ok_or_else(|| PipelineError::inconsistent(format!("no record for {id}")))?;

        let result = match self.collaborators.downloader.fetch(&url, id).await {
            Ok(path) => {
                if let Some(record) = self.state.get_mut(id) {
                    record.mark_downloaded();
                }
                info!("Downloaded {id} to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Download failed for {id}: {e}");
                None
            }
        };
        self.persist().await?;
        Ok(result)
    }

    /// Cut the source into segments (capped at the configured maximum) and
    /// compose each one. Segments that fail composition are omitted; the
    /// record advances to processed with the surviving count, even when that
    /// count is zero. A failed cut leaves the record unadvanced.
    pub async fn advance_process(
        &mut self,
        id: &VideoId,
        source: &Path,
    ) -> PipelineResult<Vec<EditedSegment>> {
        let mut segments = match self
            .collaborators
            .splitter
            .cut(source, id, self.config.video.segment_seconds)
            .await
        {
            Ok(segments) => segments,
            Err(e) => {
                warn!("Splitting failed for {id}: {e}");
                self.persist().await?;
                return Ok(Vec::new());
            }
        };

        let cap = self.config.video.max_segments;
        if segments.len() > cap {
            warn!(
                "{id} produced {} segments, keeping the first {cap}",
                segments.len()
            );
            segments.truncate(cap);
        }

        let mut edited = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            let part = index as u32 + 1;
            match self.collaborators.composer.compose(segment, part).await {
                Ok(path) => edited.push(EditedSegment { part, path }),
                Err(e) => {
                    warn!("Composition failed for {} (part {part}): {e}", segment.display());
                }
            }
        }

        if let Some(record) = self.state.get_mut(id) {
            record.mark_processed(edited.len() as u32);
        }
        self.persist().await?;
        info!(
            "Processed {id}: {} of {} segments composed",
            edited.len(),
            segments.len()
        );
        Ok(edited)
    }

    /// Publish the composed segments in order, pausing between consecutive
    /// uploads (never after the last). The stored part ids are this pass's
    /// successes, renumbered contiguously by position.
    pub async fn advance_publish(
        &mut self,
        id: &VideoId,
        segments: &[EditedSegment],
    ) -> PipelineResult<PublishOutcome> {
        let record = self
            .state
            .get(id)
            .ok_or_else(|| PipelineError::inconsistent(format!("no record for {id}")))?;
        let title = record.title.clone();
        let url = record.source_url.clone();

        let total = segments.len();
        let delay = Duration::from_secs(self.config.upload.delay_between_uploads_secs);
        let mut outcome = PublishOutcome::default();

        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                self.collaborators.pacer.pause(delay).await;
            }
            let part = index as u32 + 1;
            let request = UploadRequest {
                path: segment.path.clone(),
                title: render_template(&self.config.upload.title_template, &title, part, total, &url),
                description: render_template(
                    &self.config.upload.description_template,
                    &title,
                    part,
                    total,
                    &url,
                ),
                tags: self.config.upload.tags.clone(),
                category_id: self.config.upload.category_id.clone(),
                privacy_status: self.config.upload.privacy_status.clone(),
            };

            match self.collaborators.uploader.publish(&request).await {
                Ok(media_id) => {
                    info!("Published part {part}/{total} of {id} as {media_id}");
                    outcome.uploaded.push(media_id);
                }
                Err(e) => {
                    warn!("Upload failed for part {part}/{total} of {id}: {e}");
                    outcome.failed_parts.push(part);
                }
            }
        }

        if let Some(record) = self.state.get_mut(id) {
            record.mark_published(outcome.uploaded.clone(), !outcome.all_succeeded());
        }
        self.persist().await?;
        Ok(outcome)
    }

    /// Locate the composed segments of an already-processed record on disk,
    /// for runs that resume at the publish stage. A record that claims parts
    /// but has no files yields an empty result, never fabricated paths.
    pub async fn find_processed_segments(
        &self,
        id: &VideoId,
    ) -> PipelineResult<Vec<EditedSegment>> {
        let prefix = format!("{id}_part");
        let mut paths = Vec::new();

        let dir = &self.config.paths.processed;
        if dir.exists() {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(&prefix) && name.ends_with("_edited.mp4") {
                    paths.push(entry.path());
                }
            }
        }
        paths.sort();

        if paths.is_empty() {
            if let Some(record) = self.state.get(id) {
                if record.total_parts > 0 {
                    warn!(
                        "{id} claims {} parts but no composed segments exist in {}",
                        record.total_parts,
                        dir.display()
                    );
                }
            }
        }

        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| EditedSegment {
                part: index as u32 + 1,
                path,
            })
            .collect())
    }

    /// Run one full cycle: discover, pick the first actionable video, and
    /// carry it as far as possible. Each stage that has nothing to act on
    /// short-circuits with a logged no-op.
    pub async fn run_full_cycle(&mut self) -> PipelineResult<()> {
        if let Err(e) = self.discover().await {
            warn!("Discovery failed ({e}), continuing with known records");
        }

        let Some(id) = self.select_next() else {
            info!("All tracked videos are completed, nothing to do");
            return Ok(());
        };
        let status = self
            .state
            .get(&id)
            .map(|r| r.status)
            .ok_or_else(|| PipelineError::inconsistent(format!("no record for {id}")))?;
        info!("Selected {id} ({status})");

        let mut source = None;
        if status == VideoStatus::Pending {
            source = self.advance_download(&id).await?;
            if source.is_none() {
                return Ok(());
            }
        }

        let mut segments = Vec::new();
        if self.current_status(&id) == Some(VideoStatus::Downloaded) {
            let source = source.unwrap_or_else(|| self.source_path(&id));
            segments = self.advance_process(&id, &source).await?;
            if self.current_status(&id) != Some(VideoStatus::Processed) {
                return Ok(());
            }
        }

        if matches!(
            self.current_status(&id),
            Some(VideoStatus::Processed) | Some(VideoStatus::Partial)
        ) {
            if segments.is_empty() {
                segments = self.find_processed_segments(&id).await?;
                if segments.is_empty() && self.claimed_parts(&id) > 0 {
                    // Publishing nothing would overwrite the part bookkeeping
                    // and mark the record completed without a single upload.
                    warn!("{id}: skipping publish until composed segments reappear");
                    return Ok(());
                }
            }
            let outcome = self.advance_publish(&id, &segments).await?;
            info!(
                "Published {} of {} parts for {id}",
                outcome.uploaded.len(),
                segments.len()
            );
        }

        Ok(())
    }

    fn current_status(&self, id: &VideoId) -> Option<VideoStatus> {
        self.state.get(id).map(|r| r.status)
    }

    /// Parts the record claims to have composed.
    pub fn claimed_parts(&self, id: &VideoId) -> u32 {
        self.state.get(id).map(|r| r.total_parts).unwrap_or(0)
    }

    /// Build the display snapshot of the tracking state.
    pub fn status_report(&self) -> StatusReport {
        let lines = |filter: &dyn Fn(&ReportLine) -> bool| -> Vec<ReportLine> {
            self.state
                .videos
                .iter()
                .map(|(id, record)| ReportLine {
                    id: id.clone(),
                    title: record.title.clone(),
                    view_count: record.view_count,
                    duration_label: record.duration_label.clone(),
                    status: record.status,
                    uploaded_parts: record.uploaded_part_ids.len(),
                    total_parts: record.total_parts,
                    last_upload_at: record.last_upload_at,
                })
                .filter(|line| filter(line))
                .collect()
        };

        let mut top_pending = lines(&|l| l.status == VideoStatus::Pending);
        top_pending.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        top_pending.truncate(5);

        let mut recent_completed = lines(&|l| l.status == VideoStatus::Completed);
        recent_completed.sort_by(|a, b| b.last_upload_at.cmp(&a.last_upload_at));
        recent_completed.truncate(5);

        StatusReport {
            channel_url: self.state.channel_url.clone(),
            last_discovery: self.state.last_discovery,
            total: self.state.videos.len(),
            counts: self.state.status_counts(),
            top_pending,
            recent_completed,
        }
    }
}

/// Substitute `{title}`, `{part}`, `{total}` and `{url}` in a template.
fn render_template(template: &str, title: &str, part: u32, total: usize, url: &str) -> String {
    template
        .replace("{title}", title)
        .replace("{part}", &part.to_string())
        .replace("{total}", &total.to_string())
        .replace("{url}", url)
}
