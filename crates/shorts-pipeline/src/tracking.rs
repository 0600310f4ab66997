//! Durable tracking store.
//!
//! One JSON file holding the whole [`TrackingState`]. Saves go through a
//! temp file in the same directory followed by an atomic rename, so a crash
//! mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};
use tracing::debug;

use shorts_models::TrackingState;

use crate::error::PipelineResult;

/// File-backed store for the tracking state.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    path: PathBuf,
}

impl TrackingStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or an empty default when the file does not
    /// exist yet.
    pub async fn load(&self) -> PipelineResult<TrackingState> {
        if !self.path.exists() {
            debug!("No tracking file at {}, starting empty", self.path.display());
            return Ok(TrackingState::default());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let state = serde_json::from_str(&raw)?;
        Ok(state)
    }

    /// Persist the full state atomically.
    pub async fn save(&self, state: &TrackingState) -> PipelineResult<()> {
        let json = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Temp file in the same directory so the rename stays on one
        // filesystem
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(
            "Saved tracking state ({} videos) to {}",
            state.videos.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shorts_models::{ScrapedVideo, VideoId};
    use tempfile::TempDir;

    fn scraped(id: &str) -> ScrapedVideo {
        ScrapedVideo {
            id: VideoId::from(id),
            title: "T".to_string(),
            view_count: 1,
            duration_label: "1:00".to_string(),
            published_label: "now".to_string(),
            url: format!("https://www.youtube.com/watch?v={id}"),
        }
    }

    #[tokio::test]
    async fn test_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::new(dir.path().join("tracking.json"));
        let state = store.load().await.unwrap();
        assert!(state.videos.is_empty());
        assert!(state.last_discovery.is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::new(dir.path().join("tracking.json"));

        let mut state = TrackingState::default();
        state.merge_discovered("chan", &[scraped("a"), scraped("b")]);
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.channel_url, "chan");
        assert_eq!(loaded.videos.len(), 2);
        let ids: Vec<&str> = loaded.videos.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        let store = TrackingStore::new(&path);
        store.save(&TrackingState::default()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::new(dir.path().join("state").join("tracking.json"));
        store.save(&TrackingState::default()).await.unwrap();
        assert!(store.path().exists());
    }
}
