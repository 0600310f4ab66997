//! Video download using yt-dlp.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};

/// Minimum file size (bytes) below which an existing download is treated as a
/// truncated artifact and redone.
const MIN_VIDEO_FILE_SIZE: u64 = 1024 * 1024;

/// Download a video from `url` to `output_path` using yt-dlp.
///
/// If the file already exists and looks complete the download is skipped, so
/// re-running an interrupted pipeline does not refetch the source.
pub async fn download_video(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if output_path.exists() {
        if let Ok(metadata) = output_path.metadata() {
            if metadata.len() > MIN_VIDEO_FILE_SIZE {
                info!("Using existing video file: {}", output_path.display());
                return Ok(());
            }
            warn!(
                "Existing file {} is too small ({} bytes), re-downloading",
                output_path.display(),
                metadata.len()
            );
            tokio::fs::remove_file(output_path).await?;
        }
    }

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!("Downloading {} to {}", url, output_path.display());

    let output_path_str = output_path.to_string_lossy();
    let output = Command::new("yt-dlp")
        .args([
            "-f",
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            "--merge-output-format",
            "mp4",
            "--no-playlist",
            "-o",
            output_path_str.as_ref(),
            url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::download_failed(format!(
            "yt-dlp exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }

    // yt-dlp returning 0 without producing the file still counts as a failure
    match output_path.metadata() {
        Ok(metadata) if metadata.len() > 0 => {
            info!(
                "Downloaded {} ({} bytes)",
                output_path.display(),
                metadata.len()
            );
            Ok(())
        }
        _ => Err(MediaError::download_failed(format!(
            "yt-dlp produced no output at {}",
            output_path.display()
        ))),
    }
}
