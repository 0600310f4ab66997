//! Time-based segment cutting via the FFmpeg segment muxer.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Cut `input` into consecutive segments of roughly `segment_seconds` each.
///
/// Streams are copied, not re-encoded; cut points land on keyframes so actual
/// segment durations wobble around the target. Output files are named
/// `<stem>_part000.mp4`, `_part001.mp4`, ... under `output_dir` and returned
/// in part order.
pub async fn cut_segments(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    stem: &str,
    segment_seconds: u32,
) -> MediaResult<Vec<PathBuf>> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
    tokio::fs::create_dir_all(output_dir).await?;

    let pattern = output_dir.join(format!("{stem}_part%03d.mp4"));
    debug!(
        "Splitting {} into {}s segments at {}",
        input.display(),
        segment_seconds,
        pattern.display()
    );

    let output = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args([
            "-c",
            "copy",
            "-map",
            "0",
            "-f",
            "segment",
            "-segment_time",
            &segment_seconds.to_string(),
            "-reset_timestamps",
            "1",
        ])
        .arg(&pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "segment cut failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    let segments = collect_segments(output_dir, stem).await?;
    info!("Cut {} into {} segments", input.display(), segments.len());
    Ok(segments)
}

/// Collect the cut segments for `stem`, sorted by part number (filename
/// order, since the index is zero-padded).
async fn collect_segments(output_dir: &Path, stem: &str) -> MediaResult<Vec<PathBuf>> {
    let prefix = format!("{stem}_part");
    let mut segments = Vec::new();

    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(".mp4") && !name.contains("_edited") {
            segments.push(entry.path());
        }
    }

    segments.sort();
    Ok(segments)
}
