//! Header label rendering.
//!
//! Produces the "Part N" label image that the filter graph overlays onto the
//! header strip: an opaque black band of exactly the header height with the
//! text centered in white. Rendered with a one-shot FFmpeg invocation
//! (`color` source + `drawtext`) rather than an in-process rasterizer.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Render `text` onto a `width` x `header_height` black strip at `output`
/// (PNG).
pub async fn render_label(
    text: &str,
    width: u32,
    header_height: u32,
    font_size: u32,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let output = output.as_ref();
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let source = format!("color=c=black:s={width}x{header_height}:d=1");
    let drawtext = format!(
        "drawtext=text='{}':fontcolor=white:fontsize={font_size}:x=(w-text_w)/2:y=(h-text_h)/2",
        escape_drawtext(text)
    );

    debug!("Rendering label {:?} to {}", text, output.display());

    let result = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", &source])
        .args(["-vf", &drawtext, "-frames:v", "1"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "label rendering failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }

    Ok(())
}

/// Escape text for use inside a single-quoted drawtext value.
///
/// drawtext treats `\`, `'`, `:` and `%` specially; everything else passes
/// through.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_text() {
        assert_eq!(escape_drawtext("Part 3"), "Part 3");
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape_drawtext("10:30"), "10\\:30");
        assert_eq!(escape_drawtext("it's"), "it\\'s");
        assert_eq!(escape_drawtext("100%"), "100\\%");
        assert_eq!(escape_drawtext("a\\b"), "a\\\\b");
    }
}
