//! Segment composer.
//!
//! Turns one cut segment into the finished vertical output: probes the
//! source, plans the composition (split screen over a random filler clip
//! when enabled and available, blurred-background otherwise), renders the
//! header label, and runs the single FFmpeg pass that applies the filter
//! graph and encodes the result.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use shorts_media::filtergraph::FilterGraph;
use shorts_media::layout::{Canvas, LayoutPlan, Planner};
use shorts_media::{overlay, probe, FfmpegCommand};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::Composer;

/// Composed outputs below this size are treated as encoder failures.
const MIN_OUTPUT_BYTES: u64 = 1000;

pub struct SegmentComposer {
    planner: Planner,
    split_enabled: bool,
    filler_dir: PathBuf,
    processed_dir: PathBuf,
    part_text_format: String,
    font_size: u32,
    frame_rate: u32,
}

impl SegmentComposer {
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        let planner = Planner::new(
            Canvas::new(config.video.canvas_width, config.video.canvas_height),
            config.video.header_height,
            config.split_screen.top_fraction,
            config.split_screen.mirror_main,
        )?;
        Ok(Self {
            planner,
            split_enabled: config.split_screen.enabled,
            filler_dir: config.split_screen.filler_dir.clone(),
            processed_dir: config.paths.processed.clone(),
            part_text_format: config.overlay.part_text_format.clone(),
            font_size: config.overlay.font_size,
            frame_rate: config.video.frame_rate,
        })
    }

    fn label_text(&self, part: u32) -> String {
        self.part_text_format.replace("{n}", &part.to_string())
    }

    /// Pick a filler clip at random, or `None` when split mode is off or the
    /// filler directory has nothing usable.
    fn pick_filler(&self) -> Option<PathBuf> {
        if !self.split_enabled {
            return None;
        }
        let clips = list_filler_clips(&self.filler_dir);
        if clips.is_empty() {
            warn!(
                "No filler clips in {}, falling back to blur mode",
                self.filler_dir.display()
            );
            return None;
        }
        clips.choose(&mut rand::rng()).cloned()
    }
}

#[async_trait]
impl Composer for SegmentComposer {
    async fn compose(&self, segment: &Path, part: u32) -> PipelineResult<PathBuf> {
        let info = probe::probe_video(segment).await?;
        debug!(
            "Composing {} ({}x{}, {:.1}s) as part {part}",
            segment.display(),
            info.width,
            info.height,
            info.duration
        );

        let output = edited_output_path(&self.processed_dir, segment)?;
        let label = output.with_extension("label.png");
        let canvas = self.planner.canvas();
        overlay::render_label(
            &self.label_text(part),
            canvas.width,
            self.planner.header_height(),
            self.font_size,
            &label,
        )
        .await?;

        let mut command = FfmpegCommand::new(segment, &output);
        let plan = match self.pick_filler() {
            Some(filler) => {
                let filler_duration = probe::get_duration(&filler).await?;
                let layout = self.planner.plan_split(info.duration, filler_duration);
                info!(
                    "Split composition: {} over {} (window start {:.1}s)",
                    segment.display(),
                    filler.display(),
                    layout.filler_start
                );
                command = command.windowed_input(&filler, layout.filler_start, info.duration);
                LayoutPlan::Split(layout)
            }
            None => {
                let layout = self.planner.plan_blur(info.width, info.height);
                info!(
                    "Blur composition ({:?}): {}",
                    layout.branch,
                    segment.display()
                );
                LayoutPlan::Blur(layout)
            }
        };
        let graph = FilterGraph::from_plan(&plan);

        let result = command
            .input(&label)
            .filter_complex(graph.render())
            .map(graph.video_output_spec())
            .map(graph.audio_map.stream_spec())
            .video_codec("libx264")
            .preset("slow")
            .crf(23)
            .audio_codec("aac")
            .audio_bitrate("256k")
            .frame_rate(self.frame_rate)
            .output_args(["-movflags", "+faststart"])
            .run()
            .await;

        let _ = tokio::fs::remove_file(&label).await;
        result?;

        verify_output(&output).await?;
        Ok(output)
    }
}

/// `<processed>/<segment stem>_edited.mp4`.
fn edited_output_path(processed_dir: &Path, segment: &Path) -> PipelineResult<PathBuf> {
    let stem = segment
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            PipelineError::processing_failed(format!("bad segment path {}", segment.display()))
        })?;
    Ok(processed_dir.join(format!("{stem}_edited.mp4")))
}

fn list_filler_clips(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut clips: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "mp4"))
        .collect();
    clips.sort();
    clips
}

/// A present but near-empty file means the encode died after creating the
/// output.
async fn verify_output(path: &Path) -> PipelineResult<()> {
    let metadata = tokio::fs::metadata(path).await.map_err(|_| {
        PipelineError::processing_failed(format!("output {} was not created", path.display()))
    })?;
    if metadata.len() <= MIN_OUTPUT_BYTES {
        return Err(PipelineError::processing_failed(format!(
            "output {} is only {} bytes",
            path.display(),
            metadata.len()
        )));
    }
    Ok(())
}
