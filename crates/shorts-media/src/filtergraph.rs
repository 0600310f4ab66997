//! Filter graph builder.
//!
//! Translates a [`LayoutPlan`](crate::layout::LayoutPlan) into an ordered
//! composition program: typed transformation steps with named input/output
//! streams, rendered separately to FFmpeg `filter_complex` syntax. Keeping
//! the steps typed makes the branching testable without string matching, and
//! the renderer is deterministic for a given layout; all randomness lives in
//! the planner.
//!
//! Stream numbering convention: input 0 is the main segment; in split mode
//! input 1 is the filler clip and input 2 the header label, in blur mode
//! input 1 is the header label. Audio always comes from input 0 only.

use std::fmt::Write as _;

use crate::layout::{AspectBranch, BlurLayout, LayoutPlan, SplitLayout};

/// One transformation applied within a step's filter chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Mirror horizontally
    HFlip,
    /// Scale so the frame covers the box, preserving aspect
    ScaleCover { width: u32, height: u32 },
    /// Scale to a width, height following at an even value
    ScaleWidth { width: u32 },
    /// Scale to exact dimensions
    ScaleExact { width: u32, height: u32 },
    /// Center crop to the box
    Crop { width: u32, height: u32 },
    /// Gaussian blur
    Blur { sigma: f64 },
    /// Brightness/saturation adjustment
    Tone { brightness: f64, saturation: f64 },
    /// Duplicate the stream into `count` outputs
    FanOut { count: u32 },
    /// Stack inputs vertically
    VStack,
    /// Grow the canvas, pushing content below the header strip
    PadBelowHeader { width: u32, height: u32, header: u32 },
    /// Overlay the second input centered on the first
    OverlayCentered,
    /// Overlay the second input horizontally centered, anchored to the top
    OverlayTopCentered,
}

impl FilterOp {
    fn render(&self) -> String {
        match *self {
            FilterOp::HFlip => "hflip".to_string(),
            FilterOp::ScaleCover { width, height } => {
                format!("scale={width}:{height}:force_original_aspect_ratio=increase")
            }
            FilterOp::ScaleWidth { width } => format!("scale={width}:-2"),
            FilterOp::ScaleExact { width, height } => format!("scale={width}:{height}"),
            FilterOp::Crop { width, height } => format!("crop={width}:{height}"),
            FilterOp::Blur { sigma } => format!("gblur=sigma={sigma}"),
            FilterOp::Tone {
                brightness,
                saturation,
            } => format!("eq=brightness={brightness}:saturation={saturation}"),
            FilterOp::FanOut { count } => format!("split={count}"),
            FilterOp::VStack => "vstack".to_string(),
            FilterOp::PadBelowHeader {
                width,
                height,
                header,
            } => format!("pad={width}:{height}:0:{header}:black"),
            FilterOp::OverlayCentered => "overlay=(W-w)/2:(H-h)/2".to_string(),
            FilterOp::OverlayTopCentered => "overlay=(W-w)/2:0".to_string(),
        }
    }
}

/// One step: named inputs, a chain of ops, named outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    pub inputs: Vec<String>,
    pub ops: Vec<FilterOp>,
    pub outputs: Vec<String>,
}

impl FilterStep {
    fn new<I, O>(inputs: I, ops: Vec<FilterOp>, outputs: O) -> Self
    where
        I: IntoIterator<Item = &'static str>,
        O: IntoIterator<Item = &'static str>,
    {
        Self {
            inputs: inputs.into_iter().map(String::from).collect(),
            ops,
            outputs: outputs.into_iter().map(String::from).collect(),
        }
    }
}

/// How the audio stream is mapped alongside the composed video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMap {
    /// `0:a` — the main segment must carry audio (split mode)
    MainRequired,
    /// `0:a?` — pass audio through if the main segment has it (blur mode)
    MainOptional,
}

impl AudioMap {
    pub fn stream_spec(&self) -> &'static str {
        match self {
            AudioMap::MainRequired => "0:a",
            AudioMap::MainOptional => "0:a?",
        }
    }
}

/// An ordered composition program with one named video output.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub steps: Vec<FilterStep>,
    pub video_output: String,
    pub audio_map: AudioMap,
}

impl FilterGraph {
    /// Build the program for a computed layout plan.
    pub fn from_plan(plan: &LayoutPlan) -> Self {
        match plan {
            LayoutPlan::Split(layout) => Self::split_screen(layout),
            LayoutPlan::Blur(layout) => Self::blur_background(layout),
        }
    }

    /// Build the split-screen program: main over filler under the header,
    /// label overlaid last.
    pub fn split_screen(layout: &SplitLayout) -> Self {
        let w = layout.canvas.width;
        let h = layout.canvas.height;

        let mut main_ops = Vec::new();
        if layout.mirror_main {
            main_ops.push(FilterOp::HFlip);
        }
        main_ops.push(FilterOp::ScaleCover {
            width: w,
            height: layout.top_height,
        });
        main_ops.push(FilterOp::Crop {
            width: w,
            height: layout.top_height,
        });

        let steps = vec![
            FilterStep::new(["0:v"], main_ops, ["top"]),
            FilterStep::new(
                ["1:v"],
                vec![
                    FilterOp::ScaleCover {
                        width: w,
                        height: layout.bottom_height,
                    },
                    FilterOp::Crop {
                        width: w,
                        height: layout.bottom_height,
                    },
                ],
                ["bottom"],
            ),
            FilterStep::new(["top", "bottom"], vec![FilterOp::VStack], ["stacked"]),
            FilterStep::new(
                ["stacked"],
                vec![FilterOp::PadBelowHeader {
                    width: w,
                    height: h,
                    header: layout.header_height,
                }],
                ["padded"],
            ),
            FilterStep::new(
                ["padded", "2:v"],
                vec![FilterOp::OverlayTopCentered],
                ["vout"],
            ),
        ];

        Self {
            steps,
            video_output: "vout".to_string(),
            audio_map: AudioMap::MainRequired,
        }
    }

    /// Build the blur-background program for the classified aspect branch.
    pub fn blur_background(layout: &BlurLayout) -> Self {
        let w = layout.canvas.width;
        let h = layout.canvas.height;

        let mut steps = match layout.branch {
            AspectBranch::WideSource => vec![
                FilterStep::new(["0:v"], vec![FilterOp::FanOut { count: 2 }], ["bg_in", "fg_in"]),
                FilterStep::new(
                    ["bg_in"],
                    vec![
                        FilterOp::ScaleCover { width: w, height: h },
                        FilterOp::Crop { width: w, height: h },
                        FilterOp::Blur { sigma: 18.0 },
                        FilterOp::Tone {
                            brightness: -0.3,
                            saturation: 0.5,
                        },
                    ],
                    ["bg"],
                ),
                FilterStep::new(["fg_in"], vec![FilterOp::ScaleWidth { width: w }], ["fg"]),
                FilterStep::new(["bg", "fg"], vec![FilterOp::OverlayCentered], ["base"]),
            ],
            AspectBranch::NarrowSource => vec![FilterStep::new(
                ["0:v"],
                vec![
                    FilterOp::ScaleWidth { width: w },
                    FilterOp::Crop { width: w, height: h },
                ],
                ["base"],
            )],
            // Same scale target, but the crop would be a no-op so it is omitted
            AspectBranch::ExactMatch => vec![FilterStep::new(
                ["0:v"],
                vec![FilterOp::ScaleExact { width: w, height: h }],
                ["base"],
            )],
        };

        steps.push(FilterStep::new(
            ["base", "1:v"],
            vec![FilterOp::OverlayTopCentered],
            ["vout"],
        ));

        Self {
            steps,
            video_output: "vout".to_string(),
            audio_map: AudioMap::MainOptional,
        }
    }

    /// Stream specifier of the composed video output, e.g. `[vout]`.
    pub fn video_output_spec(&self) -> String {
        format!("[{}]", self.video_output)
    }

    /// Render the program to FFmpeg `filter_complex` syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            for input in &step.inputs {
                let _ = write!(out, "[{input}]");
            }
            let chain: Vec<String> = step.ops.iter().map(FilterOp::render).collect();
            out.push_str(&chain.join(","));
            for output in &step.outputs {
                let _ = write!(out, "[{output}]");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BlurLayout, Canvas, SplitLayout};

    fn split_layout() -> SplitLayout {
        SplitLayout {
            canvas: Canvas::new(1080, 1920),
            header_height: 180,
            top_height: 1218,
            bottom_height: 522,
            mirror_main: true,
            filler_start: 0.0,
        }
    }

    fn blur_layout(branch: AspectBranch) -> BlurLayout {
        BlurLayout {
            canvas: Canvas::new(1080, 1920),
            header_height: 180,
            branch,
        }
    }

    #[test]
    fn test_split_render_matches_layout() {
        let graph = FilterGraph::split_screen(&split_layout());
        let rendered = graph.render();
        assert_eq!(
            rendered,
            "[0:v]hflip,scale=1080:1218:force_original_aspect_ratio=increase,crop=1080:1218[top];\
             [1:v]scale=1080:522:force_original_aspect_ratio=increase,crop=1080:522[bottom];\
             [top][bottom]vstack[stacked];\
             [stacked]pad=1080:1920:0:180:black[padded];\
             [padded][2:v]overlay=(W-w)/2:0[vout]"
        );
        assert_eq!(graph.audio_map, AudioMap::MainRequired);
    }

    #[test]
    fn test_split_without_mirror_has_no_hflip() {
        let mut layout = split_layout();
        layout.mirror_main = false;
        let graph = FilterGraph::split_screen(&layout);
        assert!(!graph.render().contains("hflip"));
    }

    #[test]
    fn test_split_pad_comes_after_stack() {
        let graph = FilterGraph::split_screen(&split_layout());
        let stack = graph
            .steps
            .iter()
            .position(|s| s.ops.contains(&FilterOp::VStack))
            .unwrap();
        let pad = graph
            .steps
            .iter()
            .position(|s| {
                s.ops
                    .iter()
                    .any(|op| matches!(op, FilterOp::PadBelowHeader { .. }))
            })
            .unwrap();
        assert!(pad > stack);
    }

    #[test]
    fn test_scaling_precedes_cropping_in_every_step() {
        for graph in [
            FilterGraph::split_screen(&split_layout()),
            FilterGraph::blur_background(&blur_layout(AspectBranch::WideSource)),
            FilterGraph::blur_background(&blur_layout(AspectBranch::NarrowSource)),
        ] {
            for step in &graph.steps {
                let scale = step.ops.iter().position(|op| {
                    matches!(
                        op,
                        FilterOp::ScaleCover { .. }
                            | FilterOp::ScaleWidth { .. }
                            | FilterOp::ScaleExact { .. }
                    )
                });
                let crop = step
                    .ops
                    .iter()
                    .position(|op| matches!(op, FilterOp::Crop { .. }));
                if let (Some(scale), Some(crop)) = (scale, crop) {
                    assert!(scale < crop, "crop before scale in {step:?}");
                }
            }
        }
    }

    #[test]
    fn test_label_overlay_is_always_last() {
        for graph in [
            FilterGraph::split_screen(&split_layout()),
            FilterGraph::blur_background(&blur_layout(AspectBranch::WideSource)),
            FilterGraph::blur_background(&blur_layout(AspectBranch::NarrowSource)),
            FilterGraph::blur_background(&blur_layout(AspectBranch::ExactMatch)),
        ] {
            let last = graph.steps.last().unwrap();
            assert_eq!(last.ops, vec![FilterOp::OverlayTopCentered]);
            assert_eq!(last.outputs, vec![graph.video_output.clone()]);
        }
    }

    #[test]
    fn test_blur_wide_branch_blurs_background_only() {
        let graph = FilterGraph::blur_background(&blur_layout(AspectBranch::WideSource));
        let rendered = graph.render();
        assert!(rendered.starts_with("[0:v]split=2[bg_in][fg_in];"));
        assert!(rendered.contains("gblur=sigma=18"));
        assert!(rendered.contains("eq=brightness=-0.3:saturation=0.5"));
        // Foreground keeps its aspect: scale to width only
        assert!(rendered.contains("[fg_in]scale=1080:-2[fg]"));
        assert_eq!(graph.audio_map, AudioMap::MainOptional);
    }

    #[test]
    fn test_blur_narrow_crops_but_exact_does_not() {
        let narrow = FilterGraph::blur_background(&blur_layout(AspectBranch::NarrowSource));
        assert!(narrow.render().contains("crop=1080:1920"));

        let exact = FilterGraph::blur_background(&blur_layout(AspectBranch::ExactMatch));
        let rendered = exact.render();
        assert!(rendered.contains("scale=1080:1920"));
        assert!(!rendered.contains("crop"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let layout = split_layout();
        assert_eq!(
            FilterGraph::split_screen(&layout).render(),
            FilterGraph::split_screen(&layout).render()
        );
    }

    #[test]
    fn test_from_plan_dispatches_on_mode() {
        let split = LayoutPlan::Split(split_layout());
        assert_eq!(
            FilterGraph::from_plan(&split),
            FilterGraph::split_screen(&split_layout())
        );

        let blur = LayoutPlan::Blur(blur_layout(AspectBranch::WideSource));
        assert_eq!(
            FilterGraph::from_plan(&blur),
            FilterGraph::blur_background(&blur_layout(AspectBranch::WideSource))
        );
    }
}
