//! Composition planner.
//!
//! Pure geometry: given source dimensions, the target canvas and the
//! configured split settings, compute the layout that the filter graph
//! builder turns into an FFmpeg composition program.
//!
//! Two modes exist. Split mode stacks the main segment above a filler clip
//! under a fixed header strip. Blur mode (used when no filler is available or
//! split is disabled) classifies the source aspect against the target aspect
//! and picks one of three scale/crop compositions. The header strip is
//! reserved for the text label in both modes and is never cropped into.

use rand::Rng;

use crate::error::{MediaError, MediaResult};

/// Output canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Geometry for split-screen composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitLayout {
    pub canvas: Canvas,
    /// Height of the strip reserved for the text label
    pub header_height: u32,
    /// Height of the main-content region (even)
    pub top_height: u32,
    /// Height of the filler region; header + top + bottom == canvas height
    pub bottom_height: u32,
    /// Mirror the main stream horizontally
    pub mirror_main: bool,
    /// Start offset into the filler clip, seconds
    pub filler_start: f64,
}

/// Which way the source aspect ratio deviates from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectBranch {
    /// Source is wider than the target: blurred full-bleed background with a
    /// sharp scaled-to-width foreground centered on top
    WideSource,
    /// Source is narrower: scale to target width, then crop to target height
    NarrowSource,
    /// Aspect ratios match exactly: scale only, the crop would be a no-op
    ExactMatch,
}

/// Geometry for blur-background composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurLayout {
    pub canvas: Canvas,
    pub header_height: u32,
    pub branch: AspectBranch,
}

/// A computed layout, one of the two composition modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutPlan {
    Split(SplitLayout),
    Blur(BlurLayout),
}

/// Composition planner. Construction validates the configured geometry;
/// an invalid fraction or header is a configuration error, not a runtime
/// fallback.
#[derive(Debug, Clone, Copy)]
pub struct Planner {
    canvas: Canvas,
    header_height: u32,
    top_fraction: f64,
    mirror_main: bool,
}

impl Planner {
    pub fn new(
        canvas: Canvas,
        header_height: u32,
        top_fraction: f64,
        mirror_main: bool,
    ) -> MediaResult<Self> {
        if !(top_fraction > 0.0 && top_fraction < 1.0) {
            return Err(MediaError::invalid_layout(format!(
                "top fraction must be in (0, 1), got {top_fraction}"
            )));
        }
        if header_height >= canvas.height {
            return Err(MediaError::invalid_layout(format!(
                "header height {header_height} leaves no room on a {}px canvas",
                canvas.height
            )));
        }
        let planner = Self {
            canvas,
            header_height,
            top_fraction,
            mirror_main,
        };
        // Both regions must fit under the header
        let (top, bottom) = planner.split_heights();
        if top + bottom + header_height != canvas.height {
            return Err(MediaError::invalid_layout(format!(
                "regions {top}+{bottom}+{header_height} do not cover canvas height {}",
                canvas.height
            )));
        }
        Ok(planner)
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn header_height(&self) -> u32 {
        self.header_height
    }

    /// Top/bottom region heights: `top = floor(available * fraction)` rounded
    /// down to even, `bottom` takes the remainder.
    fn split_heights(&self) -> (u32, u32) {
        let available = self.canvas.height - self.header_height;
        let mut top = (available as f64 * self.top_fraction).floor() as u32;
        if top % 2 != 0 {
            top -= 1;
        }
        (top, available - top)
    }

    /// Plan a split-screen composition for a main segment of `main_duration`
    /// seconds over a filler clip of `filler_duration` seconds. The filler
    /// window start is drawn from the process RNG.
    pub fn plan_split(&self, main_duration: f64, filler_duration: f64) -> SplitLayout {
        let mut rng = rand::rng();
        self.plan_split_with_rng(main_duration, filler_duration, &mut rng)
    }

    /// Deterministic variant: the caller supplies the RNG.
    pub fn plan_split_with_rng<R: Rng + ?Sized>(
        &self,
        main_duration: f64,
        filler_duration: f64,
        rng: &mut R,
    ) -> SplitLayout {
        let (top_height, bottom_height) = self.split_heights();
        SplitLayout {
            canvas: self.canvas,
            header_height: self.header_height,
            top_height,
            bottom_height,
            mirror_main: self.mirror_main,
            filler_start: filler_window_start(filler_duration, main_duration, rng),
        }
    }

    /// Plan a blur-background composition for a source of the given
    /// dimensions.
    pub fn plan_blur(&self, source_width: u32, source_height: u32) -> BlurLayout {
        BlurLayout {
            canvas: self.canvas,
            header_height: self.header_height,
            branch: classify_aspect(source_width, source_height, self.canvas),
        }
    }
}

/// Classify a source aspect ratio against the target canvas.
///
/// The comparison cross-multiplies in integers so the exact-match branch
/// does not depend on float rounding.
pub fn classify_aspect(source_width: u32, source_height: u32, canvas: Canvas) -> AspectBranch {
    let lhs = source_width as u64 * canvas.height as u64;
    let rhs = canvas.width as u64 * source_height as u64;
    match lhs.cmp(&rhs) {
        std::cmp::Ordering::Greater => AspectBranch::WideSource,
        std::cmp::Ordering::Less => AspectBranch::NarrowSource,
        std::cmp::Ordering::Equal => AspectBranch::ExactMatch,
    }
}

/// Pick a start offset into the filler clip so that the window fully covers
/// the main segment. When the filler is not longer than the main segment the
/// offset is 0; otherwise it is uniform over `[0, filler - main]`, which keeps
/// the filler footage from repeating systematically.
pub fn filler_window_start<R: Rng + ?Sized>(
    filler_duration: f64,
    main_duration: f64,
    rng: &mut R,
) -> f64 {
    if filler_duration <= main_duration {
        return 0.0;
    }
    rng.random_range(0.0..(filler_duration - main_duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SHORTS: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_reference_split_heights() {
        let planner = Planner::new(SHORTS, 180, 0.70, true).unwrap();
        let layout = planner.plan_split_with_rng(60.0, 30.0, &mut rng());
        assert_eq!(layout.top_height, 1218);
        assert_eq!(layout.bottom_height, 522);
        assert_eq!(
            layout.top_height + layout.bottom_height + layout.header_height,
            1920
        );
        assert_eq!(layout.top_height % 2, 0);
    }

    #[test]
    fn test_odd_top_height_rounds_down_to_even() {
        // available = 1740, fraction 0.45 -> 783, odd -> 782
        let planner = Planner::new(SHORTS, 180, 0.45, false).unwrap();
        let layout = planner.plan_split_with_rng(10.0, 5.0, &mut rng());
        assert_eq!(layout.top_height, 782);
        assert_eq!(layout.bottom_height, 1740 - 782);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        assert!(Planner::new(SHORTS, 180, 0.0, true).is_err());
        assert!(Planner::new(SHORTS, 180, 1.0, true).is_err());
        assert!(Planner::new(SHORTS, 180, 1.3, true).is_err());
        assert!(Planner::new(SHORTS, 180, -0.2, true).is_err());
    }

    #[test]
    fn test_header_taller_than_canvas_rejected() {
        assert!(Planner::new(SHORTS, 1920, 0.7, true).is_err());
        assert!(Planner::new(SHORTS, 2000, 0.7, true).is_err());
    }

    #[test]
    fn test_aspect_classification_is_total() {
        // 16:9 source on a 9:16 target -> wide
        assert_eq!(classify_aspect(1920, 1080, SHORTS), AspectBranch::WideSource);
        // 9:16 source -> exact
        assert_eq!(classify_aspect(1080, 1920, SHORTS), AspectBranch::ExactMatch);
        assert_eq!(classify_aspect(540, 960, SHORTS), AspectBranch::ExactMatch);
        // 4:5 source -> narrower than 9:16? 4/5 = 0.8 > 9/16 = 0.5625 -> wide
        assert_eq!(classify_aspect(800, 1000, SHORTS), AspectBranch::WideSource);
        // Truly narrower than 9:16, e.g. 1:2
        assert_eq!(classify_aspect(500, 1000, SHORTS), AspectBranch::NarrowSource);
    }

    #[test]
    fn test_filler_window_zero_when_filler_short() {
        assert_eq!(filler_window_start(30.0, 60.0, &mut rng()), 0.0);
        assert_eq!(filler_window_start(60.0, 60.0, &mut rng()), 0.0);
    }

    #[test]
    fn test_filler_window_covers_main_segment() {
        let mut r = rng();
        for _ in 0..100 {
            let start = filler_window_start(300.0, 60.0, &mut r);
            assert!(start >= 0.0);
            assert!(start + 60.0 <= 300.0);
        }
    }
}
