use std::path::Path;

use crate::foundation::error::{StackError, StackResult};

/// Straight-alpha RGBA8 color.
pub type Rgba8 = [u8; 4];

pub const WHITE: Rgba8 = [255, 255, 255, 255];
pub const LIGHT_GRAY: Rgba8 = [211, 211, 211, 255];

/// Pixel size of one source image, captured once by the probe pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    /// Width in pixels, always > 0.
    pub width: u32,
    /// Height in pixels, always > 0.
    pub height: u32,
}

impl Dimension {
    /// Validate a probed size. Zero on either axis is rejected rather than clamped.
    pub fn new(path: &Path, width: u32, height: u32) -> StackResult<Self> {
        if width == 0 || height == 0 {
            return Err(StackError::InvalidDimensions {
                path: path.to_path_buf(),
                width,
                height,
            });
        }
        Ok(Self { width, height })
    }
}

/// Byte size of a `width * height` RGBA8 buffer, saturating at `u64::MAX`.
pub fn rgba8_bytes(width: u32, height: u32) -> u64 {
    u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|px| px.checked_mul(4))
        .unwrap_or(u64::MAX)
}

/// Vertical stacking plan for one merge invocation.
///
/// `dimensions` is in input order; the compositor indexes it by input position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutPlan {
    max_width: u32,
    total_height: u32,
    dimensions: Vec<Dimension>,
}

impl LayoutPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next image in order.
    ///
    /// The overflow check runs before the addition; on error the plan is unchanged.
    pub fn push(&mut self, path: &Path, dim: Dimension) -> StackResult<()> {
        if self.total_height > u32::MAX - dim.height {
            return Err(StackError::HeightOverflow {
                path: path.to_path_buf(),
                total: self.total_height,
                height: dim.height,
            });
        }
        self.total_height += dim.height;
        if dim.width > self.max_width {
            self.max_width = dim.width;
        }
        self.dimensions.push(dim);
        Ok(())
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn total_height(&self) -> u32 {
        self.total_height
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// RGBA8 bytes needed for a canvas covering the whole plan.
    pub fn estimated_bytes(&self) -> u64 {
        rgba8_bytes(self.max_width, self.total_height)
    }
}

/// Synchronous progress notification.
///
/// Step 0: probe pass started. Step 1: probe pass complete.
/// Steps `2..=total + 1`: one per composited image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    pub step: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub const PROBE_STARTED: usize = 0;
    pub const PROBE_DONE: usize = 1;

    /// Index of the composited image this event reports, if any.
    pub fn composited_index(self) -> Option<usize> {
        self.step.checked_sub(2)
    }
}

/// Lifecycle of a single merge invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStage {
    Idle,
    Probing,
    Validated,
    Allocated,
    Compositing,
    Done,
    Failed,
}

impl MergeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Validated => "validated",
            Self::Allocated => "allocated",
            Self::Compositing => "compositing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MergeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(w: u32, h: u32) -> Dimension {
        Dimension::new(Path::new("x.png"), w, h).unwrap()
    }

    #[test]
    fn dimension_rejects_zero_sides() {
        let err = Dimension::new(Path::new("z.png"), 0, 10).unwrap_err();
        assert!(matches!(
            err,
            StackError::InvalidDimensions {
                width: 0,
                height: 10,
                ..
            }
        ));
        assert!(Dimension::new(Path::new("z.png"), 10, 0).is_err());
    }

    #[test]
    fn plan_tracks_max_width_and_sum() {
        let mut plan = LayoutPlan::new();
        plan.push(Path::new("a"), dim(100, 50)).unwrap();
        plan.push(Path::new("b"), dim(80, 30)).unwrap();
        plan.push(Path::new("c"), dim(100, 5)).unwrap();
        assert_eq!(plan.max_width(), 100);
        assert_eq!(plan.total_height(), 85);
        assert_eq!(plan.dimensions(), &[dim(100, 50), dim(80, 30), dim(100, 5)]);
        assert_eq!(plan.estimated_bytes(), 100 * 85 * 4);
    }

    #[test]
    fn plan_accepts_exact_u32_max_total() {
        let mut plan = LayoutPlan::new();
        plan.push(Path::new("a"), dim(1, u32::MAX - 10)).unwrap();
        plan.push(Path::new("b"), dim(1, 10)).unwrap();
        assert_eq!(plan.total_height(), u32::MAX);
    }

    #[test]
    fn plan_rejects_one_past_u32_max_without_mutation() {
        let mut plan = LayoutPlan::new();
        plan.push(Path::new("a"), dim(1, u32::MAX - 10)).unwrap();
        let err = plan.push(Path::new("b"), dim(7, 11)).unwrap_err();
        match err {
            StackError::HeightOverflow {
                path,
                total,
                height,
            } => {
                assert_eq!(path, Path::new("b"));
                assert_eq!(total, u32::MAX - 10);
                assert_eq!(height, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(plan.total_height(), u32::MAX - 10);
        assert_eq!(plan.max_width(), 1);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn rgba8_bytes_saturates() {
        assert_eq!(rgba8_bytes(100_000, 100_000), 40_000_000_000);
        assert_eq!(rgba8_bytes(u32::MAX, u32::MAX), u64::MAX);
    }

    #[test]
    fn progress_event_maps_steps_to_items() {
        let ev = ProgressEvent { step: 1, total: 3 };
        assert_eq!(ev.composited_index(), None);
        let ev = ProgressEvent { step: 4, total: 3 };
        assert_eq!(ev.composited_index(), Some(2));
    }
}
