use image::RgbaImage;

use crate::foundation::{
    core::{LayoutPlan, Rgba8},
    error::{StackError, StackResult},
};

/// Output pixel buffer, straight-alpha RGBA8, row-major.
///
/// Owned by value through the compositor; dropping it on an error path frees the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn byte_len(&self) -> usize {
        self.image.as_raw().len()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        self.image.get_pixel(x, y).0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Allocate a canvas covering `plan`, filled with `background`.
///
/// The byte estimate is checked against `ceiling` before any allocation is attempted.
pub fn allocate(plan: &LayoutPlan, ceiling: u64, background: Rgba8) -> StackResult<Canvas> {
    allocate_size(plan.max_width(), plan.total_height(), ceiling, background)
}

pub fn allocate_size(
    width: u32,
    height: u32,
    ceiling: u64,
    background: Rgba8,
) -> StackResult<Canvas> {
    if width == 0 || height == 0 {
        return Err(StackError::InvalidLayout { width, height });
    }

    let estimated = crate::foundation::core::rgba8_bytes(width, height);
    if estimated > ceiling {
        return Err(StackError::MemoryBudgetExceeded { estimated, ceiling });
    }

    let failed = || StackError::AllocationFailed { width, height };
    let len = usize::try_from(estimated).map_err(|_| failed())?;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| failed())?;
    buf.resize(len, 0);
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&background);
    }

    let image = RgbaImage::from_raw(width, height, buf).ok_or_else(failed)?;
    tracing::debug!(width, height, bytes = estimated, "allocated canvas");
    Ok(Canvas { image })
}
