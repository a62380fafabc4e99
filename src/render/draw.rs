use image::RgbaImage;

use crate::{config::SeparatorStyle, foundation::core::Rgba8, render::canvas::Canvas};

/// Straight-alpha source-over.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = src[3];
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let da = mul_div255(u16::from(dst[3]), 255 - u16::from(sa));
    let out_a = u32::from(sa) + u32::from(da);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * u32::from(sa) + u32::from(dst[i]) * u32::from(da);
        out[i] = ((num + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

/// Draw `src` at `(0, y)` at its natural size.
///
/// Columns right of `src.width()` keep whatever the canvas held. Anything past the canvas
/// edge is clipped; callers check bounds beforehand and report them as errors.
pub fn blit_left_justified(canvas: &mut Canvas, src: &RgbaImage, y: u32) {
    let dst = canvas.image_mut();
    let cols = src.width().min(dst.width()) as usize;
    let rows = src.height().min(dst.height().saturating_sub(y));
    if cols == 0 || rows == 0 {
        return;
    }

    let src_stride = src.width() as usize * 4;
    let dst_stride = dst.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = dst;

    for row in 0..rows as usize {
        let s0 = row * src_stride;
        let d0 = (y as usize + row) * dst_stride;
        let s_row = &src_raw[s0..s0 + cols * 4];
        let d_row = &mut dst_raw[d0..d0 + cols * 4];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
}

/// Row a separator below an image ending at `y` lands on, clamped into the canvas.
pub fn separator_row(y: u32, canvas_height: u32) -> u32 {
    y.min(canvas_height.saturating_sub(1))
}

/// Dashed one-pixel rule across the full canvas width at row `y` (clamped).
pub fn draw_separator(canvas: &mut Canvas, y: u32, style: &SeparatorStyle) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let row = separator_row(y, canvas.height());
    let img = canvas.image_mut();
    for x in 0..img.width() {
        if style.is_dash(x) {
            let px = img.get_pixel_mut(x, row);
            px.0 = over(px.0, style.color);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foundation::core::{LIGHT_GRAY, WHITE},
        render::canvas::allocate_size,
    };

    #[test]
    fn over_opaque_and_transparent_extremes() {
        let dst = [10, 20, 30, 255];
        assert_eq!(over(dst, [1, 2, 3, 255]), [1, 2, 3, 255]);
        assert_eq!(over(dst, [1, 2, 3, 0]), dst);
    }

    #[test]
    fn over_half_alpha_on_white() {
        let out = over(WHITE, [0, 0, 0, 128]);
        assert_eq!(out[3], 255);
        assert!(out[0] > 120 && out[0] < 135);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
    }

    #[test]
    fn blit_leaves_gap_right_of_narrow_image() {
        let mut canvas = allocate_size(5, 4, u64::MAX, WHITE).unwrap();
        let src = RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        blit_left_justified(&mut canvas, &src, 1);

        assert_eq!(canvas.pixel(0, 0), WHITE);
        assert_eq!(canvas.pixel(0, 1), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(2, 2), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(3, 1), WHITE);
        assert_eq!(canvas.pixel(4, 2), WHITE);
        assert_eq!(canvas.pixel(0, 3), WHITE);
    }

    #[test]
    fn blit_clips_at_canvas_edge() {
        let mut canvas = allocate_size(2, 2, u64::MAX, WHITE).unwrap();
        let src = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
        blit_left_justified(&mut canvas, &src, 1);
        assert_eq!(canvas.pixel(0, 0), WHITE);
        assert_eq!(canvas.pixel(1, 1), [0, 0, 255, 255]);
    }

    #[test]
    fn separator_is_dashed_and_clamped() {
        let mut canvas = allocate_size(12, 3, u64::MAX, WHITE).unwrap();
        draw_separator(&mut canvas, 10, &SeparatorStyle::default());
        for x in 0..12 {
            let expected = if (x % 10) < 5 { LIGHT_GRAY } else { WHITE };
            assert_eq!(canvas.pixel(x, 2), expected, "x={x}");
            assert_eq!(canvas.pixel(x, 1), WHITE);
        }
    }
}
