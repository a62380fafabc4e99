use std::path::Path;

use image::{ImageReader, RgbaImage};

use crate::foundation::error::{StackError, StackResult};

fn open_reader(path: &Path) -> StackResult<ImageReader<std::io::BufReader<std::fs::File>>> {
    if !path.is_file() {
        return Err(StackError::not_found(path));
    }
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StackError::not_found(path),
        _ => StackError::io(path, e),
    })?;
    // Content sniffing first; the extension is the fallback when the magic bytes are unknown.
    reader
        .with_guessed_format()
        .map_err(|e| StackError::io(path, e))
}

/// Read the pixel size from the container header without materializing pixels.
pub fn read_dimensions(path: &Path) -> StackResult<(u32, u32)> {
    open_reader(path)?
        .into_dimensions()
        .map_err(|source| StackError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Decode a file fully into straight-alpha RGBA8.
///
/// `max_alloc` bounds the decoder's own allocation for this one image.
pub fn decode_rgba8(path: &Path, max_alloc: u64) -> StackResult<RgbaImage> {
    let mut reader = open_reader(path)?;
    let mut limits = image::Limits::default();
    limits.max_alloc = Some(max_alloc);
    reader.limits(limits);
    let img = reader.decode().map_err(|source| StackError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, w: u32, h: u32, px: [u8; 4]) {
        image::RgbaImage::from_pixel(w, h, image::Rgba(px))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn dimensions_and_pixels_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.png");
        write_png(&p, 3, 2, [10, 20, 30, 255]);

        assert_eq!(read_dimensions(&p).unwrap(), (3, 2));
        let img = decode_rgba8(&p, u64::MAX).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("missing.png");
        assert!(matches!(
            read_dimensions(&p),
            Err(StackError::NotFound { .. })
        ));
        assert!(matches!(
            decode_rgba8(&p, u64::MAX),
            Err(StackError::NotFound { .. })
        ));
    }

    #[test]
    fn garbage_bytes_are_decode_errors_naming_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("broken.png");
        std::fs::write(&p, b"definitely not a png").unwrap();
        let err = decode_rgba8(&p, u64::MAX).unwrap_err();
        assert!(matches!(err, StackError::Decode { .. }));
        assert_eq!(err.path(), Some(p.as_path()));
    }

    #[test]
    fn extension_mismatch_still_decodes_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("actually_png.jpg");
        write_png(&p, 4, 4, [1, 2, 3, 255]);
        assert_eq!(read_dimensions(&p).unwrap(), (4, 4));
    }
}
