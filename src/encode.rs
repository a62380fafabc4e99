use std::{
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use crate::{
    foundation::{
        core::WHITE,
        error::{StackError, StackResult},
    },
    render::{canvas::Canvas, draw},
};

pub const DEFAULT_OUTPUT: &str = "result.png";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl OutputFormat {
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Where and how the result is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Set when a `.webp` request was redirected to PNG.
    pub fell_back_from_webp: bool,
}

impl OutputTarget {
    /// Pick the encoder from the extension of `path`.
    ///
    /// `.webp` is not written; the path is rewritten to `.png` and flagged.
    pub fn from_path(path: impl Into<PathBuf>) -> StackResult<Self> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let format = match ext.as_str() {
            "png" => OutputFormat::Png,
            "jpg" | "jpeg" => OutputFormat::Jpeg,
            "gif" => OutputFormat::Gif,
            "bmp" => OutputFormat::Bmp,
            "webp" => {
                return Ok(Self {
                    path: path.with_extension("png"),
                    format: OutputFormat::Png,
                    fell_back_from_webp: true,
                });
            }
            "" => {
                return Err(StackError::argument(format!(
                    "output '{}' has no extension; use .png, .jpg, .gif or .bmp",
                    path.display()
                )));
            }
            other => {
                return Err(StackError::argument(format!(
                    "unsupported output extension '.{other}'; use .png, .jpg, .gif or .bmp"
                )));
            }
        };
        Ok(Self {
            path,
            format,
            fell_back_from_webp: false,
        })
    }
}

pub fn ensure_parent_dir(path: &Path) -> StackResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| StackError::io(parent, e))?;
    }
    Ok(())
}

/// Encode `canvas` to `target`.
///
/// The image is encoded into a temporary file beside the target and renamed into place
/// only once encoding succeeds, so a failed write never leaves a partial output behind.
/// JPEG output is flattened over white.
pub fn write_canvas(canvas: &Canvas, target: &OutputTarget) -> StackResult<()> {
    ensure_parent_dir(&target.path)?;
    let parent = match target.path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".imgstack-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let mut tmp = builder
        .tempfile_in(parent)
        .map_err(|e| StackError::io(parent, e))?;

    let encode_err = |source| StackError::Encode {
        path: target.path.clone(),
        source,
    };
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        match target.format {
            OutputFormat::Jpeg => flatten_rgb(canvas)
                .write_to(&mut out, image::ImageFormat::Jpeg)
                .map_err(encode_err)?,
            fmt => canvas
                .image()
                .write_to(&mut out, fmt.image_format())
                .map_err(encode_err)?,
        }
        out.flush().map_err(|e| StackError::io(&target.path, e))?;
    }
    tmp.persist(&target.path)
        .map_err(|e| StackError::io(&target.path, e.error))?;

    tracing::info!(
        path = %target.path.display(),
        format = ?target.format,
        "wrote output"
    );
    Ok(())
}

// Built pixel by pixel so only the RGB copy is allocated next to the canvas.
fn flatten_rgb(canvas: &Canvas) -> image::RgbImage {
    let src = canvas.image();
    image::RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, _] = draw::over(WHITE, src.get_pixel(x, y).0);
        image::Rgb([r, g, b])
    })
}
