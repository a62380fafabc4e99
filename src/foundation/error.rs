use std::path::PathBuf;

pub type StackResult<T> = Result<T, StackError>;

#[derive(thiserror::Error, Debug)]
pub enum StackError {
    #[error("argument error: {0}")]
    Argument(String),

    #[error("file not found: '{}'", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported format for '{}': {reason}", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error(
        "unsupported format for '{}' while compositing: {cause} (convert the file to PNG or JPEG first)",
        .path.display()
    )]
    UnsupportedFormatRuntime { path: PathBuf, cause: String },

    #[error("failed to convert '{}': {cause}", .path.display())]
    ConversionFailed { path: PathBuf, cause: String },

    #[error("invalid dimensions {width}x{height} for '{}'", .path.display())]
    InvalidDimensions {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error(
        "total height overflow at '{}': {total} + {height} exceeds {}",
        .path.display(),
        u32::MAX
    )]
    HeightOverflow {
        path: PathBuf,
        total: u32,
        height: u32,
    },

    #[error("invalid layout {width}x{height}: both sides must be non-zero")]
    InvalidLayout { width: u32, height: u32 },

    #[error("estimated canvas memory {estimated} bytes exceeds ceiling of {ceiling} bytes")]
    MemoryBudgetExceeded { estimated: u64, ceiling: u64 },

    #[error("failed to allocate a {width}x{height} canvas")]
    AllocationFailed { width: u32, height: u32 },

    #[error(
        "'{}' ({width}x{height} at y={y}) does not fit a {canvas_width}x{canvas_height} canvas",
        .path.display()
    )]
    OutOfBounds {
        path: PathBuf,
        y: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Path the error refers to, when it refers to a single input or output file.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::NotFound { path }
            | Self::Decode { path, .. }
            | Self::UnsupportedFormat { path, .. }
            | Self::UnsupportedFormatRuntime { path, .. }
            | Self::ConversionFailed { path, .. }
            | Self::InvalidDimensions { path, .. }
            | Self::HeightOverflow { path, .. }
            | Self::OutOfBounds { path, .. }
            | Self::Io { path, .. }
            | Self::Encode { path, .. } => Some(path.as_path()),
            Self::Argument(_)
            | Self::InvalidLayout { .. }
            | Self::MemoryBudgetExceeded { .. }
            | Self::AllocationFailed { .. }
            | Self::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_path_and_numbers() {
        let err = StackError::OutOfBounds {
            path: PathBuf::from("b.png"),
            y: 50,
            width: 80,
            height: 40,
            canvas_width: 100,
            canvas_height: 80,
        };
        let msg = err.to_string();
        assert!(msg.contains("b.png"));
        assert!(msg.contains("y=50"));
        assert!(msg.contains("100x80"));
        assert_eq!(err.path(), Some(std::path::Path::new("b.png")));
    }

    #[test]
    fn runtime_format_error_carries_guidance() {
        let err = StackError::UnsupportedFormatRuntime {
            path: PathBuf::from("a.webp"),
            cause: "bad chunk".to_string(),
        };
        assert!(err.to_string().contains("convert the file"));
    }

    #[test]
    fn argument_prefix_is_stable() {
        assert!(
            StackError::argument("x")
                .to_string()
                .starts_with("argument error:")
        );
        assert!(StackError::argument("x").path().is_none());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StackError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
