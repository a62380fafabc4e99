use std::path::Path;

/// Input formats recognised by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    /// Decoded through a PNG intermediate produced by the conversion cache.
    Webp,
}

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Formats that must pass through the conversion cache before decoding.
    pub fn requires_conversion(self) -> bool {
        matches!(self, Self::Webp)
    }
}

pub fn is_supported(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

pub fn requires_conversion(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some_and(SourceFormat::requires_conversion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/B.JPG")),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("c.Jpeg")),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("d.WebP")),
            Some(SourceFormat::Webp)
        );
        assert_eq!(SourceFormat::from_path(Path::new("e.tiff")), None);
        assert_eq!(SourceFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn only_webp_needs_conversion() {
        assert!(requires_conversion(Path::new("x.webp")));
        assert!(!requires_conversion(Path::new("x.png")));
        assert!(!requires_conversion(Path::new("x.txt")));
        for ext in SUPPORTED_EXTENSIONS {
            assert!(SourceFormat::from_extension(ext).is_some());
        }
    }
}
