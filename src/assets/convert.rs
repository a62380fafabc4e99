//! Conversion of inputs the decode path cannot read directly into PNG intermediates.
//!
//! A [`ConversionCache`] is created per merge invocation and passed by reference to the
//! probe and composite passes. Entries are keyed by source path and live in a private
//! temporary directory that is removed by [`ConversionCache::close`] (or on drop).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{
    foundation::error::{StackError, StackResult},
    source,
};

#[derive(Default)]
struct CacheState {
    entries: HashMap<PathBuf, PathBuf>,
    next_id: u64,
    conversions: u64,
}

pub struct ConversionCache {
    dir: tempfile::TempDir,
    max_alloc: u64,
    // Held across lookup, conversion and file write.
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for ConversionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionCache")
            .field("dir", &self.dir.path())
            .field("max_alloc", &self.max_alloc)
            .finish_non_exhaustive()
    }
}

impl ConversionCache {
    /// `max_alloc` caps the decoder allocation for each conversion, like the composite pass.
    pub fn new(max_alloc: u64) -> StackResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("imgstack-convert-")
            .tempdir()
            .map_err(|e| StackError::io(std::env::temp_dir(), e))?;
        tracing::debug!(dir = %dir.path().display(), "created conversion cache");
        Ok(Self {
            dir,
            max_alloc,
            state: Mutex::new(CacheState::default()),
        })
    }

    /// Directory holding the intermediates.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Return a path the decoder can read for `path`.
    ///
    /// Paths that need no conversion are returned unchanged. Failures are not retried.
    pub fn resolve(&self, path: &Path) -> StackResult<PathBuf> {
        if !source::requires_conversion(path) {
            return Ok(path.to_path_buf());
        }

        let mut state = self.state.lock().map_err(|_| StackError::ConversionFailed {
            path: path.to_path_buf(),
            cause: "conversion cache lock poisoned".to_string(),
        })?;

        if let Some(cached) = state.entries.get(path) {
            if cached.is_file() {
                return Ok(cached.clone());
            }
            tracing::debug!(
                source = %path.display(),
                intermediate = %cached.display(),
                "cached intermediate vanished, regenerating"
            );
        }

        let target = match state.entries.get(path) {
            Some(existing) => existing.clone(),
            None => {
                let id = state.next_id;
                state.next_id += 1;
                self.dir.path().join(format!("{id:06}.png"))
            }
        };

        convert_to_png(path, &target, self.max_alloc)?;
        state.conversions += 1;
        state.entries.insert(path.to_path_buf(), target.clone());
        tracing::debug!(
            source = %path.display(),
            intermediate = %target.display(),
            "converted to png intermediate"
        );
        Ok(target)
    }

    /// Number of conversions actually performed (cache hits excluded).
    pub fn conversions(&self) -> u64 {
        self.state.lock().map(|s| s.conversions).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every intermediate and the cache directory.
    pub fn close(self) -> StackResult<()> {
        let path = self.dir.path().to_path_buf();
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
        }
        self.dir.close().map_err(|e| StackError::io(path, e))
    }
}

fn convert_to_png(src: &Path, dst: &Path, max_alloc: u64) -> StackResult<()> {
    let failed = |cause: String| StackError::ConversionFailed {
        path: src.to_path_buf(),
        cause,
    };

    if !src.is_file() {
        return Err(StackError::not_found(src));
    }
    let mut reader = image::ImageReader::open(src)
        .map_err(|e| failed(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| failed(e.to_string()))?;
    let mut limits = image::Limits::default();
    limits.max_alloc = Some(max_alloc);
    reader.limits(limits);
    let img = reader
        .decode()
        .map_err(|e| failed(e.to_string()))?;
    img.save_with_format(dst, image::ImageFormat::Png)
        .map_err(|e| failed(format!("write intermediate '{}': {e}", dst.display())))
}
