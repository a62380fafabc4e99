//! Dimension pass: one header read per input, folded into a [`LayoutPlan`].

use std::path::Path;

use crate::{
    assets::{convert::ConversionCache, decode},
    foundation::{
        core::{Dimension, LayoutPlan},
        error::{StackError, StackResult},
    },
};

/// Read one image's size.
///
/// Inputs that need conversion are resolved through `cache` first; a failed conversion
/// surfaces as [`StackError::UnsupportedFormat`]. Nothing decoded is retained.
pub fn probe(path: &Path, cache: &ConversionCache) -> StackResult<Dimension> {
    let readable = cache.resolve(path).map_err(|e| match e {
        StackError::ConversionFailed { path, cause } => {
            StackError::UnsupportedFormat { path, reason: cause }
        }
        other => other,
    })?;
    let (width, height) = decode::read_dimensions(&readable).map_err(|e| reattach(e, path))?;
    Dimension::new(path, width, height)
}

// Errors raised against an intermediate should name the user's file.
fn reattach(err: StackError, original: &Path) -> StackError {
    match err {
        StackError::Decode { source, .. } => StackError::Decode {
            path: original.to_path_buf(),
            source,
        },
        StackError::NotFound { .. } => StackError::not_found(original),
        other => other,
    }
}

/// Probe every path in order and build the stacking plan.
#[tracing::instrument(skip_all, fields(count = paths.len()))]
pub fn aggregate<P: AsRef<Path>>(paths: &[P], cache: &ConversionCache) -> StackResult<LayoutPlan> {
    aggregate_with(paths, |p| probe(p, cache))
}

/// [`aggregate`] over an arbitrary prober.
pub fn aggregate_with<P, F>(paths: &[P], mut probe_one: F) -> StackResult<LayoutPlan>
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> StackResult<Dimension>,
{
    let mut plan = LayoutPlan::new();
    for path in paths {
        let path = path.as_ref();
        let dim = probe_one(path)?;
        // Probers outside this module may hand back unchecked values.
        let dim = Dimension::new(path, dim.width, dim.height)?;
        plan.push(path, dim)?;
        tracing::debug!(
            path = %path.display(),
            width = dim.width,
            height = dim.height,
            total_height = plan.total_height(),
            "probed"
        );
    }
    Ok(plan)
}
