use std::path::Path;

use crate::{
    assets::{convert::ConversionCache, decode},
    config::MergeConfig,
    foundation::{
        core::{LayoutPlan, MergeStage, ProgressEvent},
        error::{StackError, StackResult},
    },
    probe,
    render::{
        canvas::{self, Canvas},
        draw,
    },
    source,
};

/// Observer for [`ProgressEvent`]s; called synchronously on the merging thread.
pub type ProgressFn<'a> = dyn FnMut(ProgressEvent) + 'a;

fn emit(on_progress: &mut Option<&mut ProgressFn<'_>>, step: usize, total: usize) {
    if let Some(cb) = on_progress.as_deref_mut() {
        cb(ProgressEvent { step, total });
    }
}

/// Decode one input at composite time, resolving conversions through `cache`.
fn load_for_composite(
    path: &Path,
    cache: &ConversionCache,
    max_alloc: u64,
) -> StackResult<image::RgbaImage> {
    let needs_conversion = source::requires_conversion(path);
    let readable = cache.resolve(path)?;
    decode::decode_rgba8(&readable, max_alloc).map_err(|e| match e {
        StackError::Decode { source, .. } if needs_conversion => {
            StackError::UnsupportedFormatRuntime {
                path: path.to_path_buf(),
                cause: source.to_string(),
            }
        }
        StackError::Decode { source, .. } => StackError::Decode {
            path: path.to_path_buf(),
            source,
        },
        StackError::NotFound { .. } => StackError::not_found(path),
        other => other,
    })
}

/// A lone input is returned decoded, with no background fill or separator.
fn single_image(
    path: &Path,
    cache: &ConversionCache,
    config: &MergeConfig,
) -> StackResult<Canvas> {
    load_for_composite(path, cache, config.memory_ceiling_bytes).map(Canvas::from_image)
}

/// Draw every input into `canvas` in order.
///
/// The canvas is consumed; on error it is dropped before the error is returned. Each
/// decoded image is released before the next one is opened, so peak memory is the canvas
/// plus one decoded input. Progress steps `2..=files.len() + 1` are emitted here.
///
/// With a single input the canvas is released and the decoded image is returned as-is.
#[tracing::instrument(skip_all, fields(count = files.len(), width = canvas.width(), height = canvas.height()))]
pub fn composite<P: AsRef<Path>>(
    files: &[P],
    plan: &LayoutPlan,
    mut canvas: Canvas,
    config: &MergeConfig,
    cache: &ConversionCache,
    mut on_progress: Option<&mut ProgressFn<'_>>,
) -> StackResult<Canvas> {
    if files.len() != plan.len() {
        return Err(StackError::argument(format!(
            "layout plan covers {} images but {} were given",
            plan.len(),
            files.len()
        )));
    }

    if let [only] = files {
        drop(canvas);
        let out = single_image(only.as_ref(), cache, config)?;
        emit(&mut on_progress, 2, 1);
        return Ok(out);
    }

    let total = files.len();
    let (canvas_width, canvas_height) = (canvas.width(), canvas.height());
    let mut current_y: u32 = 0;

    for (i, path) in files.iter().enumerate() {
        let path = path.as_ref();
        let planned = plan.dimensions()[i];

        let img = load_for_composite(path, cache, config.memory_ceiling_bytes)?;
        let (width, height) = img.dimensions();
        if (width, height) != (planned.width, planned.height) {
            tracing::warn!(
                path = %path.display(),
                planned_width = planned.width,
                planned_height = planned.height,
                width,
                height,
                "image size changed since the probe pass"
            );
        }

        let fits = u64::from(current_y) + u64::from(height) <= u64::from(canvas_height)
            && width <= canvas_width;
        if !fits {
            return Err(StackError::OutOfBounds {
                path: path.to_path_buf(),
                y: current_y,
                width,
                height,
                canvas_width,
                canvas_height,
            });
        }

        draw::blit_left_justified(&mut canvas, &img, current_y);
        drop(img);
        // The rule under image i-1 is drawn once image i is down, so it stays on top.
        if config.draw_separator && i > 0 {
            draw::draw_separator(&mut canvas, current_y, &config.separator);
        }
        current_y += height;
        tracing::debug!(
            path = %path.display(),
            index = i,
            width,
            height,
            y = current_y,
            "composited"
        );
        emit(&mut on_progress, i + 2, total);
    }

    Ok(canvas)
}

/// Stack `files` top to bottom into one canvas.
///
/// One file is decoded and returned as-is without probing. Two or more go through the
/// probe pass, canvas allocation, and the composite loop.
#[tracing::instrument(skip_all, fields(count = files.len(), separator = config.draw_separator))]
pub fn merge<P: AsRef<Path>>(
    files: &[P],
    config: &MergeConfig,
    cache: &ConversionCache,
    mut on_progress: Option<&mut ProgressFn<'_>>,
) -> StackResult<Canvas> {
    config.validate()?;

    let mut stage = MergeStage::Idle;
    let result = run_stages(files, config, cache, &mut on_progress, &mut stage);
    match &result {
        Ok(canvas) => tracing::info!(
            stage = %MergeStage::Done,
            width = canvas.width(),
            height = canvas.height(),
            "merge complete"
        ),
        Err(err) => tracing::info!(
            stage = %MergeStage::Failed,
            from = %stage,
            error = %err,
            "merge failed"
        ),
    }
    result
}

fn advance(stage: &mut MergeStage, next: MergeStage) {
    tracing::debug!(from = %stage, to = %next, "merge stage");
    *stage = next;
}

fn run_stages<P: AsRef<Path>>(
    files: &[P],
    config: &MergeConfig,
    cache: &ConversionCache,
    on_progress: &mut Option<&mut ProgressFn<'_>>,
    stage: &mut MergeStage,
) -> StackResult<Canvas> {
    match files {
        [] => Err(StackError::argument("no input images")),
        [only] => {
            advance(stage, MergeStage::Compositing);
            single_image(only.as_ref(), cache, config)
        }
        _ => {
            let total = files.len();

            advance(stage, MergeStage::Probing);
            emit(on_progress, ProgressEvent::PROBE_STARTED, total);
            let plan = probe::aggregate(files, cache)?;
            emit(on_progress, ProgressEvent::PROBE_DONE, total);
            advance(stage, MergeStage::Validated);
            tracing::info!(
                max_width = plan.max_width(),
                total_height = plan.total_height(),
                estimated_bytes = plan.estimated_bytes(),
                "layout planned"
            );

            let canvas = canvas::allocate(&plan, config.memory_ceiling_bytes, config.background)?;
            advance(stage, MergeStage::Allocated);

            advance(stage, MergeStage::Compositing);
            composite(files, &plan, canvas, config, cache, on_progress.as_deref_mut())
        }
    }
}
