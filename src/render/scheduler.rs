use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::encode::png::{EncodedFrame, encode_png};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::render::compositor::FrameCompositor;

/// Default number of frames rendered concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Cooperative cancellation flag shared between an export and its caller.
///
/// Checked between batches: the batch in flight always finishes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Frame rate and batching for [`render_sequence`].
#[derive(Clone, Copy, Debug)]
pub struct ScheduleOpts {
    /// Export frame rate.
    pub fps: Fps,
    /// Frames per batch, also the worker thread count.
    pub concurrency: usize,
}

/// Counters from one [`render_sequence`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames the duration calls for.
    pub frames_total: u64,
    /// Frames rendered and handed to the sink.
    pub frames_rendered: u64,
    /// Batches executed.
    pub batches: u64,
}

/// Number of frames covering `duration_secs`: `ceil(duration × fps)`.
pub fn total_frames(duration_secs: f64, fps: Fps) -> u64 {
    fps.secs_to_frames_ceil(duration_secs)
}

/// Render every frame of the compositor's timeline into `sink`.
///
/// Frames are rendered `concurrency` at a time on a dedicated pool, PNG-encoded on the workers,
/// then pushed in index order. Any frame failure aborts the whole sequence. `on_progress(done,
/// total)` is called at batch starts whenever the whole-percent value changes, and once at the end.
#[tracing::instrument(
    skip_all,
    fields(total_frames = tracing::field::Empty, concurrency = opts.concurrency)
)]
pub fn render_sequence(
    compositor: &FrameCompositor,
    opts: ScheduleOpts,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64, u64),
) -> ReelsmithResult<RenderStats> {
    let total = total_frames(compositor.timeline().total_duration(), opts.fps);
    tracing::Span::current().record("total_frames", total);
    let pool = build_thread_pool(opts.concurrency)?;
    let canvas = compositor.canvas();

    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: opts.fps,
        total_frames: total,
    })?;

    let mut stats = RenderStats {
        frames_total: total,
        ..RenderStats::default()
    };
    let mut last_percent = None;
    let range = FrameRange::new(FrameIndex(0), FrameIndex(total))?;
    for batch in range.batches(opts.concurrency as u64) {
        if cancel.is_cancelled() {
            tracing::warn!(at_frame = batch.start.0, "render cancelled");
            return Err(ReelsmithError::Cancelled);
        }
        let percent = batch.start.0 * 100 / total.max(1);
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            on_progress(batch.start.0, total);
        }

        let encoded = render_batch(compositor, batch, opts.fps, &pool);
        for (i, frame) in (batch.start.0..batch.end.0).zip(encoded) {
            let frame =
                frame.map_err(|e| ReelsmithError::render(format!("frame {i} failed: {e}")))?;
            sink.push_frame(FrameIndex(i), &frame)?;
            stats.frames_rendered += 1;
        }
        stats.batches += 1;
        tracing::debug!(start = batch.start.0, end = batch.end.0, "batch rendered");
    }

    sink.end()?;
    on_progress(total, total);
    tracing::info!(frames = stats.frames_rendered, "frame sequence rendered");
    Ok(stats)
}

fn render_batch(
    compositor: &FrameCompositor,
    batch: FrameRange,
    fps: Fps,
    pool: &rayon::ThreadPool,
) -> Vec<ReelsmithResult<EncodedFrame>> {
    pool.install(|| {
        (batch.start.0..batch.end.0)
            .into_par_iter()
            .map(|i| {
                let frame = compositor.compose_index(FrameIndex(i), fps)?;
                encode_png(&frame)
            })
            .collect()
    })
}

fn build_thread_pool(threads: usize) -> ReelsmithResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(ReelsmithError::validation("render concurrency must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("reelsmith-render-{i}"))
        .build()
        .map_err(|e| ReelsmithError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
