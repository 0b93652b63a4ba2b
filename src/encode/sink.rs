use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::encode::png::{EncodedFrame, frame_file_name};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Export frame rate.
    pub fps: Fps,
    /// Number of frames that will be pushed.
    pub total_frames: u64,
}

/// Sink contract for consuming encoded frames in timeline order.
///
/// Ordering contract: `push_frame` is called with indices `0, 1, 2, ...` with no gaps, whatever
/// order the frames finished rendering in.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelsmithResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &EncodedFrame) -> ReelsmithResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ReelsmithResult<()>;
}

/// In-memory sink for tests and single-frame previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, EncodedFrame)>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, EncodedFrame)] {
        &self.frames
    }

    /// `true` once `end` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelsmithResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &EncodedFrame) -> ReelsmithResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelsmithResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes each frame to `<dir>/frameNNNNN.png`.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    next: u64,
    written: Vec<String>,
}

impl DirSink {
    /// Sink writing into `dir` (created on `begin`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 0,
            written: Vec::new(),
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names written so far, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}

impl FrameSink for DirSink {
    fn begin(&mut self, _cfg: SinkConfig) -> ReelsmithResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create frame dir '{}'", self.dir.display()))?;
        self.next = 0;
        self.written.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &EncodedFrame) -> ReelsmithResult<()> {
        if idx.0 != self.next {
            return Err(ReelsmithError::render(format!(
                "frame {} pushed out of order (expected {})",
                idx.0, self.next
            )));
        }
        let name = frame_file_name(idx);
        let path = self.dir.join(&name);
        std::fs::write(&path, &frame.png)
            .with_context(|| format!("write frame '{}'", path.display()))?;
        self.written.push(name);
        self.next += 1;
        Ok(())
    }

    fn end(&mut self) -> ReelsmithResult<()> {
        tracing::debug!(frames = self.written.len(), dir = %self.dir.display(), "frames written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
