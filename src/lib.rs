//! Reelsmith assembles short-form vertical videos from a narrated script.
//!
//! A [`Project`] is turned into a muxer-ready package:
//!
//! - Resolve sentence durations and build a gap-separated [`Timeline`]
//! - Lay out captions and preload overlay media once per export
//! - Render every frame in parallel batches through a [`FrameCompositor`]
//! - List narration, sound-effect and music tracks for the external muxer
//!
//! [`ExportSession`] drives the whole pipeline; the individual stages are public for callers that
//! need only part of it (single-frame previews, timeline dumps).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Overlay media fetching, decoding and caching.
pub mod assets;
/// Audio track manifest.
pub mod audio;
/// Frame encoding and sinks.
pub mod encode;
/// Export orchestration.
pub mod export;
/// Caption text layout.
pub mod layout;
/// Frame rendering.
pub mod render;
/// Project data model.
pub mod script;
/// Timeline construction and word timing.
pub mod timeline;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, FrameRange, Point, Rect, Rgba8Premul, Size, Vec2,
};
pub use crate::foundation::error::{ReelsmithError, ReelsmithResult};

pub use crate::assets::color::Color;
pub use crate::audio::tracks::{AudioTrack, assemble_tracks};
pub use crate::encode::sink::{DirSink, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::config::ExportConfig;
pub use crate::export::progress::{
    ExportPhase, JobStatus, JobStatusFile, ProgressSink, ProgressUpdate, TracingProgress,
};
pub use crate::export::session::{ExportReport, ExportSession};
pub use crate::layout::text::{FixedAdvanceShaper, FontBook, ParleyShaper, TextShaper};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::FrameCompositor;
pub use crate::render::scheduler::{CancelToken, RenderStats};
pub use crate::script::model::{CaptionSettings, Project, Sentence, Word};
pub use crate::timeline::builder::Timeline;
