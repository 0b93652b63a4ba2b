//! CPU frame rendering.
//!
//! [`compositor::FrameCompositor`] draws one frame; [`scheduler::render_sequence`] renders a
//! whole timeline in parallel batches.

/// Rendered frame buffers.
pub mod backend;
/// Frame composition.
pub mod compositor;
/// Canvas-relative placement rules.
pub mod geometry;
/// Decoded images ready to draw.
pub mod paint;
/// Batch render scheduling and cancellation.
pub mod scheduler;
