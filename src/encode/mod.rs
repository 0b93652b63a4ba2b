//! Frame encoding sinks.
//!
//! Sinks consume encoded frames in timeline order and are fed by `render_sequence`.

/// PNG encoding and frame file naming.
pub mod png;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
