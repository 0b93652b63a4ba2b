//! Sentence durations, timeline placement and per-instant word state.

/// Timeline construction.
pub mod builder;
/// Per-sentence duration resolution.
pub mod duration;
/// Word slices, highlight and overlay lookup.
pub mod words;
