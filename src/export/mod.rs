//! Export orchestration: configuration, progress reporting and the muxer package.

/// Export settings.
pub mod config;
/// Package layout and archiving.
pub mod package;
/// Job progress records and sinks.
pub mod progress;
/// End-to-end export session.
pub mod session;
