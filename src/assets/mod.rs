//! Overlay media: colours, fetching, decoding and the per-export preload cache.

/// CSS-style colour parsing.
pub mod color;
/// Still-image decoding into premultiplied rasters.
pub mod decode;
/// Media bytes by URL (local files, `data:` URLs, HTTP through an optional proxy).
pub mod fetch;
/// Image and video-frame decoding seam.
pub mod media;
/// Parallel overlay preloading.
pub mod preload;
