/// Caption line wrapping and the layout cache.
pub mod captions;
/// Text shaping seam and the parley shaper.
pub mod text;
