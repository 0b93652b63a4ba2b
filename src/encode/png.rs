use image::ImageEncoder as _;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::render::backend::FrameRGBA;

/// Extension of encoded frame files.
pub const FRAME_EXTENSION: &str = "png";

/// A frame compressed for packaging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// PNG file bytes (straight alpha).
    pub png: Vec<u8>,
}

/// Muxer-facing file name: `frame` + 5-digit zero-padded index + extension.
pub fn frame_file_name(idx: FrameIndex) -> String {
    format!("frame{:05}.{FRAME_EXTENSION}", idx.0)
}

/// Encode a frame as RGBA PNG.
///
/// The encoder has no time-dependent metadata, so equal frames yield equal bytes.
pub fn encode_png(frame: &FrameRGBA) -> ReelsmithResult<EncodedFrame> {
    let straight = frame.to_straight_rgba8();
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(
            &straight,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| ReelsmithError::render(format!("png encode failed: {e}")))?;
    Ok(EncodedFrame {
        width: frame.width,
        height: frame.height,
        png,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
