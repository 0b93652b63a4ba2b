use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Decoded raster ready for the compositor (premultiplied RGBA8).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Wrap straight-alpha RGBA8 bytes, premultiplying them.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> ReelsmithResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(ReelsmithError::asset(format!(
                "rgba buffer of {} bytes does not match {width}x{height}",
                rgba.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }
}

/// Decode any still format `image` understands (png, jpeg, gif first frame, webp, ...).
pub fn decode_image(bytes: &[u8]) -> ReelsmithResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PreparedImage::from_straight_rgba8(width, height, rgba.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
