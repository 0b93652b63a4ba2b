use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;

/// A rendered frame as RGBA8 pixels.
///
/// Frames come out of the compositor **premultiplied**; the flag makes that explicit at API
/// boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Wrap premultiplied pixels, checking the buffer size against `canvas`.
    pub fn from_premul(canvas: Canvas, data: Vec<u8>) -> ReelsmithResult<Self> {
        if data.len() != canvas.rgba_len() {
            return Err(ReelsmithError::render(format!(
                "frame buffer is {} bytes, expected {}",
                data.len(),
                canvas.rgba_len()
            )));
        }
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        })
    }

    /// Straight-alpha copy of the pixels, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut out);
        }
        out
    }

    /// RGBA of the pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Backend-agnostic settings.
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// If set, every frame starts filled with this RGBA8 colour (straight alpha) instead of
    /// transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
