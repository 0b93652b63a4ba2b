use crate::foundation::error::{ReelsmithError, ReelsmithResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Absolute 0-based frame index in export timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> ReelsmithResult<Self> {
        if start.0 > end.0 {
            return Err(ReelsmithError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Split the range into consecutive batches of at most `size` frames.
    ///
    /// A `size` of zero is treated as one.
    pub fn batches(self, size: u64) -> impl Iterator<Item = FrameRange> {
        let size = size.max(1);
        let end = self.end.0;
        (self.start.0..end)
            .step_by(size as usize)
            .map(move |s| FrameRange {
                start: FrameIndex(s),
                end: FrameIndex((s + size).min(end)),
            })
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelsmithResult<Self> {
        if den == 0 {
            return Err(ReelsmithError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelsmithError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate (`num/1`).
    pub fn integer(num: u32) -> ReelsmithResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Timeline time of the first instant of frame `idx`.
    pub fn frame_time_secs(self, idx: FrameIndex) -> f64 {
        (idx.0 as f64) * self.frame_duration_secs()
    }

    /// Number of frames needed to cover `secs` (ceil semantics).
    ///
    /// A 1e-6 frame tolerance absorbs float noise from summed durations so that e.g. 3.6 s at
    /// 30 fps is 108 frames, not 109.
    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64() - 1e-6).ceil().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, validating that both sides fit the CPU rasterizer (1..=65535).
    pub fn new(width: u32, height: u32) -> ReelsmithResult<Self> {
        let c = Self { width, height };
        c.raster_dims()?;
        Ok(c)
    }

    /// Width and height as the `u16` pair the rasterizer expects.
    pub fn raster_dims(self) -> ReelsmithResult<(u16, u16)> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelsmithError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        let w: u16 = self
            .width
            .try_into()
            .map_err(|_| ReelsmithError::validation("canvas width exceeds u16"))?;
        let h: u16 = self
            .height
            .try_into()
            .map_err(|_| ReelsmithError::validation("canvas height exceeds u16"))?;
        Ok((w, h))
    }

    /// Width as `f64`.
    pub fn w(self) -> f64 {
        f64::from(self.width)
    }

    /// Height as `f64`.
    pub fn h(self) -> f64 {
        f64::from(self.height)
    }

    /// Number of bytes in one tightly packed RGBA8 frame.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        use crate::foundation::math::mul_div255_u8;

        Self {
            r: mul_div255_u8(u16::from(r), u16::from(a)),
            g: mul_div255_u8(u16::from(g), u16::from(a)),
            b: mul_div255_u8(u16::from(b), u16::from(a)),
            a,
        }
    }

    /// Bytes in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
