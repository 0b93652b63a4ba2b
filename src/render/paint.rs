use std::sync::Arc;

use crate::assets::color::Color;
use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};

/// A decoded image wrapped as a `vello_cpu` paint.
#[derive(Clone)]
pub struct ImagePaint {
    pub(crate) paint: vello_cpu::Image,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Debug for ImagePaint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePaint")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl ImagePaint {
    /// Upload a prepared image.
    pub fn from_prepared(img: &PreparedImage) -> ReelsmithResult<Self> {
        let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: img.width,
            height: img.height,
        })
    }
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelsmithResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelsmithError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelsmithError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelsmithError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn rounded_rect_to_cpu(r: Rect, radius: f64) -> vello_cpu::kurbo::BezPath {
    use kurbo::Shape;

    let rr = kurbo::RoundedRect::from_rect(r, radius);
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in rr.path_elements(0.1) {
        match el {
            kurbo::PathEl::MoveTo(a) => p.move_to((a.x, a.y)),
            kurbo::PathEl::LineTo(a) => p.line_to((a.x, a.y)),
            kurbo::PathEl::QuadTo(a, b) => p.quad_to((a.x, a.y), (b.x, b.y)),
            kurbo::PathEl::CurveTo(a, b, c) => p.curve_to((a.x, a.y), (b.x, b.y), (c.x, c.y)),
            kurbo::PathEl::ClosePath => p.close_path(),
        }
    }
    p
}

pub(crate) fn color_to_cpu(c: Color) -> vello_cpu::peniko::Color {
    let [r, g, b, a] = c.to_rgba8();
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}
