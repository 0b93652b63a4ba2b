//! Frame geometry: where the banner, overlay, caption block and watermark go on a canvas.
//!
//! All rules are relative to the canvas size so the same project renders consistently at any
//! export resolution. Pixel constants (pill padding, watermark margin) are expressed at the
//! 1080 px reference width and scaled.

use crate::foundation::core::{Canvas, Rect};
use crate::script::model::CaptionSettings;

/// Width the pixel constants below are expressed at.
pub const REFERENCE_WIDTH: f64 = 1080.0;
/// Banner height as a fraction of canvas height.
pub const BANNER_HEIGHT_FRACTION: f64 = 0.05;
/// Banner text size as a fraction of banner height.
pub const BANNER_TEXT_FRACTION: f64 = 0.6;
/// Overlay box side limit as a fraction of canvas width.
pub const OVERLAY_MAX_WIDTH_FRACTION: f64 = 0.6;
/// Overlay box side limit as a fraction of canvas height.
pub const OVERLAY_MAX_HEIGHT_FRACTION: f64 = 0.4;
/// Still overlays scale up from this factor when they appear.
pub const POP_IN_START_SCALE: f64 = 0.8;
/// Duration of the pop-in.
pub const POP_IN_SECS: f64 = 0.15;
/// Height of the caption region (top or bottom) as a fraction of canvas height.
pub const CAPTION_REGION_FRACTION: f64 = 0.45;
/// Watermark width as a fraction of canvas width.
pub const WATERMARK_WIDTH_FRACTION: f64 = 0.15;
/// Watermark opacity.
pub const WATERMARK_ALPHA: f32 = 0.5;

const WATERMARK_MARGIN_PX: f64 = 20.0;
const PILL_PAD_X_PX: f64 = 20.0;
const PILL_RADIUS_PX: f64 = 4.0;

/// Pixel scale relative to the reference width.
pub fn reference_scale(canvas: Canvas) -> f64 {
    canvas.w() / REFERENCE_WIDTH
}

/// Full-width banner strip at the top.
pub fn banner_rect(canvas: Canvas) -> Rect {
    Rect::new(0.0, 0.0, canvas.w(), canvas.h() * BANNER_HEIGHT_FRACTION)
}

/// Banner text size in pixels (at least 1).
pub fn banner_font_px(canvas: Canvas) -> f64 {
    (banner_rect(canvas).height() * BANNER_TEXT_FRACTION)
        .round()
        .max(1.0)
}

/// Square box an overlay is fitted into.
///
/// Side `min(0.6 W, 0.4 H)`, centred horizontally, centred at `0.75 H` when captions are swapped
/// to the top and at `0.35 H` otherwise.
pub fn overlay_box(canvas: Canvas, swap_position: bool) -> Rect {
    let size = (canvas.w() * OVERLAY_MAX_WIDTH_FRACTION).min(canvas.h() * OVERLAY_MAX_HEIGHT_FRACTION);
    let cy = if swap_position {
        canvas.h() * 0.75
    } else {
        canvas.h() * 0.35
    };
    let x0 = (canvas.w() - size) / 2.0;
    let y0 = cy - size / 2.0;
    Rect::new(x0, y0, x0 + size, y0 + size)
}

/// Largest rect with the media's aspect ratio that fits in `bounds`, centred.
pub fn fit_contain(bounds: Rect, media_w: u32, media_h: u32) -> Rect {
    if media_w == 0 || media_h == 0 {
        return bounds;
    }
    let (mw, mh) = (f64::from(media_w), f64::from(media_h));
    let s = (bounds.width() / mw).min(bounds.height() / mh);
    let (w, h) = (mw * s, mh * s);
    let c = bounds.center();
    Rect::new(c.x - w / 2.0, c.y - h / 2.0, c.x + w / 2.0, c.y + h / 2.0)
}

/// Pop-in scale for a still overlay visible for `elapsed` seconds.
pub fn pop_in_scale(elapsed: f64) -> f64 {
    if elapsed >= POP_IN_SECS {
        return 1.0;
    }
    POP_IN_START_SCALE + (elapsed.max(0.0) / POP_IN_SECS) * (1.0 - POP_IN_START_SCALE)
}

/// `rect` scaled by `factor` about its centre.
pub fn scale_about_center(rect: Rect, factor: f64) -> Rect {
    let c = rect.center();
    let (hw, hh) = (rect.width() * factor / 2.0, rect.height() * factor / 2.0);
    Rect::new(c.x - hw, c.y - hh, c.x + hw, c.y + hh)
}

/// Top of the first caption line.
///
/// The caption block is centred vertically in the top 45 % of the canvas when swapped, in the
/// bottom 45 % otherwise, then shifted down by `padding_top` pixels.
pub fn caption_top(canvas: Canvas, block_height: f64, settings: &CaptionSettings) -> f64 {
    let region = canvas.h() * CAPTION_REGION_FRACTION;
    let base = if settings.swap_position {
        (region - block_height) / 2.0
    } else {
        canvas.h() * (1.0 - CAPTION_REGION_FRACTION) + (region - block_height) / 2.0
    };
    base + settings.padding_top
}

/// Left edge of a centred caption line of `line_width`.
pub fn caption_line_x(canvas: Canvas, line_width: f64) -> f64 {
    (canvas.w() - line_width) / 2.0
}

/// Background pill behind a caption line whose text box starts at `line_top`.
pub fn caption_pill(canvas: Canvas, line_width: f64, line_top: f64, font_size: f64) -> Rect {
    let pad = PILL_PAD_X_PX * reference_scale(canvas);
    let x0 = caption_line_x(canvas, line_width) - pad;
    let y0 = line_top - 0.1 * font_size;
    Rect::new(x0, y0, x0 + line_width + 2.0 * pad, y0 + 1.2 * font_size)
}

/// Corner radius of the caption pill.
pub fn caption_pill_radius(canvas: Canvas) -> f64 {
    PILL_RADIUS_PX * reference_scale(canvas)
}

/// Watermark placement: 15 % of canvas width, aspect kept, inset from the bottom-right corner.
pub fn watermark_rect(canvas: Canvas, image_w: u32, image_h: u32) -> Option<Rect> {
    if image_w == 0 || image_h == 0 {
        return None;
    }
    let w = canvas.w() * WATERMARK_WIDTH_FRACTION;
    let h = w * f64::from(image_h) / f64::from(image_w);
    let margin = WATERMARK_MARGIN_PX * reference_scale(canvas);
    let x0 = canvas.w() - w - margin;
    let y0 = canvas.h() - h - margin;
    Some(Rect::new(x0, y0, x0 + w, y0 + h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/geometry.rs"]
mod tests;
