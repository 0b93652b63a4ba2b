use crate::assets::color::Color;
use crate::assets::preload::{AssetCache, OverlayAsset};
use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Rect};
use crate::foundation::error::ReelsmithResult;
use crate::layout::captions::{CaptionLayout, LayoutCache};
use crate::layout::text::{FontSpec, ShapedText, TextShaper};
use crate::render::backend::{FrameRGBA, RenderSettings};
use crate::render::geometry;
use crate::render::paint::{
    ImagePaint, affine_to_cpu, color_to_cpu, rect_to_cpu, rounded_rect_to_cpu,
};
use crate::script::model::{CaptionSettings, FontWeight};
use crate::timeline::builder::{Timeline, TimelineItem};
use crate::timeline::words::{ActiveOverlay, FrameState, GapPolicy, frame_state};

/// Text of the promotional banner when none is configured.
pub const DEFAULT_BANNER_TEXT: &str = "Subscribe for more";

/// Solid strip across the top of every frame with centred text.
#[derive(Clone, Debug)]
pub struct Banner {
    /// Strip colour.
    pub fill: Color,
    /// Text colour.
    pub text_color: Color,
    /// Shaped text; `None` draws the strip only.
    pub text: Option<ShapedText>,
}

impl Banner {
    /// Shape `text` in bold `family` at the banner size for `canvas`.
    pub fn shaped(
        canvas: Canvas,
        text: &str,
        family: &str,
        fill: Color,
        text_color: Color,
        shaper: &mut dyn TextShaper,
    ) -> ReelsmithResult<Self> {
        let text = if text.trim().is_empty() {
            None
        } else {
            let font = FontSpec {
                family: family.to_owned(),
                size_px: geometry::banner_font_px(canvas) as f32,
                weight: FontWeight::Bold,
                italic: false,
            };
            Some(shaper.shape(text, &font)?)
        };
        Ok(Self {
            fill,
            text_color,
            text,
        })
    }
}

/// Draws one frame from per-export caches.
///
/// Rendering is a pure function of the query time: every call builds its own raster context and
/// only reads the timeline, layouts and assets, so frames can be composed from any number of
/// threads at once.
#[derive(Debug)]
pub struct FrameCompositor {
    canvas: Canvas,
    timeline: Timeline,
    layouts: LayoutCache,
    assets: AssetCache,
    captions: CaptionSettings,
    banner: Option<Banner>,
    watermark: Option<ImagePaint>,
    gap_policy: GapPolicy,
    settings: RenderSettings,
}

impl FrameCompositor {
    /// Compositor with no banner, no watermark and the default gap policy.
    pub fn new(
        canvas: Canvas,
        timeline: Timeline,
        layouts: LayoutCache,
        assets: AssetCache,
        captions: CaptionSettings,
    ) -> Self {
        Self {
            canvas,
            timeline,
            layouts,
            assets,
            captions,
            banner: None,
            watermark: None,
            gap_policy: GapPolicy::default(),
            settings: RenderSettings::default(),
        }
    }

    /// Draw `banner` at the top of every frame.
    pub fn with_banner(mut self, banner: Banner) -> Self {
        self.banner = Some(banner);
        self
    }

    /// Draw `watermark` in the bottom-right corner of every frame.
    pub fn with_watermark(mut self, watermark: ImagePaint) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// What to draw between sentences.
    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// Backend settings (clear colour).
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Timeline being rendered.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Caption and overlay state at `t`, `None` for banner-only frames.
    pub fn state_at(&self, t: f64) -> Option<FrameState> {
        frame_state(&self.timeline, t, self.gap_policy)
    }

    /// Render frame `idx` at `fps`.
    pub fn compose_index(&self, idx: FrameIndex, fps: Fps) -> ReelsmithResult<FrameRGBA> {
        self.compose_frame(fps.frame_time_secs(idx))
    }

    /// Render the frame shown at `t` seconds.
    ///
    /// Z-order, back to front: clear, banner, overlay, captions, watermark.
    pub fn compose_frame(&self, t: f64) -> ReelsmithResult<FrameRGBA> {
        let (w, h) = self.canvas.raster_dims()?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        let full = Rect::new(0.0, 0.0, self.canvas.w(), self.canvas.h());

        if let Some([r, g, b, a]) = self.settings.clear_rgba {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&rect_to_cpu(full));
        }

        if let Some(banner) = &self.banner {
            self.draw_banner(&mut ctx, banner);
        }

        if let Some(state) = self.state_at(t) {
            let item = &self.timeline.items()[state.item_index];
            if let Some(overlay) = state.overlay {
                self.draw_overlay(&mut ctx, item, overlay);
            }
            if let Some(layout) = self.layouts.get(&item.sentence.id) {
                let active_id = state
                    .active_word
                    .and_then(|i| item.sentence.words.get(i))
                    .map(|w| w.id.as_str());
                self.draw_captions(&mut ctx, layout, active_id);
            }
        }

        if let Some(wm) = &self.watermark {
            self.draw_watermark(&mut ctx, wm);
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        FrameRGBA::from_premul(self.canvas, pixmap.data_as_u8_slice().to_vec())
    }

    fn draw_banner(&self, ctx: &mut vello_cpu::RenderContext, banner: &Banner) {
        let strip = geometry::banner_rect(self.canvas);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color_to_cpu(banner.fill));
        ctx.fill_rect(&rect_to_cpu(strip));

        if let Some(text) = &banner.text {
            let x = (self.canvas.w() - text.advance) / 2.0;
            let y = (strip.height() - text.height) / 2.0;
            fill_text(ctx, text, x, y, banner.text_color);
        }
    }

    fn draw_overlay(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        item: &TimelineItem,
        overlay: ActiveOverlay,
    ) {
        let Some(url) = item
            .sentence
            .words
            .get(overlay.word_index)
            .and_then(|w| w.overlay_url())
        else {
            return;
        };
        // A failed preload leaves no entry: the word simply has no overlay.
        let Some(asset) = self.assets.get(url) else {
            return;
        };
        let Some(paint) = asset.frame_at(overlay.elapsed, self.assets.sample_fps()) else {
            return;
        };

        let bounds = geometry::overlay_box(self.canvas, self.captions.swap_position);
        let mut target = geometry::fit_contain(bounds, paint.width, paint.height);
        if matches!(asset, OverlayAsset::Still(_)) {
            target = geometry::scale_about_center(target, geometry::pop_in_scale(overlay.elapsed));
        }
        fill_image(ctx, paint, target);
    }

    fn draw_captions(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        layout: &CaptionLayout,
        active_id: Option<&str>,
    ) {
        let s = &self.captions;
        let top = geometry::caption_top(self.canvas, layout.total_height, s);
        let radius = geometry::caption_pill_radius(self.canvas);

        for (li, line) in layout.lines.iter().enumerate() {
            let line_top = top + li as f64 * layout.line_height;

            if s.has_background {
                let pill = geometry::caption_pill(self.canvas, line.width, line_top, s.font_size);
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                ctx.set_paint(color_to_cpu(s.background_color));
                ctx.fill_path(&rounded_rect_to_cpu(pill, radius));
            }

            let mut x = geometry::caption_line_x(self.canvas, line.width);
            for word in &line.words {
                let color = if active_id == Some(word.id.as_str()) {
                    s.highlight_color
                } else {
                    s.text_color
                };
                if s.has_shadow && s.shadow_size != 0.0 {
                    fill_text(
                        ctx,
                        &word.shaped,
                        x + s.shadow_size,
                        line_top + s.shadow_size,
                        s.shadow_color,
                    );
                }
                fill_text(ctx, &word.shaped, x, line_top, color);
                x += word.advance;
            }
        }
    }

    fn draw_watermark(&self, ctx: &mut vello_cpu::RenderContext, wm: &ImagePaint) {
        let Some(target) = geometry::watermark_rect(self.canvas, wm.width, wm.height) else {
            return;
        };
        ctx.push_opacity_layer(geometry::WATERMARK_ALPHA);
        fill_image(ctx, wm, target);
        ctx.pop_layer();
    }
}

fn fill_image(ctx: &mut vello_cpu::RenderContext, paint: &ImagePaint, target: Rect) {
    if paint.width == 0 || paint.height == 0 || target.width() <= 0.0 || target.height() <= 0.0 {
        return;
    }
    let (pw, ph) = (f64::from(paint.width), f64::from(paint.height));
    let tr = Affine::translate((target.x0, target.y0))
        * Affine::scale_non_uniform(target.width() / pw, target.height() / ph);
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(paint.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, pw, ph));
}

fn fill_text(
    ctx: &mut vello_cpu::RenderContext,
    text: &ShapedText,
    x: f64,
    y: f64,
    color: Color,
) {
    let Some(font) = &text.font else {
        return;
    };
    if text.glyphs.is_empty() {
        return;
    }
    ctx.set_transform(affine_to_cpu(Affine::translate((x, y))));
    ctx.set_paint(color_to_cpu(color));
    let glyphs = text.glyphs.iter().map(|g| vello_cpu::Glyph {
        id: g.id,
        x: g.x,
        y: g.y,
    });
    ctx.glyph_run(font).font_size(text.size_px).fill_glyphs(glyphs);
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
