use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::script::model::{CaptionSettings, FontWeight};

/// Font selection for one shaping call.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    /// Family name as written in caption settings.
    pub family: String,
    /// Size in pixels.
    pub size_px: f32,
    /// Weight.
    pub weight: FontWeight,
    /// Italic style.
    pub italic: bool,
}

impl FontSpec {
    /// Font used for caption words.
    pub fn for_captions(settings: &CaptionSettings) -> Self {
        Self {
            family: settings.font_family.clone(),
            size_px: settings.font_size as f32,
            weight: settings.font_weight,
            italic: settings.is_italic,
        }
    }

    /// CSS-style descriptor, e.g. `"normal bold 96px Arial"`.
    pub fn descriptor(&self) -> String {
        let style = if self.italic { "italic" } else { "normal" };
        format!(
            "{style} {} {}px {}",
            self.weight.descriptor_token(),
            self.size_px,
            self.family
        )
    }
}

/// A glyph positioned relative to the top-left of its shaped text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    /// Glyph id in the font.
    pub id: u32,
    /// X offset in pixels.
    pub x: f32,
    /// Baseline y offset in pixels.
    pub y: f32,
}

/// Result of shaping a single run of text.
#[derive(Clone, Debug)]
pub struct ShapedText {
    /// Total horizontal advance in pixels, trailing whitespace included.
    pub advance: f64,
    /// Line box height in pixels.
    pub height: f64,
    /// Positioned glyphs.
    pub glyphs: Vec<PlacedGlyph>,
    /// Font to draw the glyphs with; `None` for metrics-only shapers.
    pub font: Option<vello_cpu::peniko::FontData>,
    /// Size the glyphs were shaped at.
    pub size_px: f32,
}

impl PartialEq for ShapedText {
    fn eq(&self, other: &Self) -> bool {
        self.advance == other.advance
            && self.height == other.height
            && self.glyphs == other.glyphs
            && self.size_px == other.size_px
            && self.font.is_some() == other.font.is_some()
    }
}

/// Measurement and shaping surface used by caption layout.
pub trait TextShaper {
    /// Shape `text` into positioned glyphs.
    fn shape(&mut self, text: &str, font: &FontSpec) -> ReelsmithResult<ShapedText>;

    /// Horizontal advance of `text` in pixels.
    fn measure(&mut self, text: &str, font: &FontSpec) -> ReelsmithResult<f64> {
        Ok(self.shape(text, font)?.advance)
    }
}

/// Font files keyed by family name (case-insensitive).
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    faces: BTreeMap<String, Arc<Vec<u8>>>,
}

impl FontBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add font bytes under `family`.
    pub fn insert(&mut self, family: &str, bytes: Vec<u8>) {
        self.faces
            .insert(family.trim().to_lowercase(), Arc::new(bytes));
    }

    /// Read a font file and add it under `family`.
    pub fn load(&mut self, family: &str, path: &Path) -> ReelsmithResult<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.insert(family, bytes);
        Ok(())
    }

    /// Number of families.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// `true` when no fonts are registered.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Vec<u8>>)> {
        self.faces.iter()
    }
}

struct Registered {
    name: String,
    data: vello_cpu::peniko::FontData,
}

/// [`TextShaper`] backed by parley, shaping only with fonts from a [`FontBook`].
///
/// Unknown families fall back to the first family in the book.
pub struct ParleyShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    families: HashMap<String, Registered>,
    fallback: Option<String>,
}

impl std::fmt::Debug for ParleyShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyShaper")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl ParleyShaper {
    /// Register every font in `book`.
    pub fn new(book: &FontBook) -> ReelsmithResult<Self> {
        if book.is_empty() {
            return Err(ReelsmithError::validation(
                "no fonts configured; add at least one entry to `fonts`",
            ));
        }
        let mut font_ctx = parley::FontContext::default();
        let mut families = HashMap::new();
        let mut fallback = None;
        for (key, bytes) in book.iter() {
            let registered = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
            let family_id = registered.first().map(|(id, _)| *id).ok_or_else(|| {
                ReelsmithError::validation(format!("font for '{key}' contains no families"))
            })?;
            let name = font_ctx
                .collection
                .family_name(family_id)
                .ok_or_else(|| ReelsmithError::validation("registered font family has no name"))?
                .to_string();
            let data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            );
            fallback.get_or_insert_with(|| key.clone());
            families.insert(key.clone(), Registered { name, data });
        }
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            families,
            fallback,
        })
    }

    fn resolve(&self, family: &str) -> ReelsmithResult<&Registered> {
        let key = family.trim().to_lowercase();
        if let Some(r) = self.families.get(&key) {
            return Ok(r);
        }
        let fb = self
            .fallback
            .as_ref()
            .and_then(|k| self.families.get(k))
            .ok_or_else(|| ReelsmithError::validation("no fonts registered"))?;
        tracing::debug!(family, using = %fb.name, "font family not configured, using fallback");
        Ok(fb)
    }
}

impl TextShaper for ParleyShaper {
    fn shape(&mut self, text: &str, font: &FontSpec) -> ReelsmithResult<ShapedText> {
        if !font.size_px.is_finite() || font.size_px <= 0.0 {
            return Err(ReelsmithError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let (family_name, data) = {
            let r = self.resolve(&font.family)?;
            (r.name.clone(), r.data.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(font.weight.css_weight()),
        ));
        if font.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        let mut advance = 0.0f64;
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let mut x = run.offset();
                let y = run.baseline();
                for g in run.glyphs() {
                    glyphs.push(PlacedGlyph {
                        id: g.id,
                        x: x + g.x,
                        y: y - g.y,
                    });
                    x += g.advance;
                    advance += f64::from(g.advance);
                }
            }
        }

        Ok(ShapedText {
            advance,
            height: f64::from(layout.height()),
            glyphs,
            font: Some(data),
            size_px: font.size_px,
        })
    }
}

/// Metrics-only shaper: every char advances `em × size`, no glyphs are produced.
///
/// Deterministic and font-free, for dry runs and tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceShaper {
    /// Advance per char as a fraction of the font size.
    pub em: f64,
}

impl Default for FixedAdvanceShaper {
    fn default() -> Self {
        Self { em: 0.5 }
    }
}

impl TextShaper for FixedAdvanceShaper {
    fn shape(&mut self, text: &str, font: &FontSpec) -> ReelsmithResult<ShapedText> {
        let size = f64::from(font.size_px);
        Ok(ShapedText {
            advance: text.chars().count() as f64 * self.em * size,
            height: size,
            glyphs: Vec::new(),
            font: None,
            size_px: font.size_px,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/text.rs"]
mod tests;
