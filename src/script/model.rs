use std::path::Path;

use anyhow::Context;

use crate::assets::color::Color;
use crate::foundation::error::{ReelsmithError, ReelsmithResult};

/// Sentinel sound-effect id meaning "no effect".
pub const NO_SOUND_EFFECT: &str = "none";

/// Kind of media attached to a word overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Still image (decoded once).
    Image,
    /// Video clip (sampled into frames).
    Video,
}

/// One spoken word with its optional overlay and sound-effect assignment.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// Stable identity used for highlight and overlay matching.
    pub id: String,
    /// Spoken text.
    pub text: String,
    /// Caption text; empty means "same as `text`".
    #[serde(default)]
    pub display_text: String,
    /// Sound-effect id, `"none"` or absent for no effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_effect: Option<String>,
    /// Per-effect volume carried through to the muxer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_volume: Option<f64>,
    /// Per-effect delay in seconds, carried through to the muxer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_delay: Option<f64>,
    /// Overlay media URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Explicit overlay media kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// Force a caption line break after this word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_line_break: Option<bool>,
}

impl Word {
    /// Plain word with no overlay or effect.
    pub fn plain(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            display_text: text.clone(),
            text,
            sound_effect: None,
            sound_volume: None,
            sound_delay: None,
            media_url: None,
            media_type: None,
            is_line_break: None,
        }
    }

    /// Caption text, falling back to the spoken text.
    pub fn display(&self) -> &str {
        if self.display_text.is_empty() {
            &self.text
        } else {
            &self.display_text
        }
    }

    /// Overlay URL when one is set and non-empty.
    pub fn overlay_url(&self) -> Option<&str> {
        self.media_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Sound-effect id unless absent or the `"none"` sentinel.
    pub fn effect_id(&self) -> Option<&str> {
        self.sound_effect
            .as_deref()
            .filter(|id| !id.is_empty() && *id != NO_SOUND_EFFECT)
    }

    /// `true` when the word forces a caption line break after itself.
    pub fn breaks_line(&self) -> bool {
        self.is_line_break.unwrap_or(false)
    }
}

/// One narrated sentence.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    /// Stable sentence id (layout cache key).
    pub id: String,
    /// Full sentence text.
    pub text: String,
    /// TTS voice id.
    #[serde(default)]
    pub voice: String,
    /// TTS speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// TTS pitch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    /// Base64-encoded narration audio; sole authority for duration when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_content: Option<String>,
    /// Ordered words; reconstructed from `text` when absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
    /// Editor-side flag for in-flight TTS generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generating: Option<bool>,
}

impl Sentence {
    /// Sentence with no audio whose words are split from `text`.
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut s = Self {
            id: id.into(),
            text: text.into(),
            voice: String::new(),
            speed: None,
            pitch: None,
            audio_content: None,
            words: Vec::new(),
            is_generating: None,
        };
        s.ensure_words();
        s
    }

    /// Fill `words` by whitespace-splitting `text` when no words are stored.
    ///
    /// Generated ids are `<sentence id>-w<index>` so they stay stable across calls.
    pub fn ensure_words(&mut self) {
        if !self.words.is_empty() {
            return;
        }
        self.words = self
            .text
            .split_whitespace()
            .enumerate()
            .map(|(i, t)| Word::plain(format!("{}-w{i}", self.id), t))
            .collect();
    }

    /// Word count used by the duration estimate.
    pub fn word_count(&self) -> usize {
        if self.words.is_empty() {
            self.text.split_whitespace().count()
        } else {
            self.words.len()
        }
    }

    /// `true` when narration audio is attached.
    pub fn has_audio(&self) -> bool {
        self.audio_content
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }
}

/// Caption font weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontWeight {
    /// 400.
    Normal,
    /// 700.
    #[default]
    Bold,
    /// 900.
    ExtraBold,
}

impl FontWeight {
    /// Numeric CSS weight.
    pub fn css_weight(self) -> f32 {
        match self {
            Self::Normal => 400.0,
            Self::Bold => 700.0,
            Self::ExtraBold => 900.0,
        }
    }

    /// Token used inside a font descriptor string.
    pub fn descriptor_token(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
            Self::ExtraBold => "900",
        }
    }
}

/// Caption styling shared by layout and compositing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionSettings {
    /// Font family name, resolved through the configured font book.
    pub font_family: String,
    /// Font size in pixels at the render resolution.
    pub font_size: f64,
    /// Uppercase the display text before measuring and drawing.
    pub is_uppercase: bool,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Italic style.
    pub is_italic: bool,
    /// Colour of non-active words.
    pub text_color: Color,
    /// Colour of the active word.
    pub highlight_color: Color,
    /// Draw a solid offset shadow under each word.
    pub has_shadow: bool,
    /// Shadow colour.
    pub shadow_color: Color,
    /// Shadow offset in pixels (both axes).
    pub shadow_size: f64,
    /// Draw a background pill behind each line.
    pub has_background: bool,
    /// Pill colour.
    pub background_color: Color,
    /// Extra downward offset of the caption block, in pixels at the 1080-wide reference size.
    pub padding_top: f64,
    /// Captions on top and overlay at the bottom instead of the default arrangement.
    pub swap_position: bool,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_owned(),
            font_size: 96.0,
            is_uppercase: false,
            font_weight: FontWeight::Bold,
            is_italic: false,
            text_color: Color::WHITE,
            highlight_color: Color::rgba(1.0, 1.0, 0.0, 1.0),
            has_shadow: true,
            shadow_color: Color::BLACK,
            shadow_size: 4.0,
            has_background: false,
            background_color: Color::rgba(0.0, 0.0, 0.0, 0.5),
            padding_top: 0.0,
            swap_position: false,
        }
    }
}

impl CaptionSettings {
    /// Validate values that would otherwise produce degenerate layouts.
    pub fn validate(&self) -> ReelsmithResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ReelsmithError::validation(
                "captionSettings.fontSize must be finite and > 0",
            ));
        }
        if !self.shadow_size.is_finite() || self.shadow_size < 0.0 {
            return Err(ReelsmithError::validation(
                "captionSettings.shadowSize must be finite and >= 0",
            ));
        }
        if !self.padding_top.is_finite() {
            return Err(ReelsmithError::validation(
                "captionSettings.paddingTop must be finite",
            ));
        }
        if self.font_family.trim().is_empty() {
            return Err(ReelsmithError::validation(
                "captionSettings.fontFamily must be non-empty",
            ));
        }
        Ok(())
    }

    /// Copy with pixel quantities scaled for a different render resolution.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            font_size: (self.font_size * factor).round().max(1.0),
            shadow_size: (self.shadow_size * factor).round(),
            padding_top: (self.padding_top * factor).round(),
            ..self.clone()
        }
    }

    /// Line advance (`1.3 × font size`).
    pub fn line_height(&self) -> f64 {
        self.font_size * 1.3
    }

    /// Apply the uppercase transform when enabled.
    pub fn transform_text(&self, text: &str) -> String {
        if self.is_uppercase {
            text.to_uppercase()
        } else {
            text.to_owned()
        }
    }
}

/// A video project: ordered script plus presentation settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Project type tag (e.g. `"reels"`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered script.
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    /// Background video URL or path, muxed underneath the frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_video: Option<String>,
    /// Background thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_thumbnail: Option<String>,
    /// Caption styling; editor defaults when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_settings: Option<CaptionSettings>,
    /// Creation timestamp as stored by the editor.
    #[serde(default)]
    pub created_at: String,
}

impl Project {
    /// Parse a project from JSON text.
    pub fn from_json_str(s: &str) -> ReelsmithResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a project file.
    pub fn from_path(path: &Path) -> ReelsmithResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Caption settings, falling back to editor defaults.
    pub fn captions(&self) -> CaptionSettings {
        self.caption_settings.clone().unwrap_or_default()
    }

    /// Reconstruct missing word lists in every sentence.
    pub fn ensure_words(&mut self) {
        for s in &mut self.sentences {
            s.ensure_words();
        }
    }

    /// Validate ids and caption settings.
    pub fn validate(&self) -> ReelsmithResult<()> {
        let mut seen = std::collections::HashSet::new();
        for s in &self.sentences {
            if s.id.trim().is_empty() {
                return Err(ReelsmithError::validation("sentence id must be non-empty"));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(ReelsmithError::validation(format!(
                    "duplicate sentence id '{}'",
                    s.id
                )));
            }
        }
        self.captions().validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
