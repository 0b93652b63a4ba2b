use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::assets::color::Color;
use crate::audio::tracks::BG_MUSIC_VOLUME;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::render::compositor::DEFAULT_BANNER_TEXT;
use crate::render::scheduler::DEFAULT_CONCURRENCY;
use crate::timeline::duration::DurationFallback;
use crate::timeline::words::GapPolicy;

/// Promotional strip at the top of every frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    /// Draw the banner.
    pub enabled: bool,
    /// Banner text; empty draws the strip only.
    pub text: String,
    /// Strip colour.
    pub color: Color,
    /// Text colour.
    pub text_color: Color,
    /// Font family (must be registered under `fonts`); bold is always used.
    pub font_family: String,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            text: DEFAULT_BANNER_TEXT.to_owned(),
            color: Color::rgba8(255, 0, 0, 255),
            text_color: Color::WHITE,
            font_family: "Arial".to_owned(),
        }
    }
}

/// Looping background music.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MusicConfig {
    /// Audio file.
    pub path: PathBuf,
    /// Gain relative to narration.
    #[serde(default = "MusicConfig::default_volume")]
    pub volume: f64,
}

impl MusicConfig {
    fn default_volume() -> f64 {
        BG_MUSIC_VOLUME
    }
}

/// Export settings; every field has a default so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Render width in pixels.
    pub width: u32,
    /// Render height in pixels.
    pub height: u32,
    /// Final video width requested from the muxer (defaults to `width`).
    pub output_width: Option<u32>,
    /// Final video height requested from the muxer (defaults to `height`).
    pub output_height: Option<u32>,
    /// Frames per second.
    pub fps: u32,
    /// Frames rendered concurrently.
    pub concurrency: usize,
    /// Upper bound on reading one narration clip's duration.
    pub duration_probe_timeout_ms: u64,
    /// Duration used when a narration clip cannot be read.
    pub duration_fallback: DurationFallback,
    /// What to draw between sentences.
    pub gap_policy: GapPolicy,
    /// Rate video overlays are sampled at.
    pub video_sample_fps: u32,
    /// Frame background (straight RGBA8); transparent when absent.
    pub clear_rgba: Option<[u8; 4]>,
    /// Base directory for relative media URLs.
    pub assets_root: PathBuf,
    /// Same-origin proxy for absolute media URLs (`<proxy>?url=<encoded>`).
    pub proxy_url: Option<String>,
    /// Per-request HTTP timeout.
    pub fetch_timeout_ms: u64,
    /// Font family name to font file.
    pub fonts: BTreeMap<String, PathBuf>,
    /// Top banner.
    pub banner: BannerConfig,
    /// Watermark image drawn bottom-right.
    pub watermark: Option<PathBuf>,
    /// Sound-effect id to audio file.
    pub sound_effects: BTreeMap<String, PathBuf>,
    /// Looping background music.
    pub background_music: Option<MusicConfig>,
    /// Zip the package instead of leaving a directory.
    pub archive: bool,
    /// Replace an existing output.
    pub overwrite: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            output_width: None,
            output_height: None,
            fps: 30,
            concurrency: DEFAULT_CONCURRENCY,
            duration_probe_timeout_ms: 2000,
            duration_fallback: DurationFallback::default(),
            gap_policy: GapPolicy::default(),
            video_sample_fps: 30,
            clear_rgba: None,
            assets_root: PathBuf::from("."),
            proxy_url: None,
            fetch_timeout_ms: 30_000,
            fonts: BTreeMap::new(),
            banner: BannerConfig::default(),
            watermark: None,
            sound_effects: BTreeMap::new(),
            background_music: None,
            archive: true,
            overwrite: false,
        }
    }
}

impl ExportConfig {
    /// Load a JSON config file. Relative paths inside it resolve against the file's directory.
    pub fn from_path(path: &Path) -> ReelsmithResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read export config '{}'", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            cfg.rebase(base);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve relative paths against `base`.
    pub fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.assets_root);
        self.fonts.values_mut().for_each(fix);
        self.sound_effects.values_mut().for_each(fix);
        if let Some(w) = self.watermark.as_mut() {
            fix(w);
        }
        if let Some(m) = self.background_music.as_mut() {
            fix(&mut m.path);
        }
    }

    /// Check ranges.
    pub fn validate(&self) -> ReelsmithResult<()> {
        self.canvas()?;
        self.fps()?;
        if self.concurrency == 0 {
            return Err(ReelsmithError::validation("concurrency must be >= 1"));
        }
        if self.video_sample_fps == 0 {
            return Err(ReelsmithError::validation("video_sample_fps must be >= 1"));
        }
        if let Some(m) = &self.background_music
            && !(0.0..=1.0).contains(&m.volume)
        {
            return Err(ReelsmithError::validation(
                "background_music.volume must be in 0..=1",
            ));
        }
        Ok(())
    }

    /// Render canvas.
    pub fn canvas(&self) -> ReelsmithResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    /// Frame rate.
    pub fn fps(&self) -> ReelsmithResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Output size handed to the muxer.
    pub fn output_size(&self) -> (u32, u32) {
        (
            self.output_width.unwrap_or(self.width),
            self.output_height.unwrap_or(self.height),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/config.rs"]
mod tests;
