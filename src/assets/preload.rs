use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::assets::fetch::AssetFetcher;
use crate::assets::media::MediaDecoder;
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::render::paint::ImagePaint;
use crate::script::model::{MediaType, Sentence};
use crate::timeline::words::OVERLAY_WINDOW_SECS;

/// File extensions treated as video when a word has no explicit media type.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "webm", "ogg", "mov"];

/// One unique overlay URL and how to decode it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlaySource {
    /// Media URL as written on the word.
    pub url: String,
    /// Decode as still or as sampled video.
    pub kind: MediaType,
}

/// Media kind from an explicit tag, else from the URL's extension.
pub fn infer_media_type(url: &str, explicit: Option<MediaType>) -> MediaType {
    if let Some(kind) = explicit {
        return kind;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((_, ext)) if VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            MediaType::Video
        }
        _ => MediaType::Image,
    }
}

/// Unique overlay URLs across the script, in first-use order.
///
/// When several words share a URL, the first explicit media type wins.
pub fn collect_overlay_sources(sentences: &[Sentence]) -> Vec<OverlaySource> {
    let mut order: Vec<&str> = Vec::new();
    let mut explicit: HashMap<&str, Option<MediaType>> = HashMap::new();
    for w in sentences.iter().flat_map(|s| s.words.iter()) {
        let Some(url) = w.overlay_url() else {
            continue;
        };
        match explicit.get_mut(url) {
            None => {
                order.push(url);
                explicit.insert(url, w.media_type);
            }
            Some(slot) => {
                if slot.is_none() {
                    *slot = w.media_type;
                }
            }
        }
    }
    order
        .into_iter()
        .map(|url| OverlaySource {
            url: url.to_owned(),
            kind: infer_media_type(url, explicit.get(url).copied().flatten()),
        })
        .collect()
}

/// Frames worth sampling from an overlay clip at `sample_fps`.
///
/// An overlay is never shown more than [`OVERLAY_WINDOW_SECS`] after it appears, so later frames
/// are never read by [`OverlayAsset::frame_at`].
pub fn video_frame_cap(sample_fps: u32) -> usize {
    (OVERLAY_WINDOW_SECS * f64::from(sample_fps)).ceil() as usize + 1
}

/// A decoded overlay.
#[derive(Clone, Debug)]
pub enum OverlayAsset {
    /// Still image.
    Still(ImagePaint),
    /// Video frames sampled at a fixed rate, in order.
    Frames(Arc<[ImagePaint]>),
}

impl OverlayAsset {
    /// Frame to show `elapsed` seconds after the overlay appeared (video loops).
    pub fn frame_at(&self, elapsed: f64, sample_fps: u32) -> Option<&ImagePaint> {
        match self {
            Self::Still(p) => Some(p),
            Self::Frames(frames) => {
                if frames.is_empty() {
                    return None;
                }
                let idx = (elapsed.max(0.0) * f64::from(sample_fps)).floor() as usize;
                frames.get(idx % frames.len())
            }
        }
    }
}

/// Decoded overlays keyed by URL; read-only once built.
#[derive(Clone, Debug, Default)]
pub struct AssetCache {
    entries: HashMap<String, OverlayAsset>,
    sample_fps: u32,
}

impl AssetCache {
    /// Empty cache whose clips were sampled at `sample_fps`.
    pub fn new(sample_fps: u32) -> Self {
        Self {
            entries: HashMap::new(),
            sample_fps,
        }
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, url: impl Into<String>, asset: OverlayAsset) {
        self.entries.insert(url.into(), asset);
    }

    /// Entry for `url`.
    pub fn get(&self, url: &str) -> Option<&OverlayAsset> {
        self.entries.get(url)
    }

    /// Rate video entries were sampled at.
    pub fn sample_fps(&self) -> u32 {
        self.sample_fps
    }

    /// Number of decoded overlays.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no overlay decoded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`preload_assets`].
#[derive(Debug)]
pub struct PreloadReport {
    /// Decoded overlays.
    pub cache: AssetCache,
    /// URLs that could not be fetched or decoded, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Fetch and decode every source in parallel.
///
/// A failing asset is logged and left out of the cache; it never fails the batch.
/// `on_progress(done, total)` is called once per finished asset, from worker threads.
#[tracing::instrument(skip_all, fields(assets = sources.len(), sample_fps = sample_fps))]
pub fn preload_assets(
    sources: &[OverlaySource],
    fetcher: &dyn AssetFetcher,
    decoder: &dyn MediaDecoder,
    sample_fps: u32,
    on_progress: &(dyn Fn(usize, usize) + Sync),
) -> PreloadReport {
    let total = sources.len();
    let done = AtomicUsize::new(0);
    let results: Vec<(String, ReelsmithResult<OverlayAsset>)> = sources
        .par_iter()
        .map(|src| {
            let r = load_one(src, fetcher, decoder, sample_fps);
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            (src.url.clone(), r)
        })
        .collect();

    let mut cache = AssetCache::new(sample_fps);
    let mut failed = Vec::new();
    for (url, r) in results {
        match r {
            Ok(asset) => cache.insert(url, asset),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "overlay asset unavailable, skipping");
                failed.push((url, e.to_string()));
            }
        }
    }
    tracing::info!(loaded = cache.len(), failed = failed.len(), "overlay assets preloaded");
    PreloadReport { cache, failed }
}

fn load_one(
    src: &OverlaySource,
    fetcher: &dyn AssetFetcher,
    decoder: &dyn MediaDecoder,
    sample_fps: u32,
) -> ReelsmithResult<OverlayAsset> {
    let bytes = fetcher.fetch(&src.url)?;
    match src.kind {
        MediaType::Image => {
            let img = decoder.decode_image(&bytes)?;
            Ok(OverlayAsset::Still(ImagePaint::from_prepared(&img)?))
        }
        MediaType::Video => {
            let cap = video_frame_cap(sample_fps);
            let frames = decoder.extract_video_frames(&bytes, sample_fps, cap)?;
            if frames.is_empty() {
                return Err(ReelsmithError::asset("video produced no frames"));
            }
            let paints = frames
                .iter()
                .take(cap)
                .map(ImagePaint::from_prepared)
                .collect::<ReelsmithResult<Vec<_>>>()?;
            tracing::debug!(url = %src.url, frames = paints.len(), "video overlay sampled");
            Ok(OverlayAsset::Frames(paints.into()))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/preload.rs"]
mod tests;
