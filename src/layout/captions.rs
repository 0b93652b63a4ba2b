use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use smallvec::SmallVec;
use xxhash_rust::xxh3::Xxh3;

use crate::foundation::error::ReelsmithResult;
use crate::layout::text::{FontSpec, ShapedText, TextShaper};
use crate::script::model::{CaptionSettings, Sentence, Word};

/// Caption lines may use at most this fraction of the canvas width.
pub const MAX_LINE_WIDTH_FRACTION: f64 = 0.7;

const XXH3_SEED: u64 = 0x5e17_c0de_a11c_e5ed;

/// One word placed on a caption line.
#[derive(Clone, Debug, PartialEq)]
pub struct LaidWord {
    /// Index of the word inside its sentence.
    pub index: usize,
    /// Word id (highlight matching).
    pub id: String,
    /// Text as drawn (uppercase transform applied).
    pub text: String,
    /// Advance of `text + " "`; the pen moves by this much after the word.
    pub advance: f64,
    /// Glyphs of `text`.
    pub shaped: ShapedText,
}

/// A wrapped caption line.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLine {
    /// Words left to right.
    pub words: SmallVec<[LaidWord; 4]>,
    /// Line width without the trailing space.
    pub width: f64,
}

/// Wrapped caption geometry for one sentence; independent of time.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLayout {
    /// Lines top to bottom.
    pub lines: Vec<CaptionLine>,
    /// Distance between line tops.
    pub line_height: f64,
    /// `lines.len() × line_height`.
    pub total_height: f64,
}

/// Greedy line fill of `words` within `0.7 × canvas_width`.
///
/// A line never starts empty: a word wider than the limit gets a line of its own. A word with
/// `isLineBreak` ends its line.
pub fn layout_caption(
    words: &[Word],
    settings: &CaptionSettings,
    canvas_width: u32,
    shaper: &mut dyn TextShaper,
) -> ReelsmithResult<CaptionLayout> {
    let font = FontSpec::for_captions(settings);
    let max_width = f64::from(canvas_width) * MAX_LINE_WIDTH_FRACTION;
    let space = shaper.measure(" ", &font)?;

    let mut lines = Vec::new();
    let mut current: SmallVec<[LaidWord; 4]> = SmallVec::new();
    let mut current_width = 0.0;

    let finish = |words: SmallVec<[LaidWord; 4]>, width: f64| CaptionLine {
        words,
        width: (width - space).max(0.0),
    };

    for (index, word) in words.iter().enumerate() {
        let text = settings.transform_text(word.display());
        let advance = shaper.measure(&format!("{text} "), &font)?;
        let shaped = shaper.shape(&text, &font)?;
        let laid = LaidWord {
            index,
            id: word.id.clone(),
            text,
            advance,
            shaped,
        };

        if current.is_empty() || current_width + advance < max_width {
            current.push(laid);
            current_width += advance;
        } else {
            lines.push(finish(std::mem::take(&mut current), current_width));
            current.push(laid);
            current_width = advance;
        }

        if word.breaks_line() {
            lines.push(finish(std::mem::take(&mut current), current_width));
            current_width = 0.0;
        }
    }
    if !current.is_empty() {
        lines.push(finish(current, current_width));
    }

    let line_height = settings.line_height();
    Ok(CaptionLayout {
        total_height: lines.len() as f64 * line_height,
        lines,
        line_height,
    })
}

/// What a [`LayoutCache::refresh`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Layouts computed.
    pub rebuilt: usize,
    /// Layouts kept from a previous refresh.
    pub reused: usize,
    /// Layouts removed for sentences no longer present.
    pub dropped: usize,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    words_hash: u64,
    layout: Arc<CaptionLayout>,
}

/// Caption layouts keyed by sentence id.
///
/// Entries are tied to a fingerprint of the caption settings and canvas width; a change to
/// either invalidates everything, a change to one sentence's words invalidates that entry.
#[derive(Clone, Debug, Default)]
pub struct LayoutCache {
    settings_hash: Option<u64>,
    entries: HashMap<String, CacheEntry>,
}

impl LayoutCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cache in line with `sentences` under `settings` at `canvas_width`.
    #[tracing::instrument(skip_all, fields(sentences = sentences.len(), canvas_width = canvas_width))]
    pub fn refresh(
        &mut self,
        sentences: &[Sentence],
        settings: &CaptionSettings,
        canvas_width: u32,
        shaper: &mut dyn TextShaper,
    ) -> ReelsmithResult<RefreshStats> {
        let mut stats = RefreshStats::default();
        let fingerprint = settings_fingerprint(settings, canvas_width);
        if self.settings_hash != Some(fingerprint) {
            stats.dropped += self.entries.len();
            self.entries.clear();
            self.settings_hash = Some(fingerprint);
        }

        let live: HashSet<&str> = sentences.iter().map(|s| s.id.as_str()).collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id.as_str()));
        stats.dropped += before - self.entries.len();

        for s in sentences {
            let words_hash = words_fingerprint(&s.words);
            if self
                .entries
                .get(&s.id)
                .is_some_and(|e| e.words_hash == words_hash)
            {
                stats.reused += 1;
                continue;
            }
            let layout = layout_caption(&s.words, settings, canvas_width, shaper)?;
            self.entries.insert(
                s.id.clone(),
                CacheEntry {
                    words_hash,
                    layout: Arc::new(layout),
                },
            );
            stats.rebuilt += 1;
        }
        tracing::debug!(
            rebuilt = stats.rebuilt,
            reused = stats.reused,
            dropped = stats.dropped,
            "caption layouts refreshed"
        );
        Ok(stats)
    }

    /// Layout for `sentence_id`, if cached.
    pub fn get(&self, sentence_id: &str) -> Option<&CaptionLayout> {
        self.entries.get(sentence_id).map(|e| e.layout.as_ref())
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn settings_fingerprint(settings: &CaptionSettings, canvas_width: u32) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    // CaptionSettings serializes infallibly (strings, numbers, bools, colours).
    if let Ok(bytes) = serde_json::to_vec(settings) {
        h.update(&bytes);
    }
    h.update(&canvas_width.to_le_bytes());
    h.digest()
}

fn words_fingerprint(words: &[Word]) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    for w in words {
        h.update(w.id.as_bytes());
        h.update(&[0]);
        h.update(w.display().as_bytes());
        h.update(&[0, u8::from(w.breaks_line())]);
    }
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/layout/captions.rs"]
mod tests;
