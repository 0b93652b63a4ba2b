//! Word-level timing inside one timeline item.
//!
//! Every word gets an equal slice of its sentence's interval. The caption highlight follows the
//! slice containing `t`; overlays look back from that slice and stay up for
//! [`OVERLAY_WINDOW_SECS`] after their word starts, even once later words are reached.

use crate::timeline::builder::{Timeline, TimelineItem};

/// How long an overlay stays visible after its word starts.
pub const OVERLAY_WINDOW_SECS: f64 = 3.0;

/// Width of one word slice, `None` for a sentence without words.
pub fn word_duration(item: &TimelineItem) -> Option<f64> {
    let n = item.sentence.words.len();
    (n > 0).then(|| item.duration / n as f64)
}

/// Absolute start time of word `k`'s slice.
pub fn word_slice_start(item: &TimelineItem, k: usize) -> Option<f64> {
    word_duration(item).map(|wd| item.start_time + k as f64 * wd)
}

/// Index of the word whose slice contains `t`, clamped to the word range.
pub fn active_word_index(item: &TimelineItem, t: f64) -> Option<usize> {
    let wd = word_duration(item)?;
    let n = item.sentence.words.len();
    let rel = ((t - item.start_time) / wd).floor();
    if !rel.is_finite() || rel < 0.0 {
        return Some(0);
    }
    Some((rel as usize).min(n - 1))
}

/// An overlay that is visible at the queried instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveOverlay {
    /// Index of the triggering word.
    pub word_index: usize,
    /// Absolute start of the triggering word's slice.
    pub started_at: f64,
    /// Seconds since `started_at`.
    pub elapsed: f64,
}

/// Most recent overlay-carrying word at or before the active word that started at most
/// [`OVERLAY_WINDOW_SECS`] before `t`. The window end is inclusive.
pub fn active_overlay(item: &TimelineItem, t: f64) -> Option<ActiveOverlay> {
    let wd = word_duration(item)?;
    let active = active_word_index(item, t)?;
    let rel = t - item.start_time;
    for k in (0..=active).rev() {
        let start_rel = k as f64 * wd;
        let elapsed = rel - start_rel;
        if elapsed > OVERLAY_WINDOW_SECS {
            break;
        }
        if item.sentence.words[k].overlay_url().is_some() {
            return Some(ActiveOverlay {
                word_index: k,
                started_at: item.start_time + start_rel,
                elapsed: elapsed.max(0.0),
            });
        }
    }
    None
}

/// Rendering policy for instants that fall between sentences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Banner-only frames in gaps.
    #[default]
    Clear,
    /// Keep showing the previous sentence's final state.
    Hold,
}

/// Everything the compositor needs to know about one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    /// Index into [`Timeline::items`].
    pub item_index: usize,
    /// Seconds since the item started (clamped to its duration when held).
    pub time_in_sentence: f64,
    /// Highlighted word, `None` for a sentence without words.
    pub active_word: Option<usize>,
    /// Visible overlay.
    pub overlay: Option<ActiveOverlay>,
}

/// Resolve the caption/overlay state at `t`.
///
/// Returns `None` when nothing but the banner should be drawn.
pub fn frame_state(timeline: &Timeline, t: f64, policy: GapPolicy) -> Option<FrameState> {
    if let Some(i) = timeline.item_at(t) {
        return Some(state_for(timeline, i, t));
    }
    match policy {
        GapPolicy::Clear => None,
        GapPolicy::Hold => {
            if t >= timeline.total_duration() {
                return None;
            }
            let i = timeline.last_started_at(t)?;
            let item = &timeline.items()[i];
            Some(state_for(timeline, i, item.end_time()))
        }
    }
}

fn state_for(timeline: &Timeline, i: usize, t: f64) -> FrameState {
    let item = &timeline.items()[i];
    FrameState {
        item_index: i,
        time_in_sentence: (t - item.start_time).clamp(0.0, item.duration),
        active_word: active_word_index(item, t),
        overlay: active_overlay(item, t),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/words.rs"]
mod tests;
