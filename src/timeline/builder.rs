use rayon::prelude::*;

use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::script::model::Sentence;
use crate::timeline::duration::{DurationResolver, DurationSource, ResolvedDuration};

/// Silence inserted after every sentence.
pub const SENTENCE_GAP_SECS: f64 = 0.5;

/// One sentence placed on the export timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineItem {
    /// The sentence (snapshot).
    pub sentence: Sentence,
    /// Start in seconds.
    pub start_time: f64,
    /// Duration in seconds (> 0).
    pub duration: f64,
    /// Where the duration came from.
    pub duration_source: DurationSource,
}

impl TimelineItem {
    /// Exclusive end in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// `true` when `start <= t < end`.
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }
}

/// Ordered, gap-separated sentence intervals plus the total export duration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    items: Vec<TimelineItem>,
    total_duration: f64,
}

impl Timeline {
    /// Resolve each sentence's duration and lay the sentences out back to back.
    ///
    /// Probing runs in parallel; placement is a sequential fold in script order.
    #[tracing::instrument(skip_all, fields(sentences = sentences.len()))]
    pub fn build(sentences: &[Sentence], resolver: &DurationResolver) -> Self {
        let durations: Vec<ResolvedDuration> =
            sentences.par_iter().map(|s| resolver.resolve(s)).collect();
        let timeline = Self::fold(sentences, &durations);
        tracing::debug!(
            items = timeline.items.len(),
            total_secs = timeline.total_duration,
            "timeline built"
        );
        timeline
    }

    /// Lay out sentences with known durations.
    pub fn from_durations(sentences: &[Sentence], durations: &[f64]) -> ReelsmithResult<Self> {
        if sentences.len() != durations.len() {
            return Err(ReelsmithError::validation(format!(
                "{} sentences but {} durations",
                sentences.len(),
                durations.len()
            )));
        }
        let resolved = durations
            .iter()
            .map(|&secs| {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(ReelsmithError::validation(format!(
                        "sentence duration must be finite and > 0, got {secs}"
                    )));
                }
                Ok(ResolvedDuration {
                    secs,
                    source: DurationSource::Audio,
                })
            })
            .collect::<ReelsmithResult<Vec<_>>>()?;
        Ok(Self::fold(sentences, &resolved))
    }

    fn fold(sentences: &[Sentence], durations: &[ResolvedDuration]) -> Self {
        let mut offset = 0.0;
        let mut items = Vec::with_capacity(sentences.len());
        for (sentence, d) in sentences.iter().zip(durations) {
            items.push(TimelineItem {
                sentence: sentence.clone(),
                start_time: offset,
                duration: d.secs,
                duration_source: d.source,
            });
            offset += d.secs + SENTENCE_GAP_SECS;
        }
        Self {
            items,
            total_duration: offset,
        }
    }

    /// Items in script order.
    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    /// Total export duration in seconds, trailing gap included.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// `true` when the script was empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the item whose interval contains `t`, if any.
    pub fn item_at(&self, t: f64) -> Option<usize> {
        let i = self.last_started_at(t)?;
        self.items[i].contains(t).then_some(i)
    }

    /// Index of the last item with `start_time <= t`.
    pub fn last_started_at(&self, t: f64) -> Option<usize> {
        let n = self.items.partition_point(|it| it.start_time <= t);
        n.checked_sub(1)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
