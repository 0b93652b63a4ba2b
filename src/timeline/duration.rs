use std::io::Cursor;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::script::model::Sentence;

/// Duration used when audio metadata cannot be read in time.
pub const FALLBACK_DURATION_SECS: f64 = 1.0;
/// Seconds per word in the no-audio estimate.
pub const SECS_PER_WORD: f64 = 0.4;
/// Lower bound of the no-audio estimate.
pub const MIN_ESTIMATE_SECS: f64 = 1.0;

/// Reads the intrinsic duration of an encoded audio clip.
pub trait AudioProbe: Send + Sync {
    /// Duration in seconds of the clip in `bytes`.
    fn duration_secs(&self, bytes: &[u8]) -> ReelsmithResult<f64>;
}

/// [`AudioProbe`] backed by symphonia's format readers (mp3, wav, ogg, flac, aac, ...).
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaProbe;

impl AudioProbe for SymphoniaProbe {
    fn duration_secs(&self, bytes: &[u8]) -> ReelsmithResult<f64> {
        let src = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(src), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ReelsmithError::asset(format!("failed to probe audio: {e}")))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| ReelsmithError::asset("audio has no default track"))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate)
            && rate > 0
        {
            return Ok(frames as f64 / f64::from(rate));
        }

        // No frame count in the header (common for VBR mp3): walk the packets.
        let time_base = params
            .time_base
            .ok_or_else(|| ReelsmithError::asset("audio track has no time base"))?;
        let mut end_ts = 0u64;
        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == track_id {
                        end_ts = end_ts.max(packet.ts() + packet.dur());
                    }
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(ReelsmithError::asset(format!(
                        "failed to read audio packets: {e}"
                    )));
                }
            }
        }
        let t = time_base.calc_time(end_ts);
        Ok(t.seconds as f64 + t.frac)
    }
}

/// Decode a base64 audio payload, accepting an optional `data:...;base64,` prefix.
pub fn decode_audio_payload(payload: &str) -> ReelsmithResult<Vec<u8>> {
    let raw = payload.trim();
    let raw = match raw.find("base64,") {
        Some(pos) if raw.starts_with("data:") => &raw[pos + "base64,".len()..],
        _ => raw,
    };
    general_purpose::STANDARD
        .decode(raw)
        .map_err(|e| ReelsmithError::asset(format!("invalid base64 audio payload: {e}")))
}

/// What to do when an attached clip's duration cannot be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationFallback {
    /// Use [`FALLBACK_DURATION_SECS`].
    #[default]
    Fixed,
    /// Use the word-count estimate.
    WordCount,
}

/// Where a resolved duration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// Read from the attached audio.
    Audio,
    /// Word-count estimate (no audio attached).
    Estimate,
    /// Audio was attached but could not be probed in time.
    Fallback,
}

/// A sentence duration with its provenance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedDuration {
    /// Seconds, always > 0.
    pub secs: f64,
    /// Provenance.
    pub source: DurationSource,
}

/// Word-count estimate: `max(1.0, words × 0.4)`.
pub fn estimate_duration_secs(word_count: usize) -> f64 {
    (word_count as f64 * SECS_PER_WORD).max(MIN_ESTIMATE_SECS)
}

/// Resolves one duration per sentence with a bounded wait on audio probing.
#[derive(Clone)]
pub struct DurationResolver {
    probe: Arc<dyn AudioProbe>,
    timeout: Duration,
    fallback: DurationFallback,
}

impl std::fmt::Debug for DurationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationResolver")
            .field("timeout", &self.timeout)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl Default for DurationResolver {
    fn default() -> Self {
        Self::new(
            Arc::new(SymphoniaProbe),
            Duration::from_millis(2000),
            DurationFallback::Fixed,
        )
    }
}

impl DurationResolver {
    /// Create a resolver around `probe`.
    pub fn new(probe: Arc<dyn AudioProbe>, timeout: Duration, fallback: DurationFallback) -> Self {
        Self {
            probe,
            timeout,
            fallback,
        }
    }

    /// Resolve `sentence`'s duration. Never fails and never blocks past the timeout.
    pub fn resolve(&self, sentence: &Sentence) -> ResolvedDuration {
        let Some(payload) = sentence.audio_content.as_deref().filter(|_| sentence.has_audio())
        else {
            return ResolvedDuration {
                secs: estimate_duration_secs(sentence.word_count()),
                source: DurationSource::Estimate,
            };
        };

        match self.probe_with_timeout(payload) {
            Ok(secs) => ResolvedDuration {
                secs,
                source: DurationSource::Audio,
            },
            Err(e) => {
                let secs = match self.fallback {
                    DurationFallback::Fixed => FALLBACK_DURATION_SECS,
                    DurationFallback::WordCount => estimate_duration_secs(sentence.word_count()),
                };
                tracing::warn!(
                    sentence = %sentence.id,
                    error = %e,
                    fallback_secs = secs,
                    "audio duration unavailable, using fallback"
                );
                ResolvedDuration {
                    secs,
                    source: DurationSource::Fallback,
                }
            }
        }
    }

    fn probe_with_timeout(&self, payload: &str) -> ReelsmithResult<f64> {
        let bytes = decode_audio_payload(payload)?;
        let probe = Arc::clone(&self.probe);
        let (tx, rx) = mpsc::channel();
        // The probe thread owns the decoded bytes and drops them when it finishes, even if we
        // have stopped waiting.
        std::thread::Builder::new()
            .name("reelsmith-duration-probe".to_owned())
            .spawn(move || {
                let _ = tx.send(probe.duration_secs(&bytes));
            })
            .map_err(|e| ReelsmithError::asset(format!("failed to spawn probe thread: {e}")))?;

        let secs = rx.recv_timeout(self.timeout).map_err(|_| {
            ReelsmithError::asset(format!(
                "audio metadata not ready within {} ms",
                self.timeout.as_millis()
            ))
        })??;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ReelsmithError::asset(format!(
                "audio reported a non-positive duration ({secs})"
            )));
        }
        Ok(secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/duration.rs"]
mod tests;
