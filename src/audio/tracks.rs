use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::timeline::builder::Timeline;
use crate::timeline::duration::decode_audio_payload;
use crate::timeline::words::word_slice_start;

/// Default background music gain relative to narration.
pub const BG_MUSIC_VOLUME: f64 = 0.1;

/// One entry of the muxer's audio manifest.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// File name inside the package.
    pub filename: String,
    /// Offset from the start of the video in seconds.
    pub start_time: f64,
    /// Gain in `0..=1`; absent means unity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Loop the clip until the video ends.
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looped: Option<bool>,
    /// Extra delay requested for a sound effect, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

/// Role of a track in the mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackRole {
    /// A sentence's text-to-speech clip.
    Narration,
    /// A word's sound effect.
    Effect,
    /// Looping background music.
    Music,
}

/// Where a track's bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackSource {
    /// Decoded inline payload.
    Bytes(Vec<u8>),
    /// File on disk.
    File(PathBuf),
}

/// A manifest entry together with its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedTrack {
    /// Manifest entry.
    pub track: AudioTrack,
    /// Role in the mix.
    pub role: TrackRole,
    /// Payload to package under `track.filename`.
    pub source: TrackSource,
}

/// Background music settings.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundMusic {
    /// Audio file.
    pub path: PathBuf,
    /// Gain in `0..=1`.
    pub volume: f64,
}

/// Every audio track of an export, in timeline order with the music last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioPlan {
    /// Planned tracks.
    pub entries: Vec<PlannedTrack>,
}

impl AudioPlan {
    /// Manifest entries only.
    pub fn tracks(&self) -> Vec<AudioTrack> {
        self.entries.iter().map(|e| e.track.clone()).collect()
    }

    /// Number of tracks with `role`.
    pub fn count(&self, role: TrackRole) -> usize {
        self.entries.iter().filter(|e| e.role == role).count()
    }
}

/// Walk the timeline and list narration, effect and music tracks.
///
/// Narration: one `tts_<start>` track per sentence with audio. Effects: one `sfx_<start>` track
/// per word whose effect id is in `effects`, starting at the word's slice. Music: a single
/// looping `bg_music` track at 0 when `music` is given. Undecodable narration and unknown effect
/// ids are logged and skipped; this never fails.
pub fn assemble_tracks(
    timeline: &Timeline,
    effects: &BTreeMap<String, PathBuf>,
    music: Option<&BackgroundMusic>,
) -> AudioPlan {
    let mut names = UniqueNames::default();
    let mut entries = Vec::new();

    for item in timeline.items() {
        let sentence = &item.sentence;
        if let Some(payload) = sentence.audio_content.as_deref().filter(|p| !p.trim().is_empty()) {
            match decode_audio_payload(payload) {
                Ok(bytes) => {
                    let ext = sniff_audio_extension(&bytes);
                    entries.push(PlannedTrack {
                        track: AudioTrack {
                            filename: names.claim(format!("tts_{:.3}", item.start_time), ext),
                            start_time: item.start_time,
                            volume: None,
                            looped: None,
                            delay: None,
                        },
                        role: TrackRole::Narration,
                        source: TrackSource::Bytes(bytes),
                    });
                }
                Err(e) => {
                    tracing::warn!(sentence = %sentence.id, error = %e, "narration payload unusable, skipping");
                }
            }
        }

        for (j, word) in sentence.words.iter().enumerate() {
            let Some(effect) = word.effect_id() else {
                continue;
            };
            let Some(path) = effects.get(effect) else {
                tracing::warn!(effect, word = %word.id, "unknown sound effect, skipping");
                continue;
            };
            let Some(start) = word_slice_start(item, j) else {
                continue;
            };
            entries.push(PlannedTrack {
                track: AudioTrack {
                    filename: names.claim(format!("sfx_{start:.3}"), path_extension(path)),
                    start_time: start,
                    volume: word.sound_volume,
                    looped: None,
                    delay: word.sound_delay.filter(|d| *d != 0.0),
                },
                role: TrackRole::Effect,
                source: TrackSource::File(path.clone()),
            });
        }
    }

    if let Some(music) = music {
        entries.push(PlannedTrack {
            track: AudioTrack {
                filename: names.claim("bg_music".to_owned(), path_extension(&music.path)),
                start_time: 0.0,
                volume: Some(music.volume),
                looped: Some(true),
                delay: None,
            },
            role: TrackRole::Music,
            source: TrackSource::File(music.path.clone()),
        });
    }

    AudioPlan { entries }
}

/// Container extension guessed from magic bytes (`mp3` when unknown).
pub fn sniff_audio_extension(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        "wav"
    } else if bytes.starts_with(b"OggS") {
        "ogg"
    } else if bytes.starts_with(b"fLaC") {
        "flac"
    } else {
        "mp3"
    }
}

fn path_extension(path: &Path) -> &str {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("mp3")
}

#[derive(Default)]
struct UniqueNames(HashSet<String>);

impl UniqueNames {
    fn claim(&mut self, stem: String, ext: &str) -> String {
        let mut name = format!("{stem}.{ext}");
        let mut n = 1;
        while !self.0.insert(name.clone()) {
            name = format!("{stem}_{n}.{ext}");
            n += 1;
        }
        name
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/tracks.rs"]
mod tests;
