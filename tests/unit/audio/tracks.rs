use base64::{Engine as _, engine::general_purpose};

use super::*;
use crate::script::model::Sentence;

fn wav_base64() -> String {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..800 {
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }
    general_purpose::STANDARD.encode(cursor.into_inner())
}

fn effects() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([
        ("boom".to_owned(), PathBuf::from("/sfx/boom.wav")),
        ("ding".to_owned(), PathBuf::from("/sfx/ding")),
    ])
}

fn script() -> Timeline {
    let mut s1 = Sentence::from_text("s1", "one two three four");
    s1.audio_content = Some(wav_base64());
    s1.words[0].sound_effect = Some("none".into());
    s1.words[1].sound_effect = Some("boom".into());
    s1.words[1].sound_volume = Some(0.7);
    s1.words[2].sound_effect = Some("missing".into());
    s1.words[3].sound_effect = Some("ding".into());
    s1.words[3].sound_delay = Some(0.25);

    let mut s2 = Sentence::from_text("s2", "quiet words");
    s2.words[0].sound_effect = Some("boom".into());

    Timeline::from_durations(&[s1, s2], &[2.0, 1.0]).unwrap()
}

#[test]
fn tracks_follow_the_timeline() {
    let music = BackgroundMusic {
        path: PathBuf::from("/music/piano.mp3"),
        volume: BG_MUSIC_VOLUME,
    };
    let plan = assemble_tracks(&script(), &effects(), Some(&music));
    let tracks = plan.tracks();
    let summary: Vec<(&str, f64)> = tracks
        .iter()
        .map(|t| (t.filename.as_str(), t.start_time))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("tts_0.000.wav", 0.0),
            ("sfx_0.500.wav", 0.5),
            ("sfx_1.500.mp3", 1.5),
            ("sfx_2.500.wav", 2.5),
            ("bg_music.mp3", 0.0),
        ]
    );

    assert_eq!(plan.count(TrackRole::Narration), 1);
    assert_eq!(plan.count(TrackRole::Effect), 3);
    assert_eq!(plan.count(TrackRole::Music), 1);

    assert_eq!(tracks[1].volume, Some(0.7));
    assert_eq!(tracks[2].delay, Some(0.25));
    assert_eq!(tracks[4].looped, Some(true));
    assert_eq!(tracks[4].volume, Some(0.1));
    assert!(matches!(&plan.entries[0].source, TrackSource::Bytes(b) if b.starts_with(b"RIFF")));
    assert_eq!(
        plan.entries[1].source,
        TrackSource::File(PathBuf::from("/sfx/boom.wav"))
    );
}

#[test]
fn music_is_optional() {
    let plan = assemble_tracks(&script(), &effects(), None);
    assert_eq!(plan.count(TrackRole::Music), 0);
}

#[test]
fn bad_narration_payload_is_skipped() {
    let mut s = Sentence::from_text("s1", "hi");
    s.audio_content = Some("!!! not base64 !!!".into());
    let tl = Timeline::from_durations(&[s], &[1.0]).unwrap();
    let plan = assemble_tracks(&tl, &BTreeMap::new(), None);
    assert!(plan.entries.is_empty());
}

#[test]
fn manifest_serializes_for_the_muxer() {
    let track = AudioTrack {
        filename: "bg_music.mp3".into(),
        start_time: 0.0,
        volume: Some(0.1),
        looped: Some(true),
        delay: None,
    };
    let json = serde_json::to_value(&track).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"filename": "bg_music.mp3", "startTime": 0.0, "volume": 0.1, "loop": true})
    );

    let narration = AudioTrack {
        filename: "tts_1.500.mp3".into(),
        start_time: 1.5,
        volume: None,
        looped: None,
        delay: None,
    };
    assert_eq!(
        serde_json::to_value(&narration).unwrap(),
        serde_json::json!({"filename": "tts_1.500.mp3", "startTime": 1.5})
    );
}

#[test]
fn names_are_made_unique() {
    let mut names = UniqueNames::default();
    assert_eq!(names.claim("sfx_1.000".into(), "mp3"), "sfx_1.000.mp3");
    assert_eq!(names.claim("sfx_1.000".into(), "mp3"), "sfx_1.000_1.mp3");
    assert_eq!(names.claim("sfx_1.000".into(), "wav"), "sfx_1.000.wav");
}

#[test]
fn extension_sniffing() {
    assert_eq!(sniff_audio_extension(b"RIFF\0\0\0\0WAVEfmt "), "wav");
    assert_eq!(sniff_audio_extension(b"OggS\0"), "ogg");
    assert_eq!(sniff_audio_extension(b"fLaC"), "flac");
    assert_eq!(sniff_audio_extension(b"ID3\x04"), "mp3");
    assert_eq!(sniff_audio_extension(b""), "mp3");
}
