use std::io::Read as _;

use super::*;
use crate::audio::tracks::{PlannedTrack, TrackRole};

fn project(background: Option<&str>) -> Project {
    let mut p = Project::from_json_str(
        r#"{"id": "p1", "type": "reels", "sentences": [{"id": "s1", "text": "hello there"}]}"#,
    )
    .unwrap();
    p.background_video = background.map(str::to_owned);
    p
}

fn timing() -> PackageTiming {
    PackageTiming {
        fps: 30,
        duration: 1.5,
        size: (540, 960),
        output_size: (1080, 1920),
        frame_count: 45,
    }
}

fn plan(sfx: &Path) -> AudioPlan {
    AudioPlan {
        entries: vec![
            PlannedTrack {
                track: AudioTrack {
                    filename: "tts_0.000.wav".into(),
                    start_time: 0.0,
                    volume: None,
                    looped: None,
                    delay: None,
                },
                role: TrackRole::Narration,
                source: TrackSource::Bytes(b"RIFFdata".to_vec()),
            },
            PlannedTrack {
                track: AudioTrack {
                    filename: "sfx_0.500.mp3".into(),
                    start_time: 0.5,
                    volume: Some(0.7),
                    looped: None,
                    delay: None,
                },
                role: TrackRole::Effect,
                source: TrackSource::File(sfx.to_path_buf()),
            },
        ],
    }
}

#[test]
fn metadata_mode_follows_background_video() {
    let standard = Metadata::new(&project(None), timing(), Vec::new());
    assert_eq!(standard.mode, PackageMode::Standard);
    assert!(standard.background_video.is_none());

    let blank = Metadata::new(&project(Some("  ")), timing(), Vec::new());
    assert_eq!(blank.mode, PackageMode::Standard);

    let overlay = Metadata::new(&project(Some("https://cdn/bg.mp4")), timing(), Vec::new());
    assert_eq!(overlay.mode, PackageMode::Overlay);

    let json = serde_json::to_value(&overlay).unwrap();
    assert_eq!(json["mode"], "overlay");
    assert_eq!(json["outputWidth"], 1080);
    assert_eq!(json["frameCount"], 45);
    assert_eq!(json["projectId"], "p1");
    assert_eq!(json["backgroundVideo"], "https://cdn/bg.mp4");
    assert!(json["audioTracks"].as_array().unwrap().is_empty());
}

#[test]
fn staged_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let sfx = dir.path().join("boom.mp3");
    std::fs::write(&sfx, b"ID3boom").unwrap();
    let stage = dir.path().join("stage");
    std::fs::create_dir(&stage).unwrap();

    let plan = plan(&sfx);
    write_audio_files(&stage, &plan).unwrap();
    let meta = Metadata::new(&project(Some("bg.mp4")), timing(), plan.tracks());
    write_manifests(&stage, &project(Some("bg.mp4")), &meta, Some(b"mp4bytes")).unwrap();

    assert_eq!(std::fs::read(stage.join("tts_0.000.wav")).unwrap(), b"RIFFdata");
    assert_eq!(std::fs::read(stage.join("sfx_0.500.mp3")).unwrap(), b"ID3boom");
    assert_eq!(std::fs::read(stage.join(BACKGROUND_VIDEO_FILE)).unwrap(), b"mp4bytes");

    let back: Metadata =
        serde_json::from_str(&std::fs::read_to_string(stage.join(METADATA_FILE)).unwrap()).unwrap();
    assert_eq!(back, meta);
    let p = Project::from_path(&stage.join(PROJECT_FILE)).unwrap();
    assert_eq!(p.id, "p1");
}

#[test]
fn missing_effect_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan(&dir.path().join("nope.mp3"));
    assert!(write_audio_files(dir.path(), &plan).is_err());
}

#[test]
fn package_path_appends_zip() {
    assert_eq!(package_path(Path::new("out/job"), true), PathBuf::from("out/job.zip"));
    assert_eq!(package_path(Path::new("out/job.zip"), true), PathBuf::from("out/job.zip"));
    assert_eq!(package_path(Path::new("out/job"), false), PathBuf::from("out/job"));
    assert_eq!(staging_parent(Path::new("job")), PathBuf::from("."));
}

#[test]
fn archive_holds_every_staged_file() {
    let dir = tempfile::tempdir().unwrap();
    let stage = dir.path().join("stage");
    std::fs::create_dir(&stage).unwrap();
    std::fs::write(stage.join("frame00001.png"), b"b").unwrap();
    std::fs::write(stage.join("frame00000.png"), b"a").unwrap();
    std::fs::write(stage.join(METADATA_FILE), b"{}").unwrap();

    let out = dir.path().join("export");
    let path = finalize_package(&stage, &out, true, false).unwrap();
    assert_eq!(path, dir.path().join("export.zip"));

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
    let names: Vec<String> = zip.file_names().map(str::to_owned).collect();
    assert_eq!(names.len(), 3);
    let mut first = String::new();
    zip.by_name("frame00000.png")
        .unwrap()
        .read_to_string(&mut first)
        .unwrap();
    assert_eq!(first, "a");

    let again = finalize_package(&stage, &out, true, false).unwrap_err();
    assert!(matches!(again, ReelsmithError::Validation(_)));
    finalize_package(&stage, &out, true, true).unwrap();
}

#[test]
fn directory_package_is_moved_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let stage = dir.path().join("stage");
    std::fs::create_dir(&stage).unwrap();
    std::fs::write(stage.join("frame00000.png"), b"a").unwrap();

    let out = dir.path().join("export");
    std::fs::create_dir(&out).unwrap();
    std::fs::write(out.join("stale.txt"), b"old").unwrap();

    assert!(finalize_package(&stage, &out, false, false).is_err());
    let path = finalize_package(&stage, &out, false, true).unwrap();
    assert_eq!(path, out);
    assert!(out.join("frame00000.png").is_file());
    assert!(!out.join("stale.txt").exists());
    assert!(!stage.exists());
}
