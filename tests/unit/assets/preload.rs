use std::sync::Mutex;

use super::*;
use crate::assets::decode::PreparedImage;
use crate::script::model::Word;

struct MapFetcher {
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl AssetFetcher for MapFetcher {
    fn fetch(&self, url: &str) -> ReelsmithResult<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_owned());
        if url.contains("missing") {
            return Err(ReelsmithError::asset(format!("404 for {url}")));
        }
        Ok(url.as_bytes().to_vec())
    }
}

struct SolidDecoder;

impl MediaDecoder for SolidDecoder {
    fn decode_image(&self, bytes: &[u8]) -> ReelsmithResult<PreparedImage> {
        if bytes.starts_with(b"broken") {
            return Err(ReelsmithError::asset("corrupt image"));
        }
        PreparedImage::from_straight_rgba8(2, 2, vec![255; 16])
    }

    fn extract_video_frames(
        &self,
        _bytes: &[u8],
        sample_fps: u32,
        _max_frames: usize,
    ) -> ReelsmithResult<Vec<PreparedImage>> {
        (0..sample_fps)
            .map(|i| PreparedImage::from_straight_rgba8(1, 1, vec![i as u8, 0, 0, 255]))
            .collect()
    }
}

fn word_with(id: &str, url: &str, kind: Option<MediaType>) -> Word {
    Word {
        media_url: Some(url.to_owned()),
        media_type: kind,
        ..Word::plain(id, id)
    }
}

fn sentence(id: &str, words: Vec<Word>) -> Sentence {
    Sentence {
        words,
        ..Sentence::from_text(id, "x")
    }
}

#[test]
fn media_type_from_extension() {
    assert_eq!(infer_media_type("clip.MP4", None), MediaType::Video);
    assert_eq!(infer_media_type("https://x.io/a.webm?sig=1", None), MediaType::Video);
    assert_eq!(infer_media_type("/memes/cat.mov#t=2", None), MediaType::Video);
    assert_eq!(infer_media_type("meme.jpg", None), MediaType::Image);
    assert_eq!(infer_media_type("https://x.io/mp4/pic", None), MediaType::Image);
    assert_eq!(infer_media_type("a.png", Some(MediaType::Video)), MediaType::Video);
}

#[test]
fn sources_are_unique_in_first_use_order() {
    let sentences = vec![
        sentence(
            "s1",
            vec![
                word_with("a", "b.png", None),
                Word::plain("plain", "plain"),
                word_with("c", "a.gif", None),
            ],
        ),
        sentence(
            "s2",
            vec![
                word_with("d", "b.png", Some(MediaType::Video)),
                word_with("e", "  ", None),
            ],
        ),
    ];
    let sources = collect_overlay_sources(&sentences);
    assert_eq!(
        sources,
        vec![
            OverlaySource {
                url: "b.png".into(),
                kind: MediaType::Video
            },
            OverlaySource {
                url: "a.gif".into(),
                kind: MediaType::Image
            },
        ]
    );
}

#[test]
fn first_explicit_media_type_wins() {
    let sentences = vec![sentence(
        "s1",
        vec![
            word_with("a", "x.mp4", Some(MediaType::Image)),
            word_with("b", "x.mp4", Some(MediaType::Video)),
        ],
    )];
    let sources = collect_overlay_sources(&sentences);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].kind, MediaType::Image);
}

#[test]
fn failures_are_skipped_and_reported() {
    let sources = vec![
        OverlaySource {
            url: "ok.png".into(),
            kind: MediaType::Image,
        },
        OverlaySource {
            url: "missing.png".into(),
            kind: MediaType::Image,
        },
        OverlaySource {
            url: "broken.png".into(),
            kind: MediaType::Image,
        },
        OverlaySource {
            url: "loop.mp4".into(),
            kind: MediaType::Video,
        },
    ];
    let fetcher = MapFetcher::new();
    let progress = Mutex::new(Vec::new());
    let report = preload_assets(&sources, &fetcher, &SolidDecoder, 4, &|done, total| {
        progress.lock().unwrap().push((done, total));
    });

    assert_eq!(report.cache.len(), 2);
    assert!(matches!(report.cache.get("ok.png"), Some(OverlayAsset::Still(_))));
    assert!(matches!(report.cache.get("loop.mp4"), Some(OverlayAsset::Frames(f)) if f.len() == 4));
    assert!(report.cache.get("missing.png").is_none());
    let mut failed: Vec<_> = report.failed.iter().map(|(u, _)| u.as_str()).collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["broken.png", "missing.png"]);

    let mut seen = progress.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert_eq!(fetcher.calls.lock().unwrap().len(), 4);
}

#[test]
fn video_frames_loop_by_elapsed_time() {
    let frames: Vec<ImagePaint> = (0..3)
        .map(|i| {
            let img = PreparedImage::from_straight_rgba8(i + 1, 1, vec![0; 4 * (i as usize + 1)])
                .unwrap();
            ImagePaint::from_prepared(&img).unwrap()
        })
        .collect();
    let asset = OverlayAsset::Frames(frames.into());
    let width_at = |t: f64| asset.frame_at(t, 30).map(|p| p.width);
    assert_eq!(width_at(0.0), Some(1));
    assert_eq!(width_at(1.0 / 30.0 + 1e-9), Some(2));
    assert_eq!(width_at(2.5 / 30.0), Some(3));
    assert_eq!(width_at(3.5 / 30.0), Some(1));
    assert_eq!(width_at(-1.0), Some(1));
}

/// A 60 s clip that ignores the frame cap; frame `i` is `i + 1` pixels wide.
struct LongClipDecoder {
    requested: Mutex<Option<usize>>,
}

impl MediaDecoder for LongClipDecoder {
    fn decode_image(&self, _bytes: &[u8]) -> ReelsmithResult<PreparedImage> {
        Err(ReelsmithError::asset("not an image"))
    }

    fn extract_video_frames(
        &self,
        _bytes: &[u8],
        sample_fps: u32,
        max_frames: usize,
    ) -> ReelsmithResult<Vec<PreparedImage>> {
        *self.requested.lock().unwrap() = Some(max_frames);
        (0..60 * sample_fps)
            .map(|i| PreparedImage::from_straight_rgba8(i + 1, 1, vec![0; 4 * (i as usize + 1)]))
            .collect()
    }
}

#[test]
fn long_clips_keep_only_the_visible_window() {
    assert_eq!(video_frame_cap(10), 31);
    assert_eq!(video_frame_cap(30), 91);

    let decoder = LongClipDecoder {
        requested: Mutex::new(None),
    };
    let sources = [OverlaySource {
        url: "long.mp4".into(),
        kind: MediaType::Video,
    }];
    let report = preload_assets(&sources, &MapFetcher::new(), &decoder, 10, &|_, _| {});
    assert_eq!(*decoder.requested.lock().unwrap(), Some(31));

    let asset = report.cache.get("long.mp4").unwrap();
    let OverlayAsset::Frames(frames) = asset else {
        panic!("expected video frames");
    };
    assert_eq!(frames.len(), 31);
    // The last instant an overlay can be on screen still reads its own frame, not a wrapped one.
    assert_eq!(asset.frame_at(OVERLAY_WINDOW_SECS, 10).map(|p| p.width), Some(31));
    assert_eq!(asset.frame_at(1.25, 10).map(|p| p.width), Some(13));
}

#[test]
fn empty_sources_produce_empty_cache() {
    let report = preload_assets(&[], &MapFetcher::new(), &SolidDecoder, 30, &|_, _| {});
    assert!(report.cache.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.cache.sample_fps(), 30);
}
