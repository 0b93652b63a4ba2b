use super::*;
use crate::assets::decode::PreparedImage;
use crate::layout::text::FixedAdvanceShaper;
use crate::script::model::Sentence;

const OVERLAY_PX: (u32, u32) = (54, 67);
const OVERLAY_EDGE_PX: (u32, u32) = (24, 67);
const PILL_PX: (u32, u32) = (54, 147);
const BANNER_PX: (u32, u32) = (50, 4);
const WATERMARK_PX: (u32, u32) = (98, 182);

fn canvas() -> Canvas {
    Canvas::new(108, 192).unwrap()
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> ImagePaint {
    let data = rgba.repeat((w * h) as usize);
    ImagePaint::from_prepared(&PreparedImage::from_straight_rgba8(w, h, data).unwrap()).unwrap()
}

fn captions() -> CaptionSettings {
    CaptionSettings {
        font_size: 10.0,
        has_shadow: false,
        has_background: true,
        background_color: Color::rgba8(0, 0, 255, 255),
        padding_top: 0.0,
        ..CaptionSettings::default()
    }
}

fn sentence(id: &str, text: &str, overlay_on_first: bool) -> Sentence {
    let mut s = Sentence::from_text(id, text);
    if overlay_on_first {
        s.words[0].media_url = Some("green.png".into());
    }
    s
}

fn compositor(sentences: &[Sentence], durations: &[f64], with_asset: bool) -> FrameCompositor {
    let timeline = Timeline::from_durations(sentences, durations).unwrap();
    let settings = captions();
    let mut layouts = LayoutCache::new();
    layouts
        .refresh(sentences, &settings, canvas().width, &mut FixedAdvanceShaper::default())
        .unwrap();
    let mut assets = AssetCache::new(30);
    if with_asset {
        assets.insert("green.png", OverlayAsset::Still(solid(2, 2, [0, 255, 0, 255])));
    }
    FrameCompositor::new(canvas(), timeline, layouts, assets, settings)
        .with_banner(Banner {
            fill: Color::rgba8(255, 0, 0, 255),
            text_color: Color::WHITE,
            text: None,
        })
        .with_watermark(solid(10, 10, [255, 255, 255, 255]))
}

fn px(f: &FrameRGBA, at: (u32, u32)) -> [u8; 4] {
    f.pixel(at.0, at.1).unwrap()
}

#[test]
fn draws_every_layer_in_place() {
    let c = compositor(&[sentence("s1", "hi yo", true)], &[2.0], true);
    let f = c.compose_frame(0.5).unwrap();
    assert_eq!((f.width, f.height), (108, 192));
    assert_eq!(px(&f, BANNER_PX), [255, 0, 0, 255]);
    assert_eq!(px(&f, OVERLAY_PX), [0, 255, 0, 255]);
    assert_eq!(px(&f, PILL_PX), [0, 0, 255, 255]);

    let wm = px(&f, WATERMARK_PX);
    assert!((126..=129).contains(&wm[3]), "watermark alpha {wm:?}");
    assert_eq!(wm[0], wm[3]);

    // Nothing drawn outside the layers.
    assert_eq!(f.pixel(2, 120), Some([0, 0, 0, 0]));
}

#[test]
fn still_overlay_pops_in() {
    let c = compositor(&[sentence("s1", "hi yo", true)], &[2.0], true);
    let start = c.compose_frame(0.0).unwrap();
    assert_eq!(px(&start, OVERLAY_PX), [0, 255, 0, 255]);
    assert_eq!(px(&start, OVERLAY_EDGE_PX), [0, 0, 0, 0]);

    let settled = c.compose_frame(0.5).unwrap();
    assert_eq!(px(&settled, OVERLAY_EDGE_PX), [0, 255, 0, 255]);
}

#[test]
fn missing_asset_renders_without_overlay() {
    let c = compositor(&[sentence("s1", "hi yo", true)], &[2.0], false);
    let f = c.compose_frame(0.5).unwrap();
    assert_eq!(px(&f, OVERLAY_PX), [0, 0, 0, 0]);
    assert_eq!(px(&f, PILL_PX), [0, 0, 255, 255]);
}

#[test]
fn gap_frames_follow_policy() {
    let sentences = [sentence("s1", "hi yo", false), sentence("s2", "ok", false)];

    let clear = compositor(&sentences, &[1.0, 1.0], false);
    assert!(clear.state_at(1.2).is_none());
    let f = clear.compose_frame(1.2).unwrap();
    assert_eq!(px(&f, BANNER_PX), [255, 0, 0, 255]);
    assert_eq!(px(&f, PILL_PX), [0, 0, 0, 0]);

    let hold = compositor(&sentences, &[1.0, 1.0], false).with_gap_policy(GapPolicy::Hold);
    assert_eq!(hold.state_at(1.2).map(|s| s.item_index), Some(0));
    let f = hold.compose_frame(1.2).unwrap();
    assert_eq!(px(&f, PILL_PX), [0, 0, 255, 255]);
}

#[test]
fn past_the_end_is_banner_only() {
    let c = compositor(&[sentence("s1", "hi yo", true)], &[2.0], true);
    let f = c.compose_frame(5.0).unwrap();
    assert_eq!(px(&f, BANNER_PX), [255, 0, 0, 255]);
    assert_eq!(px(&f, OVERLAY_PX), [0, 0, 0, 0]);
    assert_eq!(px(&f, PILL_PX), [0, 0, 0, 0]);
}

#[test]
fn clear_colour_fills_background() {
    let c = compositor(&[sentence("s1", "hi", false)], &[1.0], false).with_settings(
        RenderSettings {
            clear_rgba: Some([0, 0, 0, 255]),
        },
    );
    let f = c.compose_frame(0.1).unwrap();
    assert_eq!(f.pixel(2, 120), Some([0, 0, 0, 255]));
}

#[test]
fn frames_are_deterministic() {
    let c = compositor(&[sentence("s1", "hi yo", true)], &[2.0], true);
    let fps = Fps::integer(30).unwrap();
    for i in [0u64, 2, 15, 59] {
        let a = c.compose_index(FrameIndex(i), fps).unwrap();
        let b = c.compose_index(FrameIndex(i), fps).unwrap();
        assert_eq!(a, b, "frame {i}");
    }
}

#[test]
fn banner_text_is_shaped_at_banner_size() {
    let mut shaper = FixedAdvanceShaper::default();
    let b = Banner::shaped(
        Canvas::new(1080, 1920).unwrap(),
        DEFAULT_BANNER_TEXT,
        "Arial",
        Color::rgba8(255, 0, 0, 255),
        Color::WHITE,
        &mut shaper,
    )
    .unwrap();
    let text = b.text.unwrap();
    assert_eq!(text.size_px, 58.0);
    assert_eq!(text.advance, 18.0 * 0.5 * 58.0);

    let empty = Banner::shaped(canvas(), "  ", "Arial", Color::BLACK, Color::WHITE, &mut shaper)
        .unwrap();
    assert!(empty.text.is_none());
}
