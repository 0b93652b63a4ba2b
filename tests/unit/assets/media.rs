use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn native_decoder_decodes_images() {
    let img = NativeMediaDecoder.decode_image(&png_bytes(3, 2)).unwrap();
    assert_eq!((img.width, img.height), (3, 2));
    assert_eq!(&img.rgba8_premul[0..4], &[10, 20, 30, 255]);
}

#[test]
fn zero_sample_fps_is_rejected() {
    let err = NativeMediaDecoder
        .extract_video_frames(b"whatever", 0, 10)
        .unwrap_err();
    assert!(matches!(err, ReelsmithError::Validation(_)));
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn video_requires_feature() {
    let err = NativeMediaDecoder
        .extract_video_frames(b"not a video", 30, 91)
        .unwrap_err();
    assert!(err.to_string().contains("media-ffmpeg"));
}

#[cfg(feature = "media-ffmpeg")]
#[test]
fn extracts_frames_at_sample_rate() {
    if !is_ffmpeg_on_path() {
        eprintln!("ffmpeg not on PATH; skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args([
            "-v", "error", "-f", "lavfi", "-i", "testsrc=size=32x24:rate=10", "-t", "1",
            "-pix_fmt", "yuv420p",
        ])
        .arg(&clip)
        .status()
        .unwrap();
    assert!(status.success());

    let bytes = std::fs::read(&clip).unwrap();
    let frames = NativeMediaDecoder.extract_video_frames(&bytes, 10, 100).unwrap();
    assert!((9..=11).contains(&frames.len()), "got {}", frames.len());
    assert!(frames.iter().all(|f| f.width == 32 && f.height == 24));

    let capped = NativeMediaDecoder.extract_video_frames(&bytes, 10, 4).unwrap();
    assert_eq!(capped.len(), 4);
}
