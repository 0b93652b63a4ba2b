use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::assets::decode::{PreparedImage, decode_image};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};

/// Decodes overlay media into compositor-ready rasters.
pub trait MediaDecoder: Send + Sync {
    /// Decode a still image.
    fn decode_image(&self, bytes: &[u8]) -> ReelsmithResult<PreparedImage>;

    /// Sample a video clip at `sample_fps` from its start, in presentation order, stopping after
    /// `max_frames` frames.
    fn extract_video_frames(
        &self,
        bytes: &[u8],
        sample_fps: u32,
        max_frames: usize,
    ) -> ReelsmithResult<Vec<PreparedImage>>;
}

/// Stream layout reported by `ffprobe`.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Probed file.
    pub source_path: PathBuf,
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
    /// Container duration in seconds (0 when unknown).
    pub duration_sec: f64,
    /// `true` when an audio stream is present.
    pub has_audio: bool,
}

/// Images through the `image` crate; video through the system `ffprobe`/`ffmpeg` when the
/// `media-ffmpeg` feature is enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeMediaDecoder;

impl MediaDecoder for NativeMediaDecoder {
    fn decode_image(&self, bytes: &[u8]) -> ReelsmithResult<PreparedImage> {
        decode_image(bytes)
    }

    fn extract_video_frames(
        &self,
        bytes: &[u8],
        sample_fps: u32,
        max_frames: usize,
    ) -> ReelsmithResult<Vec<PreparedImage>> {
        if sample_fps == 0 {
            return Err(ReelsmithError::validation("video sample fps must be > 0"));
        }
        if max_frames == 0 {
            return Ok(Vec::new());
        }
        // ffmpeg needs a seekable input for most containers; the temp file is removed on drop.
        let mut tmp = tempfile::Builder::new()
            .prefix("reelsmith_overlay_")
            .tempfile()
            .map_err(|e| ReelsmithError::asset(format!("create temp file: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.flush())
            .map_err(|e| ReelsmithError::asset(format!("write temp file: {e}")))?;

        let info = probe_video(tmp.path())?;
        tracing::debug!(
            width = info.width,
            height = info.height,
            duration_sec = info.duration_sec,
            has_audio = info.has_audio,
            sample_fps,
            max_frames,
            "sampling video overlay"
        );
        let raw = decode_video_frames_rgba8(&info, sample_fps, max_frames)?;
        raw.into_iter()
            .map(|frame| PreparedImage::from_straight_rgba8(info.width, info.height, frame))
            .collect()
    }
}

#[cfg(feature = "media-ffmpeg")]
/// Probe a media file with `ffprobe`.
pub fn probe_video(source_path: &Path) -> ReelsmithResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelsmithError::asset(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelsmithError::asset(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelsmithError::asset(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelsmithError::asset("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelsmithError::asset("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelsmithError::asset("missing video height from ffprobe"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_sec,
        has_audio,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe a media file with `ffprobe` (unavailable without the `media-ffmpeg` feature).
pub fn probe_video(_source_path: &Path) -> ReelsmithResult<VideoSourceInfo> {
    Err(ReelsmithError::asset(
        "video overlays require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
fn decode_video_frames_rgba8(
    source: &VideoSourceInfo,
    sample_fps: u32,
    max_frames: usize,
) -> ReelsmithResult<Vec<Vec<u8>>> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(&source.source_path)
        .args([
            "-an",
            "-vf",
            &format!("fps={sample_fps}"),
            "-frames:v",
            &max_frames.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelsmithError::asset(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelsmithError::asset(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(ReelsmithError::asset(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.len() < expected_len || !out.stdout.len().is_multiple_of(expected_len) {
        return Err(ReelsmithError::asset(format!(
            "decoded video has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    Ok(out
        .stdout
        .chunks_exact(expected_len)
        .take(max_frames)
        .map(<[u8]>::to_vec)
        .collect())
}

#[cfg(not(feature = "media-ffmpeg"))]
fn decode_video_frames_rgba8(
    _source: &VideoSourceInfo,
    _sample_fps: u32,
    _max_frames: usize,
) -> ReelsmithResult<Vec<Vec<u8>>> {
    Err(ReelsmithError::asset(
        "video overlays require the 'media-ffmpeg' feature",
    ))
}

/// `true` when `ffmpeg` can be spawned.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
