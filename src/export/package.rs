//! Muxer package: frames, audio files, `project.json` and `metadata.json`.
//!
//! Everything is written into a staging directory first; [`finalize_package`] then either zips it
//! next to the requested output or moves it into place, so a failed export never leaves a partial
//! package behind.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::tracks::{AudioPlan, AudioTrack, TrackSource};
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::script::model::Project;

/// Timing and layout summary read by the muxer.
pub const METADATA_FILE: &str = "metadata.json";
/// Copy of the exported project.
pub const PROJECT_FILE: &str = "project.json";
/// Background video muxed underneath the frames.
pub const BACKGROUND_VIDEO_FILE: &str = "background.mp4";

/// How the muxer treats the frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageMode {
    /// Frames are the whole picture.
    Standard,
    /// Frames are laid over `background.mp4`.
    Overlay,
}

/// Contents of `metadata.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Frames per second.
    pub fps: u32,
    /// Timeline length in seconds.
    pub duration: f64,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Width of the muxed video.
    pub output_width: u32,
    /// Height of the muxed video.
    pub output_height: u32,
    /// Overlay when a background video is present.
    pub mode: PackageMode,
    /// Background video URL from the project.
    pub background_video: Option<String>,
    /// Background thumbnail URL from the project.
    pub background_thumbnail: Option<String>,
    /// Exported project id.
    pub project_id: String,
    /// Number of `frameNNNNN.png` files in the package.
    pub frame_count: u64,
    /// Audio manifest.
    pub audio_tracks: Vec<AudioTrack>,
}

/// Sizes and timing that go into [`Metadata`] besides the project itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackageTiming {
    /// Frames per second.
    pub fps: u32,
    /// Timeline length in seconds.
    pub duration: f64,
    /// Render size.
    pub size: (u32, u32),
    /// Size requested from the muxer.
    pub output_size: (u32, u32),
    /// Frames written.
    pub frame_count: u64,
}

impl Metadata {
    /// Assemble metadata for `project`.
    pub fn new(project: &Project, timing: PackageTiming, audio_tracks: Vec<AudioTrack>) -> Self {
        let background_video = project
            .background_video
            .clone()
            .filter(|v| !v.trim().is_empty());
        let mode = if background_video.is_some() {
            PackageMode::Overlay
        } else {
            PackageMode::Standard
        };
        Self {
            fps: timing.fps,
            duration: timing.duration,
            width: timing.size.0,
            height: timing.size.1,
            output_width: timing.output_size.0,
            output_height: timing.output_size.1,
            mode,
            background_video,
            background_thumbnail: project.background_thumbnail.clone(),
            project_id: project.id.clone(),
            frame_count: timing.frame_count,
            audio_tracks,
        }
    }
}

/// Write every planned audio track into `dir` under its manifest file name.
pub fn write_audio_files(dir: &Path, plan: &AudioPlan) -> ReelsmithResult<()> {
    for entry in &plan.entries {
        let dest = dir.join(&entry.track.filename);
        match &entry.source {
            TrackSource::Bytes(bytes) => std::fs::write(&dest, bytes)
                .with_context(|| format!("write audio track '{}'", dest.display()))?,
            TrackSource::File(src) => {
                std::fs::copy(src, &dest).with_context(|| {
                    format!("copy audio '{}' to '{}'", src.display(), dest.display())
                })?;
            }
        }
    }
    Ok(())
}

/// Write `project.json`, `metadata.json` and (when given) `background.mp4` into `dir`.
pub fn write_manifests(
    dir: &Path,
    project: &Project,
    metadata: &Metadata,
    background_video: Option<&[u8]>,
) -> ReelsmithResult<()> {
    write_json(&dir.join(PROJECT_FILE), project)?;
    write_json(&dir.join(METADATA_FILE), metadata)?;
    if let Some(bytes) = background_video {
        let dest = dir.join(BACKGROUND_VIDEO_FILE);
        std::fs::write(&dest, bytes)
            .with_context(|| format!("write background video '{}'", dest.display()))?;
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> ReelsmithResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}

/// Where [`finalize_package`] puts the result: `<out>.zip` when archiving, `out` otherwise.
pub fn package_path(out: &Path, archive: bool) -> PathBuf {
    if archive && out.extension().is_none_or(|e| e != "zip") {
        let mut name = out.as_os_str().to_owned();
        name.push(".zip");
        PathBuf::from(name)
    } else {
        out.to_path_buf()
    }
}

/// Directory to create the staging area in, so the final move stays on one filesystem.
pub fn staging_parent(out: &Path) -> PathBuf {
    out.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Publish the staged package at [`package_path`]`(out, archive)`.
///
/// An existing target is an error unless `overwrite` is set.
#[tracing::instrument(skip_all, fields(out = %out.display(), archive = archive))]
pub fn finalize_package(
    staging: &Path,
    out: &Path,
    archive: bool,
    overwrite: bool,
) -> ReelsmithResult<PathBuf> {
    let target = package_path(out, archive);
    if target.exists() && !overwrite {
        return Err(ReelsmithError::validation(format!(
            "output '{}' already exists (set overwrite to replace it)",
            target.display()
        )));
    }
    let parent = staging_parent(&target);
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("create output dir '{}'", parent.display()))?;

    if archive {
        let tmp = tempfile::NamedTempFile::new_in(&parent).context("create archive temp file")?;
        let file = tmp.reopen().context("open archive temp file")?;
        let entries = zip_dir(staging, file)?;
        tmp.persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("move archive to '{}'", target.display()))?;
        tracing::info!(entries, path = %target.display(), "package archived");
    } else {
        if target.exists() {
            std::fs::remove_dir_all(&target)
                .with_context(|| format!("remove old output '{}'", target.display()))?;
        }
        std::fs::rename(staging, &target).with_context(|| {
            format!("move '{}' to '{}'", staging.display(), target.display())
        })?;
        tracing::info!(path = %target.display(), "package written");
    }
    Ok(target)
}

/// Deflate every file of `dir` (flat, sorted by name) into `file`. Returns the entry count.
fn zip_dir(dir: &Path, file: File) -> ReelsmithResult<usize> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
        let entry = entry.context("read staging entry")?;
        if entry.file_type().context("stat staging entry")?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let mut zip = zip::ZipWriter::new(file);
    for name in &names {
        let bytes = std::fs::read(dir.join(name)).with_context(|| format!("read '{name}'"))?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("start zip entry '{name}'"))?;
        zip.write_all(&bytes)
            .with_context(|| format!("write zip entry '{name}'"))?;
    }
    zip.finish().context("finish archive")?;
    Ok(names.len())
}

#[cfg(test)]
#[path = "../../tests/unit/export/package.rs"]
mod tests;
