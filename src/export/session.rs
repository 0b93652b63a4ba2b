use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;

use crate::assets::fetch::{AssetFetcher, DefaultFetcher};
use crate::assets::media::{MediaDecoder, NativeMediaDecoder};
use crate::assets::preload::{collect_overlay_sources, preload_assets};
use crate::audio::tracks::{BackgroundMusic, assemble_tracks};
use crate::encode::sink::DirSink;
use crate::export::config::ExportConfig;
use crate::export::package::{
    Metadata, PackageTiming, finalize_package, package_path, staging_parent, write_audio_files,
    write_manifests,
};
use crate::export::progress::{ExportPhase, JobStatus, ProgressSink, ProgressUpdate};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelsmithError, ReelsmithResult};
use crate::layout::captions::LayoutCache;
use crate::layout::text::{FontBook, ParleyShaper, TextShaper};
use crate::render::backend::{FrameRGBA, RenderSettings};
use crate::render::compositor::{Banner, FrameCompositor};
use crate::render::geometry::reference_scale;
use crate::render::paint::ImagePaint;
use crate::render::scheduler::{CancelToken, RenderStats, ScheduleOpts, render_sequence};
use crate::script::model::{CaptionSettings, Project};
use crate::timeline::builder::Timeline;
use crate::timeline::duration::{AudioProbe, DurationResolver, SymphoniaProbe};

const PRELOAD_END: f64 = 20.0;
const TIMELINE_DONE: f64 = 5.0;
const GENERATE_END: f64 = 80.0;
const ARCHIVE_START: f64 = 90.0;

/// Outcome of a finished export.
#[derive(Clone, Debug)]
pub struct ExportReport {
    /// Zip file or directory holding the package.
    pub package: PathBuf,
    /// Frame counters.
    pub stats: RenderStats,
    /// Contents of `metadata.json`.
    pub metadata: Metadata,
    /// Overlays that were skipped, with the reason.
    pub skipped_assets: Vec<(String, String)>,
}

struct Prepared {
    compositor: FrameCompositor,
    skipped_assets: Vec<(String, String)>,
}

/// One export of one project.
///
/// Owns every per-export cache (timeline, caption layouts, decoded overlays); nothing is shared
/// between sessions. [`ExportSession::prepare`] front-loads all of it, after which frames can be
/// rendered singly ([`ExportSession::render_frame`]) or packaged ([`ExportSession::run`]).
pub struct ExportSession {
    project: Project,
    config: ExportConfig,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    decoder: Arc<dyn MediaDecoder>,
    probe: Arc<dyn AudioProbe>,
    shaper: Option<Box<dyn TextShaper>>,
    prepared: Option<Prepared>,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("project", &self.project.id)
            .field("config", &self.config)
            .field("prepared", &self.prepared.is_some())
            .finish_non_exhaustive()
    }
}

impl ExportSession {
    /// Validate `project` and `config` and set up the production collaborators.
    pub fn new(mut project: Project, config: ExportConfig) -> ReelsmithResult<Self> {
        config.validate()?;
        project.ensure_words();
        project.validate()?;
        Ok(Self {
            project,
            config,
            fetcher: None,
            decoder: Arc::new(NativeMediaDecoder),
            probe: Arc::new(SymphoniaProbe),
            shaper: None,
            prepared: None,
        })
    }

    /// Fetch media through `fetcher` instead of the file/HTTP default.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self.prepared = None;
        self
    }

    /// Decode overlays with `decoder`.
    pub fn with_decoder(mut self, decoder: Arc<dyn MediaDecoder>) -> Self {
        self.decoder = decoder;
        self.prepared = None;
        self
    }

    /// Read narration durations with `probe`.
    pub fn with_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.probe = probe;
        self.prepared = None;
        self
    }

    /// Shape caption and banner text with `shaper` instead of the configured fonts.
    pub fn with_shaper(mut self, shaper: Box<dyn TextShaper>) -> Self {
        self.shaper = Some(shaper);
        self.prepared = None;
        self
    }

    /// The exported project (words filled in).
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Effective settings.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Build the timeline only; no fonts or media are touched.
    pub fn build_timeline(&self) -> Timeline {
        let resolver = DurationResolver::new(
            Arc::clone(&self.probe),
            Duration::from_millis(self.config.duration_probe_timeout_ms),
            self.config.duration_fallback,
        );
        Timeline::build(&self.project.sentences, &resolver)
    }

    /// Resolve durations, lay out captions and preload overlays, reporting into the
    /// `preloading` phase. A second call is a no-op.
    pub fn prepare(&mut self, progress: &dyn ProgressSink) -> ReelsmithResult<&FrameCompositor> {
        if self.prepared.is_none() {
            self.prepared = Some(self.build(progress)?);
        }
        self.prepared
            .as_ref()
            .map(|p| &p.compositor)
            .ok_or_else(|| ReelsmithError::render("export session not prepared"))
    }

    /// Prepare if needed and render the frame shown at `t` seconds.
    pub fn render_frame(&mut self, t: f64, progress: &dyn ProgressSink) -> ReelsmithResult<FrameRGBA> {
        if !t.is_finite() || t < 0.0 {
            return Err(ReelsmithError::validation(format!(
                "frame time must be finite and >= 0, got {t}"
            )));
        }
        self.prepare(progress)?.compose_frame(t)
    }

    fn build(&mut self, progress: &dyn ProgressSink) -> ReelsmithResult<Prepared> {
        let canvas = self.config.canvas()?;
        progress.report(&ProgressUpdate::running(
            ExportPhase::Preloading,
            0.0,
            "Resolving sentence durations",
        ));
        let timeline = self.build_timeline();
        progress.report(&ProgressUpdate::running(
            ExportPhase::Preloading,
            TIMELINE_DONE,
            format!("Timeline ready ({:.2}s)", timeline.total_duration()),
        ));

        let mut captions = self.project.captions();
        let scale = reference_scale(canvas);
        if scale != 1.0 {
            captions = captions.scaled(scale);
        }

        let mut shaper: Box<dyn TextShaper> = match self.shaper.take() {
            Some(s) => s,
            None => Box::new(self.font_shaper()?),
        };
        let shaped = self.shape_text(&timeline, &captions, canvas, shaper.as_mut());
        self.shaper = Some(shaper);
        let (layouts, banner) = shaped?;

        let fetcher = self.fetcher()?;
        let sources = collect_overlay_sources(&self.project.sentences);
        let report = preload_assets(
            &sources,
            fetcher.as_ref(),
            self.decoder.as_ref(),
            self.config.video_sample_fps,
            &|done, total| {
                let pct = TIMELINE_DONE + (PRELOAD_END - TIMELINE_DONE) * done as f64 / total as f64;
                progress.report(&ProgressUpdate::running(
                    ExportPhase::Preloading,
                    pct,
                    format!("Loading media {done}/{total}"),
                ));
            },
        );

        let mut compositor = FrameCompositor::new(canvas, timeline, layouts, report.cache, captions)
            .with_gap_policy(self.config.gap_policy)
            .with_settings(RenderSettings {
                clear_rgba: self.config.clear_rgba,
            });
        if let Some(banner) = banner {
            compositor = compositor.with_banner(banner);
        }
        if let Some(wm) = self.load_watermark() {
            compositor = compositor.with_watermark(wm);
        }
        progress.report(&ProgressUpdate::running(
            ExportPhase::Preloading,
            PRELOAD_END,
            "Media ready",
        ));
        Ok(Prepared {
            compositor,
            skipped_assets: report.failed,
        })
    }

    fn shape_text(
        &self,
        timeline: &Timeline,
        captions: &CaptionSettings,
        canvas: Canvas,
        shaper: &mut dyn TextShaper,
    ) -> ReelsmithResult<(LayoutCache, Option<Banner>)> {
        let mut layouts = LayoutCache::new();
        let sentences: Vec<_> = timeline.items().iter().map(|i| i.sentence.clone()).collect();
        layouts.refresh(&sentences, captions, canvas.width, shaper)?;

        let b = &self.config.banner;
        let banner = if b.enabled {
            Some(Banner::shaped(
                canvas,
                &b.text,
                &b.font_family,
                b.color,
                b.text_color,
                shaper,
            )?)
        } else {
            None
        };
        Ok((layouts, banner))
    }

    fn font_shaper(&self) -> ReelsmithResult<ParleyShaper> {
        let mut book = FontBook::new();
        for (family, path) in &self.config.fonts {
            book.load(family, path)?;
        }
        ParleyShaper::new(&book)
    }

    fn fetcher(&mut self) -> ReelsmithResult<Arc<dyn AssetFetcher>> {
        if let Some(f) = &self.fetcher {
            return Ok(Arc::clone(f));
        }
        let f: Arc<dyn AssetFetcher> = Arc::new(DefaultFetcher::new(
            self.config.assets_root.clone(),
            self.config.proxy_url.as_deref(),
            Duration::from_millis(self.config.fetch_timeout_ms),
        )?);
        self.fetcher = Some(Arc::clone(&f));
        Ok(f)
    }

    fn load_watermark(&self) -> Option<ImagePaint> {
        let path = self.config.watermark.as_ref()?;
        let loaded = std::fs::read(path)
            .with_context(|| format!("read watermark '{}'", path.display()))
            .map_err(ReelsmithError::from)
            .and_then(|bytes| self.decoder.decode_image(&bytes))
            .and_then(|img| ImagePaint::from_prepared(&img));
        match loaded {
            Ok(paint) => Some(paint),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "watermark unavailable, skipping");
                None
            }
        }
    }

    /// Render every frame and write the muxer package for `out`.
    ///
    /// Progress runs `preloading` 0-20 %, `generating` 20-80 %, `zipping` 80-100 %. On failure
    /// or cancellation the staging directory is discarded and a `FAILED` or `CANCELLED` record is
    /// reported before the error is returned.
    #[tracing::instrument(skip_all, fields(project = %self.project.id, out = %out.display()))]
    pub fn run(
        &mut self,
        out: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> ReelsmithResult<ExportReport> {
        let tracked = PhaseTracker {
            inner: progress,
            last: Mutex::new((ExportPhase::Preloading, 0.0)),
        };
        let result = self.run_inner(out, &tracked, cancel);

        match result {
            Ok(report) => {
                progress.report(&ProgressUpdate {
                    status: JobStatus::Completed,
                    progress: 100.0,
                    phase: ExportPhase::Zipping,
                    message: "Export complete".to_owned(),
                    error: None,
                });
                Ok(report)
            }
            Err(e) => {
                let (phase, pct) = tracked.last();
                let status = if e.is_cancelled() {
                    JobStatus::Cancelled
                } else {
                    JobStatus::Failed
                };
                progress.report(&ProgressUpdate {
                    status,
                    progress: pct,
                    phase,
                    message: if e.is_cancelled() {
                        "Export cancelled".to_owned()
                    } else {
                        "Export failed".to_owned()
                    },
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    fn run_inner(
        &mut self,
        out: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> ReelsmithResult<ExportReport> {
        let target = package_path(out, self.config.archive);
        if target.exists() && !self.config.overwrite {
            return Err(ReelsmithError::validation(format!(
                "output '{}' already exists (set overwrite to replace it)",
                target.display()
            )));
        }

        self.prepare(progress)?;
        let background = self.fetch_background_video()?;
        check_cancel(cancel)?;

        let parent = staging_parent(&target);
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
        let staging = tempfile::Builder::new()
            .prefix(".reelsmith-staging-")
            .tempdir_in(&parent)
            .context("create staging dir")?;

        let fps = self.config.fps()?;
        let opts = ScheduleOpts {
            fps,
            concurrency: self.config.concurrency,
        };
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| ReelsmithError::render("export session not prepared"))?;
        let compositor = &prepared.compositor;

        let mut sink = DirSink::new(staging.path());
        let span = GENERATE_END - PRELOAD_END;
        let stats = render_sequence(compositor, opts, &mut sink, cancel, &mut |done, total| {
            progress.report(&ProgressUpdate::running(
                ExportPhase::Generating,
                PRELOAD_END + span * done as f64 / total.max(1) as f64,
                format!("Generating frame {done}/{total}"),
            ));
        })?;
        check_cancel(cancel)?;

        progress.report(&ProgressUpdate::running(
            ExportPhase::Zipping,
            GENERATE_END,
            "Writing audio tracks",
        ));
        let effects = existing_effects(&self.config.sound_effects);
        let music = self.background_music();
        let plan = assemble_tracks(compositor.timeline(), &effects, music.as_ref());
        write_audio_files(staging.path(), &plan)?;

        let canvas = compositor.canvas();
        let metadata = Metadata::new(
            &self.project,
            PackageTiming {
                fps: self.config.fps,
                duration: compositor.timeline().total_duration(),
                size: (canvas.width, canvas.height),
                output_size: self.config.output_size(),
                frame_count: stats.frames_rendered,
            },
            plan.tracks(),
        );
        write_manifests(staging.path(), &self.project, &metadata, background.as_deref())?;
        check_cancel(cancel)?;

        progress.report(&ProgressUpdate::running(
            ExportPhase::Zipping,
            ARCHIVE_START,
            if self.config.archive {
                "Creating archive"
            } else {
                "Moving package into place"
            },
        ));
        let package = finalize_package(
            staging.path(),
            out,
            self.config.archive,
            self.config.overwrite,
        )?;
        tracing::info!(
            frames = stats.frames_rendered,
            tracks = metadata.audio_tracks.len(),
            package = %package.display(),
            "export finished"
        );

        Ok(ExportReport {
            package,
            stats,
            metadata,
            skipped_assets: prepared.skipped_assets.clone(),
        })
    }

    fn fetch_background_video(&mut self) -> ReelsmithResult<Option<Vec<u8>>> {
        let Some(url) = self
            .project
            .background_video
            .clone()
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };
        let bytes = self.fetcher()?.fetch(&url).map_err(|e| {
            ReelsmithError::asset(format!("background video '{url}' unavailable: {e}"))
        })?;
        tracing::debug!(url = %url, bytes = bytes.len(), "background video fetched");
        Ok(Some(bytes))
    }

    fn background_music(&self) -> Option<BackgroundMusic> {
        let m = self.config.background_music.as_ref()?;
        if !m.path.is_file() {
            tracing::warn!(path = %m.path.display(), "background music missing, exporting without it");
            return None;
        }
        Some(BackgroundMusic {
            path: m.path.clone(),
            volume: m.volume,
        })
    }
}

fn existing_effects(effects: &BTreeMap<String, PathBuf>) -> BTreeMap<String, PathBuf> {
    effects
        .iter()
        .filter(|(id, path)| {
            let ok = path.is_file();
            if !ok {
                tracing::warn!(effect = %id, path = %path.display(), "sound effect file missing");
            }
            ok
        })
        .map(|(id, path)| (id.clone(), path.clone()))
        .collect()
}

fn check_cancel(cancel: &CancelToken) -> ReelsmithResult<()> {
    if cancel.is_cancelled() {
        return Err(ReelsmithError::Cancelled);
    }
    Ok(())
}

/// Forwards updates and remembers the last phase and percentage for the final record.
struct PhaseTracker<'a> {
    inner: &'a dyn ProgressSink,
    last: Mutex<(ExportPhase, f64)>,
}

impl PhaseTracker<'_> {
    fn last(&self) -> (ExportPhase, f64) {
        self.last
            .lock()
            .map(|l| *l)
            .unwrap_or((ExportPhase::Preloading, 0.0))
    }
}

impl ProgressSink for PhaseTracker<'_> {
    fn report(&self, update: &ProgressUpdate) {
        if let Ok(mut last) = self.last.lock() {
            *last = (update.phase, update.progress);
        }
        self.inner.report(update);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
