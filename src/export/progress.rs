use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;

use crate::foundation::error::ReelsmithResult;

/// Pipeline phase shown next to the percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    /// Building the timeline and decoding overlays (0-20 %).
    Preloading,
    /// Rendering frames (20-80 %).
    Generating,
    /// Writing audio, metadata and the archive (80-100 %).
    Zipping,
}

/// Job state as seen by the job store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Export running.
    Generating,
    /// Package ready.
    Completed,
    /// Export aborted with an error.
    Failed,
    /// Export stopped by the caller.
    Cancelled,
}

/// One progress record.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Job state.
    pub status: JobStatus,
    /// Percentage in `0..=100`.
    pub progress: f64,
    /// Current phase.
    pub phase: ExportPhase,
    /// Human-readable step description.
    pub message: String,
    /// Error message for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressUpdate {
    /// Running update.
    pub fn running(phase: ExportPhase, progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Generating,
            progress: progress.clamp(0.0, 100.0),
            phase,
            message: message.into(),
            error: None,
        }
    }
}

/// Receives progress from an export; the export is the only producer.
pub trait ProgressSink: Send + Sync {
    /// Record `update`.
    fn report(&self, update: &ProgressUpdate);
}

/// Logs every update through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, u: &ProgressUpdate) {
        match u.status {
            JobStatus::Failed => tracing::error!(
                phase = ?u.phase,
                error = u.error.as_deref().unwrap_or(""),
                "{}",
                u.message
            ),
            _ => tracing::info!(
                status = ?u.status,
                phase = ?u.phase,
                progress = u.progress,
                "{}",
                u.message
            ),
        }
    }
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingProgress {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates received so far.
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Most recent update.
    pub fn last(&self) -> Option<ProgressUpdate> {
        self.updates.lock().ok().and_then(|u| u.last().cloned())
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, update: &ProgressUpdate) {
        if let Ok(mut u) = self.updates.lock() {
            u.push(update.clone());
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    job_id: String,
    #[serde(flatten)]
    update: ProgressUpdate,
}

/// Persists the latest update for one job as JSON, replacing the file atomically.
#[derive(Debug)]
pub struct JobStatusFile {
    path: PathBuf,
    job_id: String,
}

impl JobStatusFile {
    /// Status file for `job_id` at `path`.
    pub fn new(path: impl Into<PathBuf>, job_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            job_id: job_id.into(),
        }
    }

    /// Read back the stored update.
    pub fn read(&self) -> ReelsmithResult<ProgressUpdate> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read job status '{}'", self.path.display()))?;
        let record: JobRecord = serde_json::from_str(&text)?;
        Ok(record.update)
    }

    fn write(&self, update: &ProgressUpdate) -> ReelsmithResult<()> {
        let record = JobRecord {
            job_id: self.job_id.clone(),
            update: update.clone(),
        };
        let json = serde_json::to_vec_pretty(&record)?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create job status dir '{}'", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).context("create job status temp file")?;
        tmp.write_all(&json).context("write job status")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace job status '{}'", self.path.display()))?;
        Ok(())
    }
}

impl ProgressSink for JobStatusFile {
    fn report(&self, update: &ProgressUpdate) {
        if let Err(e) = self.write(update) {
            tracing::warn!(job = %self.job_id, error = %e, "could not persist job status");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/progress.rs"]
mod tests;
