//! Sequential, all-or-nothing upload of a file selection.
//!
//! States: `Idle → Validating → Uploading(i) → Aggregated | Failed`. A batch is
//! only produced from `Uploading(n-1)` after the last file succeeded; any
//! failure moves straight to `Failed` and later files are never sent.
use tracing::{debug, info, instrument, warn};

use crate::api::PrepApi;
use crate::error::ClientError;
use crate::model::{CandidateFile, FileType, UploadBatch, UploadItem};
use crate::notify::{character_summary, Notice, Notifier};
use crate::session::Session;

/// Left in [`UploadState::Failed`] when a run is dropped mid-flight.
pub const CANCELLED: &str = "Upload cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Validating,
    Uploading { index: usize, total: usize },
    Aggregated(UploadBatch),
    Failed(String),
}

/// Reject the whole selection unless every file is a PDF within `max_bytes`.
pub fn validate_files(files: &[CandidateFile], max_bytes: u64) -> Result<(), ClientError> {
    if files.is_empty() {
        return Err(ClientError::NoFiles);
    }
    let invalid = files.iter().filter(|f| !f.is_pdf()).count();
    let oversized = files.iter().filter(|f| f.size() > max_bytes).count();
    if invalid > 0 || oversized > 0 {
        return Err(ClientError::InvalidFiles { invalid, oversized });
    }
    Ok(())
}

pub struct UploadCoordinator<'a> {
    api: &'a dyn PrepApi,
    notifier: &'a dyn Notifier,
    max_file_bytes: u64,
    state: UploadState,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(api: &'a dyn PrepApi, notifier: &'a dyn Notifier, max_file_bytes: u64) -> Self {
        Self {
            api,
            notifier,
            max_file_bytes,
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// The finished batch, if the last run succeeded.
    pub fn batch(&self) -> Option<&UploadBatch> {
        match &self.state {
            UploadState::Aggregated(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            UploadState::Validating | UploadState::Uploading { .. }
        )
    }

    /// Upload `files` one at a time and hand the batch to `on_complete`.
    /// A new run supersedes any previous batch. `&mut self` rules out a second
    /// run while one is in flight.
    #[instrument(skip_all, fields(files = files.len(), file_type = %file_type))]
    pub async fn run<F>(
        &mut self,
        session: &Session,
        files: &[CandidateFile],
        file_type: FileType,
        on_complete: F,
    ) -> Result<UploadBatch, ClientError>
    where
        F: FnOnce(&UploadBatch),
    {
        let outcome = {
            let mut progress = Progress(&mut self.state);
            let outcome = upload_all(
                self.api,
                self.max_file_bytes,
                &mut progress,
                session,
                files,
                file_type,
            )
            .await;
            progress.set(UploadState::Idle);
            outcome
        };
        match outcome {
            Ok(batch) => {
                self.state = UploadState::Aggregated(batch.clone());
                self.announce(&batch);
                on_complete(&batch);
                Ok(batch)
            }
            Err(err) => {
                warn!(error = %err, "upload batch failed");
                let message = err.user_message();
                self.state = UploadState::Failed(message.clone());
                self.notifier.notify(Notice::Error(message));
                Err(err)
            }
        }
    }

    fn announce(&self, batch: &UploadBatch) {
        self.notifier.notify(Notice::Success(format!(
            "Uploaded {} file(s) using {} extraction ({} confidence)",
            batch.file_count,
            batch.extraction_method.as_str(),
            batch.extraction_confidence.as_str()
        )));
        if let Some(summary) = character_summary(&batch.character_names) {
            self.notifier.notify(Notice::Info(summary));
        }
    }
}

/// Holds the coordinator state while a run is in progress. A run that is
/// dropped before finishing leaves `Failed` behind rather than a busy state.
struct Progress<'s>(&'s mut UploadState);

impl Progress<'_> {
    fn set(&mut self, state: UploadState) {
        *self.0 = state;
    }
}

impl Drop for Progress<'_> {
    fn drop(&mut self) {
        if matches!(
            *self.0,
            UploadState::Validating | UploadState::Uploading { .. }
        ) {
            warn!("upload run dropped before completion");
            *self.0 = UploadState::Failed(CANCELLED.to_string());
        }
    }
}

async fn upload_all(
    api: &dyn PrepApi,
    max_file_bytes: u64,
    progress: &mut Progress<'_>,
    session: &Session,
    files: &[CandidateFile],
    file_type: FileType,
) -> Result<UploadBatch, ClientError> {
    progress.set(UploadState::Validating);
    validate_files(files, max_file_bytes)?;

    let total = files.len();
    let mut items: Vec<UploadItem> = Vec::with_capacity(total);
    for (index, file) in files.iter().enumerate() {
        progress.set(UploadState::Uploading { index, total });
        debug!(index, filename = %file.filename, "uploading file");
        let item = api.upload(session, file, file_type).await?;
        info!(
            index,
            upload_id = %item.upload_id,
            words = item.word_count,
            "file extracted"
        );
        items.push(item);
    }
    UploadBatch::aggregate(&items).ok_or(ClientError::NoFiles)
}
