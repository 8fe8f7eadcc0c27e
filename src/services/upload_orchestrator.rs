//! UploadOrchestrator: drives local files through grant → transfer → register.
//!
//! Files are uploaded one at a time, in order, and each file's phases run
//! strictly in sequence. The first failure stops the batch: files already
//! registered stay registered, files after the failing one are never started.
//! Progress is reported per completed file as `completed * 100 / total`.

use crate::{
    errors::{ApiResult, BatchError, UploadError},
    models::{Asset, UploadPhase, UploadSource, UploadTask},
    services::asset_service::AssetBackend,
};
use std::{future::Future, sync::Arc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Aggregate progress of the running batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            (completed.min(total) * 100 / total) as u8
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Notifications emitted while a batch runs.
///
/// Exactly one of `Completed` or `Failed` closes every non-empty batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadEvent {
    PhaseChanged {
        position: usize,
        file_name: String,
        phase: UploadPhase,
    },
    Progress(BatchProgress),
    Completed {
        uploaded: usize,
    },
    Failed {
        position: usize,
        total: usize,
        file_name: Option<String>,
        phase: UploadPhase,
        message: String,
    },
}

/// Result of a batch that ran to the end.
#[derive(Debug)]
pub struct BatchReport {
    pub assets: Vec<Asset>,
    pub tasks: Vec<UploadTask>,
}

pub struct UploadOrchestrator<B> {
    backend: Arc<B>,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
    progress: watch::Sender<Option<BatchProgress>>,
    cancel: CancellationToken,
}

impl<B> UploadOrchestrator<B>
where
    B: AssetBackend,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            events: None,
            progress: watch::Sender::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Abort the in-flight request and stop the batch once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// In-flight progress; `None` whenever no batch is running.
    pub fn progress(&self) -> watch::Receiver<Option<BatchProgress>> {
        self.progress.subscribe()
    }

    /// Upload `sources` in order into `folder` (blank means no folder).
    ///
    /// Runs one batch at a time; concurrent calls on the same orchestrator
    /// would interleave their progress reports.
    pub async fn upload_batch(
        &self,
        sources: Vec<UploadSource>,
        folder: Option<&str>,
    ) -> Result<BatchReport, BatchError> {
        let total = sources.len();
        let folder = folder.map(str::trim).filter(|f| !f.is_empty());
        if total == 0 {
            return Ok(BatchReport {
                assets: Vec::new(),
                tasks: Vec::new(),
            });
        }

        info!(total, folder = folder.unwrap_or("-"), "starting upload batch");
        self.progress.send_replace(Some(BatchProgress::new(0, total)));

        let mut assets = Vec::with_capacity(total);
        let mut tasks = Vec::with_capacity(total);

        for (index, source) in sources.iter().enumerate() {
            let position = index + 1;
            let mut task = UploadTask::new(&source.file_name, folder.map(str::to_string));

            let outcome = if self.cancel.is_cancelled() {
                Err(UploadError::Cancelled {
                    file_name: source.file_name.clone(),
                    phase: task.phase(),
                })
            } else {
                self.upload_one(position, source, &mut task, folder).await
            };

            match outcome {
                Ok(asset) => {
                    assets.push(asset);
                    tasks.push(task);
                    let progress = BatchProgress::new(position, total);
                    self.progress.send_replace(Some(progress));
                    self.emit(UploadEvent::Progress(progress));
                    debug!(position, total, percent = progress.percent, "file registered");
                }
                Err(error) => {
                    // Only non-terminal tasks reach here, so this cannot be rejected.
                    let _ = task.fail(error.to_string());
                    tasks.push(task);
                    warn!(position, total, %error, "upload batch stopped");
                    self.progress.send_replace(None);
                    self.emit(UploadEvent::Failed {
                        position,
                        total,
                        file_name: error.file_name().map(str::to_string),
                        phase: error.phase(),
                        message: error.to_string(),
                    });
                    return Err(BatchError {
                        position,
                        total,
                        completed: assets,
                        tasks,
                        error,
                    });
                }
            }
        }

        info!(uploaded = assets.len(), "upload batch complete");
        self.progress.send_replace(None);
        self.emit(UploadEvent::Completed {
            uploaded: assets.len(),
        });
        Ok(BatchReport { assets, tasks })
    }

    async fn upload_one(
        &self,
        position: usize,
        source: &UploadSource,
        task: &mut UploadTask,
        folder: Option<&str>,
    ) -> Result<Asset, UploadError> {
        let file_name = source.file_name.clone();

        self.enter(position, task, UploadPhase::GrantRequested)?;
        let grant = self
            .guarded(task, self.backend.request_upload_grant(&source.grant_request(folder)))
            .await?
            .map_err(|source| UploadError::Grant {
                file_name: file_name.clone(),
                source,
            })?;

        self.enter(position, task, UploadPhase::Transferring)?;
        self.guarded(task, self.backend.transfer(&grant, source))
            .await?
            .map_err(|source| UploadError::Transfer {
                file_name: file_name.clone(),
                source,
            })?;

        self.enter(position, task, UploadPhase::Registering)?;
        let asset = self
            .guarded(task, self.backend.register_asset(&source.register_request(&grant)))
            .await?
            .map_err(|err| {
                let orphan = grant.location();
                warn!(file = %file_name, %orphan, "object stored but not registered");
                UploadError::Registration {
                    file_name: file_name.clone(),
                    orphan,
                    source: err,
                }
            })?;

        task.complete(&asset.id)?;
        self.emit(UploadEvent::PhaseChanged {
            position,
            file_name,
            phase: UploadPhase::Complete,
        });
        Ok(asset)
    }

    fn enter(
        &self,
        position: usize,
        task: &mut UploadTask,
        phase: UploadPhase,
    ) -> Result<(), UploadError> {
        task.advance(phase)?;
        debug!(position, file = %task.file_name, %phase, "upload phase");
        self.emit(UploadEvent::PhaseChanged {
            position,
            file_name: task.file_name.clone(),
            phase,
        });
        Ok(())
    }

    /// Run one request, dropping it if the batch is cancelled first.
    async fn guarded<T, F>(&self, task: &UploadTask, request: F) -> Result<ApiResult<T>, UploadError>
    where
        F: Future<Output = ApiResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled {
                file_name: task.file_name.clone(),
                phase: task.phase(),
            }),
            result = request => Ok(result),
        }
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is watching.
            let _ = events.send(event);
        }
    }
}
