use super::AppState;
use crate::{
    models::{UploadPhase, UploadSource},
    services::upload_orchestrator::{UploadEvent, UploadOrchestrator},
};
use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// `upload <files...>` handler.
///
/// Files are read up front so a missing path fails before anything is sent.
/// Ctrl-C cancels the request in flight and stops the batch.
pub async fn upload_files(
    state: &AppState,
    files: Vec<PathBuf>,
    folder: Option<String>,
    name: Option<String>,
) -> Result<()> {
    if name.is_some() && files.len() > 1 {
        anyhow::bail!("--name can only be used when uploading a single file");
    }
    let mut sources = try_join_all(files.iter().map(|path| async move {
        UploadSource::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }))
    .await?;
    if let Some(name) = name {
        sources = sources
            .into_iter()
            .map(|source| source.with_custom_file_name(name.as_str()))
            .collect();
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling upload");
                cancel.cancel();
            }
        })
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let orchestrator = UploadOrchestrator::new(state.service.clone())
        .with_events(tx)
        .with_cancellation(cancel);
    let outcome = orchestrator.upload_batch(sources, folder.as_deref()).await;

    // Dropping the orchestrator closes the event channel so the printer drains and exits.
    drop(orchestrator);
    ctrl_c.abort();
    let _ = printer.await;

    if let Some(task) = outcome.as_ref().err().and_then(|err| err.failed_task()) {
        warn!(
            task = %task.id,
            file = %task.file_name,
            phase = ?task.failed_during(),
            "upload task failed"
        );
    }
    let report = outcome?;
    for asset in &report.assets {
        println!("{}\t{}\t{}", asset.id, asset.name, asset.cloudfront_url);
    }
    info!(uploaded = report.assets.len(), "upload finished");
    Ok(())
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::PhaseChanged {
                position,
                file_name,
                phase,
            } if phase != UploadPhase::Complete => {
                eprintln!("[{}] {}: {}", position, file_name, phase);
            }
            UploadEvent::PhaseChanged { .. } => {}
            UploadEvent::Progress(progress) => {
                eprintln!(
                    "{}% ({}/{})",
                    progress.percent, progress.completed, progress.total
                );
            }
            UploadEvent::Completed { uploaded } => {
                eprintln!("uploaded {} file(s)", uploaded);
            }
            UploadEvent::Failed {
                position,
                total,
                file_name,
                phase,
                message,
            } => {
                eprintln!(
                    "failed at file {} of {} ({}) during {}: {}",
                    position,
                    total,
                    file_name.as_deref().unwrap_or("?"),
                    phase,
                    message
                );
            }
        }
    }
}
