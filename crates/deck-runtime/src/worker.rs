use crate::pipeline::Pipeline;
use crate::{DeckCommand, DeckUpdate};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Background task that runs admitted events one at a time
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<DeckCommand>,
    pipeline: Arc<Pipeline>,
    update_tx: mpsc::UnboundedSender<DeckUpdate>,
) {
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &pipeline, &update_tx).await;
    }
    log::info!("worker stopped");
}

async fn process_command(
    cmd: DeckCommand,
    pipeline: &Pipeline,
    update_tx: &mpsc::UnboundedSender<DeckUpdate>,
) {
    match cmd {
        DeckCommand::Process { event, claim } => {
            let _ = update_tx.send(DeckUpdate::Started {
                key: claim.key().to_string(),
            });
            let outcome = pipeline.run(&event, claim).await;
            let _ = update_tx.send(DeckUpdate::Finished { outcome });
        }
    }
}

/// Spawn [`worker_task`] on the current runtime
pub fn spawn_worker(
    pipeline: Arc<Pipeline>,
) -> (
    mpsc::UnboundedSender<DeckCommand>,
    mpsc::UnboundedReceiver<DeckUpdate>,
    tokio::task::JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(worker_task(command_rx, pipeline, update_tx));
    (command_tx, update_rx, handle)
}
