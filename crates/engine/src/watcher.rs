use crate::context::{Command, CommandResponse, WatchContext};
use crate::document::{DocumentEvent, DocumentView};
use crate::{EngineError, Result};
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Handle to the watcher task that owns a [`WatchContext`] and drains the
/// host's document-event feed.
///
/// The task holds the sole receiver, so a duplicate subscription to the same
/// feed cannot exist; spawning again on a fresh channel is the
/// restart-on-resubscribe path and begins with a fresh full-document pass.
/// Dropping the last handle shuts the task down.
#[derive(Clone)]
pub struct MutationWatcher {
    inner: Arc<MutationWatcherInner>,
}

struct MutationWatcherInner {
    command_tx: mpsc::Sender<WatcherCommand>,
}

enum WatcherCommand {
    Run {
        command: Command,
        respond_to: oneshot::Sender<CommandResponse>,
    },
    Shutdown,
}

impl MutationWatcher {
    /// Spawns the watcher loop: one initial full-document evaluation pass,
    /// then events and commands processed to completion in dispatch order.
    pub fn spawn<D>(
        mut context: WatchContext,
        doc: Arc<RwLock<D>>,
        mut events: mpsc::Receiver<DocumentEvent>,
    ) -> Self
    where
        D: DocumentView + Send + Sync + 'static,
    {
        let (command_tx, mut command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            {
                let doc = doc.read().await;
                let marked = context.highlight(&*doc).await;
                info!("initial scan flagged {marked} elements");
            }

            loop {
                tokio::select! {
                    Some(event) = events.recv() => {
                        let doc = doc.read().await;
                        context.process_event(&*doc, event).await;
                    }
                    Some(command) = command_rx.recv() => {
                        match command {
                            WatcherCommand::Run { command, respond_to } => {
                                let doc = doc.read().await;
                                let response = context.run_command(&*doc, command).await;
                                let _ = respond_to.send(response);
                            }
                            WatcherCommand::Shutdown => break,
                        }
                    }
                    else => break,
                }
            }
        });

        Self {
            inner: Arc::new(MutationWatcherInner { command_tx }),
        }
    }

    /// Sends a command to the watcher and waits for its acknowledgement.
    /// Fails only when no scanning context is present (watcher gone).
    pub async fn command(&self, command: Command) -> Result<CommandResponse> {
        let (respond_to, response) = oneshot::channel();
        self.inner
            .command_tx
            .send(WatcherCommand::Run {
                command,
                respond_to,
            })
            .await
            .map_err(|err| EngineError::Other(format!("no scanning context: {err}")))?;
        response
            .await
            .map_err(|err| EngineError::Other(format!("watcher dropped response: {err}")))
    }
}

impl Drop for MutationWatcherInner {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(WatcherCommand::Shutdown);
    }
}
