//! Background writer for the progress snapshot.
//!
//! Callers hand over an encoded snapshot and return immediately; a single
//! task applies writes in submission order. A failed write is logged and kept
//! until the next [`SnapshotWriter::flush`] reports it, unless a later write
//! succeeds first.

use std::sync::Arc;

use storage::SnapshotRepository;
use tokio::sync::{mpsc, oneshot};

use crate::error::PersistenceError;

enum WriterCommand {
    Save(String),
    Flush(oneshot::Sender<Result<(), PersistenceError>>),
}

#[derive(Clone)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl SnapshotWriter {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(repo: Arc<dyn SnapshotRepository>, key: &'static str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(repo, key, rx));
        Self { tx }
    }

    /// Queue `payload` for writing. Never waits on the write itself.
    pub fn schedule(&self, payload: String) {
        if self.tx.send(WriterCommand::Save(payload)).is_err() {
            tracing::warn!("snapshot writer stopped; progress kept in memory only");
        }
    }

    /// Wait until every write queued so far has been attempted.
    ///
    /// # Errors
    ///
    /// Returns the last write failure since the previous flush when no write
    /// has succeeded after it, or
    /// `PersistenceError::WriterClosed` if the writer task is gone.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(reply))
            .map_err(|_| PersistenceError::WriterClosed)?;
        done.await.map_err(|_| PersistenceError::WriterClosed)?
    }
}

async fn run_writer(
    repo: Arc<dyn SnapshotRepository>,
    key: &'static str,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
) {
    let mut last_failure: Option<PersistenceError> = None;

    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Save(payload) => {
                match repo.save(key, &payload).await {
                    // The newest snapshot supersedes every earlier one.
                    Ok(()) => last_failure = None,
                    Err(err) => {
                        tracing::warn!(error = %err, key, "snapshot write failed");
                        last_failure = Some(PersistenceError::Storage(err));
                    }
                }
            }
            WriterCommand::Flush(reply) => {
                let outcome = last_failure.take().map_or(Ok(()), Err);
                let _ = reply.send(outcome);
            }
        }
    }
}
