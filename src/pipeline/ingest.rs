//! Ingestion pipeline: the only writer of the result store

use crate::extract::Record;
use crate::storage::{ResultStore, Source, StoreSnapshot};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Caller-supplied function applied to each record right before insertion
///
/// Runs on the single consumer task, so it should be quick.
pub type Transform<R> = Arc<dyn Fn(R) -> R + Send + Sync>;

enum IngestMessage<R> {
    Record(R, Source),
    Failed(String),
    Snapshot(oneshot::Sender<StoreSnapshot<R>>),
}

/// Handle to the ingestion mailbox
///
/// Cloning the handle adds a producer; the consumer stops once every handle
/// has been dropped.
pub struct Ingestion<R> {
    sender: mpsc::UnboundedSender<IngestMessage<R>>,
}

impl<R> Clone for Ingestion<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<R: Record> Ingestion<R> {
    /// Spawns the consumer task owning a fresh, empty result store
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(transform: Option<Transform<R>>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(consume(receiver, ResultStore::new(), transform));
        Self { sender }
    }

    /// Queues a record for dedup-insertion
    pub fn submit(&self, record: R, source: Source) {
        self.send(IngestMessage::Record(record, source));
    }

    /// Queues a URL for the failed-request list
    pub fn record_failure(&self, url: impl Into<String>) {
        self.send(IngestMessage::Failed(url.into()));
    }

    /// Returns a copy of the store once every earlier message has been applied
    pub async fn snapshot(&self) -> StoreSnapshot<R> {
        let (reply, response) = oneshot::channel();
        self.send(IngestMessage::Snapshot(reply));
        response.await.unwrap_or_default()
    }

    fn send(&self, message: IngestMessage<R>) {
        if self.sender.send(message).is_err() {
            tracing::warn!("Ingestion consumer has stopped; message dropped");
        }
    }
}

async fn consume<R: Record>(
    mut receiver: mpsc::UnboundedReceiver<IngestMessage<R>>,
    mut store: ResultStore<R>,
    transform: Option<Transform<R>>,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            IngestMessage::Record(record, source) => {
                let record = match &transform {
                    Some(transform) => match apply(transform, record) {
                        Some(record) => record,
                        None => continue,
                    },
                    None => record,
                };
                if !store.insert(record, source) {
                    tracing::trace!("Duplicate record dropped");
                }
            }
            IngestMessage::Failed(url) => store.record_failure(url),
            IngestMessage::Snapshot(reply) => {
                let _ = reply.send(store.snapshot());
            }
        }
    }

    tracing::debug!("Ingestion consumer finished with {} record(s)", store.len());
}

/// Runs the transform; a panic drops only the record being transformed
fn apply<R: Record>(transform: &Transform<R>, record: R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(|| transform(record))) {
        Ok(record) => Some(record),
        Err(_) => {
            tracing::warn!("Record transform panicked; record dropped");
            None
        }
    }
}
