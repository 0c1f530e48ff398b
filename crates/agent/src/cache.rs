use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use krishimitr_core::messages;
use krishimitr_core::{ConversationEntry, NewConversation};
use krishimitr_db::{ConversationRepository, RepositoryError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum RecorderCommand {
    Record(NewConversation),
    Flush(oneshot::Sender<()>),
}

/// Outcome counters for background writes.
#[derive(Debug, Default)]
pub struct RecorderStats {
    written: AtomicU64,
    failed: AtomicU64,
}

impl RecorderStats {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Fire-and-forget conversation writer.
///
/// `record` only enqueues; a single worker task appends entries in the order
/// they were queued. Write failures are logged and counted, never returned to
/// the caller that produced the reply.
/// Pending writes the recorder holds before it starts dropping new records.
pub const RECORDER_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct ConversationRecorder {
    sender: mpsc::Sender<RecorderCommand>,
    stats: Arc<RecorderStats>,
}

/// Handle to the recorder's worker task. The task exits once every
/// `ConversationRecorder` clone has been dropped and the queue is drained.
pub struct RecorderWorker {
    handle: JoinHandle<()>,
}

impl RecorderWorker {
    pub async fn join(self) {
        if let Err(error) = self.handle.await {
            warn!(
                event_name = "cache.recorder.join_failed",
                error = %error,
                "recorder worker ended abnormally"
            );
        }
    }
}

impl ConversationRecorder {
    /// Must be called from within a tokio runtime.
    pub fn spawn(repository: Arc<dyn ConversationRepository>) -> (Self, RecorderWorker) {
        Self::spawn_with_capacity(repository, RECORDER_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        repository: Arc<dyn ConversationRepository>,
        capacity: usize,
    ) -> (Self, RecorderWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(RecorderStats::default());
        let handle = tokio::spawn(run_worker(repository, receiver, Arc::clone(&stats)));
        (Self { sender, stats }, RecorderWorker { handle })
    }

    pub fn record(&self, query: &str, reply: &str) {
        let conversation = NewConversation::now(query, reply);
        match self.sender.try_send(RecorderCommand::Record(conversation)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_name = "cache.record.dropped",
                    reason = "queue_full",
                    "recorder queue is full; reply not cached"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_name = "cache.record.dropped",
                    reason = "worker_stopped",
                    "recorder worker is gone; reply not cached"
                );
            }
        }
    }

    /// Resolves once every record queued before this call has been attempted.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(RecorderCommand::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    pub fn stats(&self) -> Arc<RecorderStats> {
        Arc::clone(&self.stats)
    }
}

async fn run_worker(
    repository: Arc<dyn ConversationRepository>,
    mut receiver: mpsc::Receiver<RecorderCommand>,
    stats: Arc<RecorderStats>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            RecorderCommand::Record(conversation) => match repository.append(conversation).await {
                Ok(entry) => {
                    stats.written.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        event_name = "cache.record.saved",
                        conversation_id = entry.id.0,
                        "conversation cached"
                    );
                }
                Err(error) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event_name = "cache.record.failed",
                        error = %error,
                        "failed to cache conversation"
                    );
                }
            },
            RecorderCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(event_name = "cache.recorder.stopped", "recorder worker stopped");
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recall {
    /// `reply` already carries the offline annotation.
    Hit { reply: String, entry: ConversationEntry },
    NoMatch,
}

/// Response cache: background recording plus best-match recall.
#[derive(Clone)]
pub struct ResponseCache {
    repository: Arc<dyn ConversationRepository>,
    recorder: ConversationRecorder,
}

impl ResponseCache {
    pub fn new(repository: Arc<dyn ConversationRepository>, recorder: ConversationRecorder) -> Self {
        Self { repository, recorder }
    }

    /// Builds a cache with its own recorder worker over `repository`.
    pub fn spawn(repository: Arc<dyn ConversationRepository>) -> (Self, RecorderWorker) {
        let (recorder, worker) = ConversationRecorder::spawn(Arc::clone(&repository));
        (Self::new(repository, recorder), worker)
    }

    pub fn record(&self, query: &str, reply: &str) {
        self.recorder.record(query, reply);
    }

    /// Most recent entry whose stored query contains `query` as a substring.
    pub async fn recall_best_match(&self, query: &str) -> Result<Recall, RepositoryError> {
        let recall = match self.repository.latest_containing(query).await? {
            Some(entry) => Recall::Hit { reply: messages::annotate_offline(&entry.reply), entry },
            None => Recall::NoMatch,
        };
        Ok(recall)
    }

    pub async fn flush(&self) {
        self.recorder.flush().await;
    }

    pub fn stats(&self) -> Arc<RecorderStats> {
        self.recorder.stats()
    }

    pub async fn entry_count(&self) -> Result<u64, RepositoryError> {
        self.repository.count().await
    }
}
