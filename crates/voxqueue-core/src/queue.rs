//! The synthesis queue and its single-flight batch processor.
//!
//! Items move `queued → generating → done | error`. State is kept as a
//! sequence of immutable [`QueueItem`] snapshots inside a `watch` channel;
//! every transition replaces one snapshot, so observers never see a torn
//! item. Only one [`SpeechQueue::process_all`] may run at a time, and it
//! dispatches one request at a time.

use crate::error::{VoxqueueError, VoxqueueResult};
use crate::export;
use crate::gateway::SpeechGateway;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stable identifier of a queue item
pub type ItemId = Uuid;

/// Lifecycle status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the next batch
    Queued,
    /// Request in flight
    Generating,
    /// Audio available
    Done,
    /// Synthesis failed
    Error,
}

impl ItemStatus {
    /// Whether the item has reached `done` or `error`
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Generating => write!(f, "generating"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Immutable snapshot of one unit of work.
///
/// Audio is present only when `done` and the error only when `error`; the
/// transition methods are the only way to build the later states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    id: ItemId,
    text: Arc<str>,
    status: ItemStatus,
    generated_audio: Option<Arc<str>>,
    error: Option<String>,
}

impl QueueItem {
    fn new(text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: Arc::from(text),
            status: ItemStatus::Queued,
            generated_audio: None,
            error: None,
        }
    }

    fn generating(&self) -> Self {
        Self {
            status: ItemStatus::Generating,
            generated_audio: None,
            error: None,
            ..self.clone()
        }
    }

    fn done(&self, audio: String) -> Self {
        Self {
            status: ItemStatus::Done,
            generated_audio: Some(Arc::from(audio)),
            error: None,
            ..self.clone()
        }
    }

    fn failed(&self, message: String) -> Self {
        Self {
            status: ItemStatus::Error,
            generated_audio: None,
            error: Some(message),
            ..self.clone()
        }
    }

    /// Item identifier
    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    /// Submitted text, trimmed
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> ItemStatus {
        self.status
    }

    /// Base64 PCM payload, present iff `done`
    #[must_use]
    pub fn generated_audio(&self) -> Option<&str> {
        self.generated_audio.as_deref()
    }

    /// Failure description, present iff `error`
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Outcome counts of one [`SpeechQueue::process_all`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Requests sent to the gateway
    pub dispatched: usize,
    /// Items that reached `done`
    pub succeeded: usize,
    /// Items that reached `error`
    pub failed: usize,
    /// Results discarded because their item was removed mid-flight
    pub dropped: usize,
}

/// Ordered synthesis queue driving items through a [`SpeechGateway`]
pub struct SpeechQueue {
    gateway: Arc<dyn SpeechGateway>,
    items: watch::Sender<Vec<QueueItem>>,
    processing: AtomicBool,
}

/// Clears the processing flag when a batch ends, however it ends
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SpeechQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new(gateway: Arc<dyn SpeechGateway>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            gateway,
            items,
            processing: AtomicBool::new(false),
        }
    }

    /// Append a new `queued` item.
    ///
    /// Returns `None` and leaves the queue untouched for blank text.
    pub fn enqueue(&self, text: &str) -> Option<ItemId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let item = QueueItem::new(text);
        let id = item.id();
        self.items.send_modify(|items| items.push(item));
        debug!(%id, "Enqueued item");
        Some(id)
    }

    /// Remove an item whatever its status; returns whether it existed.
    ///
    /// Removing a `generating` item does not cancel its request; the late
    /// result is discarded.
    pub fn remove(&self, id: ItemId) -> bool {
        self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|item| item.id() != id);
            items.len() != before
        })
    }

    /// Remove every `done` and `error` item; returns how many went
    pub fn clear_finished(&self) -> usize {
        let mut removed = 0;
        self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|item| !item.status().is_finished());
            removed = before - items.len();
            removed > 0
        });
        removed
    }

    /// Snapshot of all items in queue order
    #[must_use]
    pub fn items(&self) -> Vec<QueueItem> {
        self.items.borrow().clone()
    }

    /// Snapshot of one item
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<QueueItem> {
        self.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Check whether the queue holds no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Receive every new snapshot of the queue
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<QueueItem>> {
        self.items.subscribe()
    }

    /// Whether a batch is running
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Whether any item is waiting to be processed
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.items
            .borrow()
            .iter()
            .any(|item| item.status() == ItemStatus::Queued)
    }

    /// Whether any item has audio to export
    #[must_use]
    pub fn has_completed(&self) -> bool {
        self.items
            .borrow()
            .iter()
            .any(|item| item.status() == ItemStatus::Done)
    }

    /// Synthesize every `queued` item, in order, one request at a time.
    ///
    /// The batch covers the items that were `queued` when it started. A
    /// failing item is recorded as `error` and the batch moves on.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank `voice_id` and a concurrency
    /// error if another batch is already running; in both cases no item is
    /// touched
    pub async fn process_all(&self, voice_id: &str) -> VoxqueueResult<BatchSummary> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(VoxqueueError::validation(
                "Select a voice before processing the queue",
            ));
        }

        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VoxqueueError::concurrency("The queue is already being processed"));
        }
        let _guard = ProcessingGuard(&self.processing);

        let pending: Vec<ItemId> = self
            .items
            .borrow()
            .iter()
            .filter(|item| item.status() == ItemStatus::Queued)
            .map(QueueItem::id)
            .collect();

        info!(voice = voice_id, pending = pending.len(), "Processing queue");
        let mut summary = BatchSummary::default();

        for id in pending {
            let Some(item) = self.transition(id, |item| {
                (item.status() == ItemStatus::Queued).then(|| item.generating())
            }) else {
                debug!(%id, "Item removed or no longer queued, skipping");
                continue;
            };

            summary.dispatched += 1;
            let result = self.gateway.synthesize(item.text(), voice_id).await;
            let succeeded = result.is_ok();

            let recorded = match result {
                Ok(audio) => self.transition(id, |current| Some(current.done(audio))),
                Err(e) => {
                    warn!(%id, error = %e, "Synthesis failed");
                    let message = match e.to_string() {
                        m if m.trim().is_empty() => "Unknown error".to_string(),
                        m => m,
                    };
                    self.transition(id, |current| Some(current.failed(message)))
                }
            };

            match (recorded, succeeded) {
                (None, _) => {
                    debug!(%id, "Item removed while generating, dropping result");
                    summary.dropped += 1;
                }
                (Some(_), true) => summary.succeeded += 1,
                (Some(_), false) => summary.failed += 1,
            }
        }

        info!(
            dispatched = summary.dispatched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Queue processing finished"
        );
        Ok(summary)
    }

    /// Zip every `done` item as `audio_<k>.wav`, `k` counting from 1 in
    /// queue order. Returns `None` when nothing is `done`.
    ///
    /// # Errors
    ///
    /// Returns a decode error for a malformed payload or an archive error if
    /// zip encoding fails; the queue is left untouched
    pub async fn export_all(&self) -> VoxqueueResult<Option<Vec<u8>>> {
        let payloads: Vec<Arc<str>> = self
            .items
            .borrow()
            .iter()
            .filter_map(|item| item.generated_audio.clone())
            .collect();

        if payloads.is_empty() {
            return Ok(None);
        }

        let archive = tokio::task::spawn_blocking(move || export::build_archive(&payloads)).await??;
        Ok(Some(archive))
    }

    /// Replace the snapshot of item `id` with `next(current)`.
    ///
    /// Returns the new snapshot, or `None` if the item no longer exists or
    /// `next` declined the transition.
    fn transition<F>(&self, id: ItemId, next: F) -> Option<QueueItem>
    where
        F: FnOnce(&QueueItem) -> Option<QueueItem>,
    {
        let mut updated = None;
        self.items.send_if_modified(|items| {
            let Some(slot) = items.iter_mut().find(|item| item.id() == id) else {
                return false;
            };
            match next(slot) {
                Some(item) => {
                    *slot = item.clone();
                    updated = Some(item);
                    true
                }
                None => false,
            }
        });
        updated
    }
}

impl std::fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("items", &self.len())
            .field("processing", &self.is_processing())
            .finish_non_exhaustive()
    }
}
