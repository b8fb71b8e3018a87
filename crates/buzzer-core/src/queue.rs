//! Bounded FIFO hand-off between submitters and the arbitration loop.
//!
//! Built on [`tokio::sync::mpsc`]. Producers only ever call the
//! non-blocking [`EventQueue::try_enqueue`]; when it refuses a record the
//! record comes back to the caller inside the error, so the engine can
//! arbitrate it inline instead of dropping it.
//!
//! Records that were accepted are delivered in enqueue order. A record
//! that bypassed the queue has no ordering relationship with records
//! already waiting in it.

use buzzer_types::Submission;
use tokio::sync::{mpsc, oneshot};

/// An item travelling through the queue.
#[derive(Debug)]
pub(crate) enum QueueItem {
    /// A submission awaiting arbitration.
    Submission(Submission),
    /// FIFO barrier: acknowledged once every earlier item was consumed.
    Barrier(oneshot::Sender<()>),
}

/// Why [`EventQueue::try_enqueue`] refused a record.
///
/// Both variants hand the record back.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// Every slot is taken.
    #[error("event queue is full")]
    Full(Submission),
    /// The arbitration loop has stopped.
    #[error("event queue is closed")]
    Closed(Submission),
}

impl EnqueueError {
    /// Recover the refused record.
    pub fn into_inner(self) -> Submission {
        match self {
            Self::Full(record) | Self::Closed(record) => record,
        }
    }

    /// Short label for logs.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Full(_) => "queue_full",
            Self::Closed(_) => "queue_closed",
        }
    }
}

/// Producer half of the event queue.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<QueueItem>,
}

impl EventQueue {
    /// Create a queue with `capacity` slots (clamped to at least one) and
    /// return it with the consumer half.
    pub(crate) fn bounded(capacity: usize) -> (Self, mpsc::Receiver<QueueItem>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Offer a record without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::Full`] when every slot is taken and
    /// [`EnqueueError::Closed`] when the consumer is gone. The record is
    /// returned in both cases.
    pub fn try_enqueue(&self, record: Submission) -> Result<(), EnqueueError> {
        match self.tx.try_reserve() {
            Ok(permit) => {
                permit.send(QueueItem::Submission(record));
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(())) => Err(EnqueueError::Full(record)),
            Err(mpsc::error::TrySendError::Closed(())) => Err(EnqueueError::Closed(record)),
        }
    }

    /// Place a barrier behind everything currently queued, waiting for a
    /// free slot if needed. Returns the acknowledgement receiver, or `None`
    /// if the consumer is gone.
    pub(crate) async fn barrier(&self) -> Option<oneshot::Receiver<()>> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send(QueueItem::Barrier(ack_tx)).await.ok()?;
        Some(ack_rx)
    }

    /// Number of items currently waiting.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity().saturating_sub(self.tx.capacity())
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the consumer half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
