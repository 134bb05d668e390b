use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use confab_provider::AssistantGateway;
use confab_types::{MessageRole, QueuedMessage};

use crate::storage::{SessionStore, StoreError};

/// Durable FIFO queue of user messages that could not be dispatched.
///
/// Messages land here only on a detected connectivity loss; provider-level
/// failures such as `ThreadNotFound` are not retryable and never enqueue.
pub struct OfflineQueue {
    store: Arc<dyn SessionStore>,
    draining: AtomicBool,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            draining: AtomicBool::new(false),
        }
    }

    pub fn enqueue(&self, message: QueuedMessage) -> Result<(), StoreError> {
        let mut pending = self.store.load_queue()?;
        pending.push(message);
        self.store.save_queue(&pending)?;
        tracing::info!(queued = pending.len(), "message held for replay");
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.store.load_queue()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.store.load_queue()?.is_empty())
    }

    /// Replay every queued message in FIFO order.
    ///
    /// The persisted list shrinks after each successful dispatch, so an
    /// interrupted drain never re-sends the already-delivered prefix. The
    /// first dispatch failure stops the cycle with the failed message and
    /// everything after it still queued; `Ok(true)` means the queue
    /// emptied. Re-entrant calls are suppressed.
    pub async fn drain(&self, gateway: &dyn AssistantGateway) -> Result<bool, StoreError> {
        if self.draining.swap(true, Ordering::SeqCst) {
            tracing::debug!("drain already in progress, skipping");
            return Ok(false);
        }
        let result = self.drain_pending(gateway).await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_pending(&self, gateway: &dyn AssistantGateway) -> Result<bool, StoreError> {
        let mut pending = self.store.load_queue()?;
        while let Some(message) = pending.first().cloned() {
            match Self::dispatch(gateway, &message).await {
                Ok(()) => {
                    pending.remove(0);
                    self.store.save_queue(&pending)?;
                }
                Err(err) => {
                    tracing::warn!(
                        remaining = pending.len(),
                        error = %err,
                        "queue drain stopped on dispatch failure"
                    );
                    return Ok(false);
                }
            }
        }
        tracing::info!("offline queue drained");
        Ok(true)
    }

    async fn dispatch(
        gateway: &dyn AssistantGateway,
        message: &QueuedMessage,
    ) -> confab_provider::Result<()> {
        gateway
            .post_message(&message.thread_id, &message.content, MessageRole::User)
            .await?;
        gateway.start_run(&message.thread_id).await?;
        Ok(())
    }
}
