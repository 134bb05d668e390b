use async_trait::async_trait;
use confab_types::{Message, MessageId, MessageRole, RunId, RunStatus, ThreadId};

use crate::error::Result;

/// The five operations the conversation layer needs from a remote
/// assistant-run provider. Payload shape is an implementation detail of
/// the concrete gateway.
///
/// All operations suspend on network I/O; one-shot calls surface transport
/// failure immediately, and run-status polling is time-boxed by the caller.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    /// Create a fresh server-side conversation context.
    async fn create_thread(&self) -> Result<ThreadId>;

    /// Append a message to the thread.
    ///
    /// Fails with `ThreadNotFound` when the provider has no record of the
    /// thread; that failure must not be retried.
    async fn post_message(&self, thread_id: &ThreadId, text: &str, role: MessageRole)
        -> Result<()>;

    /// Start an assistant run over the thread's accumulated messages.
    ///
    /// The provider cancels any other non-terminal run on the same thread
    /// before starting, so two jobs never run concurrently on one thread.
    async fn start_run(&self, thread_id: &ThreadId) -> Result<RunId>;

    /// Current status of a run. Idempotent and side-effect free.
    async fn poll_run_status(&self, thread_id: &ThreadId, run_id: &RunId) -> Result<RunStatus>;

    /// At most `limit` messages, newest-first. `before` excludes every
    /// message at or after the referenced one, enabling strict backward
    /// pagination.
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<Message>>;
}
