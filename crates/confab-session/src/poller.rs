//! Drives a started run to a terminal state by repeated status checks.
//!
//! The poll loop is the only source-of-truth timeout boundary in the
//! subsystem: exceeding `max_wait` resolves `Timeout` even though the run
//! may still complete server-side later.

use std::sync::Arc;

use confab_provider::{AssistantGateway, ProviderError};
use confab_types::{PollConfig, RunId, RunStatus, ThreadId};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum PollError {
    /// The run reached a failure terminal (`failed`, `cancelled`, `expired`).
    #[error("run ended with status {0}")]
    Run(RunStatus),

    /// Client gave up waiting; the run may still be running server-side.
    #[error("gave up waiting for the run to complete")]
    Timeout,

    #[error("polling was cancelled")]
    Cancelled,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct RunPoller {
    config: PollConfig,
}

impl RunPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Poll on a fixed interval until a terminal status or the deadline.
    ///
    /// The deadline is checked before each status call, so a max wait of
    /// `n` intervals issues at most `n` polls.
    pub async fn poll(
        &self,
        gateway: &dyn AssistantGateway,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<(), PollError> {
        let deadline = Instant::now() + self.config.max_wait;
        loop {
            if Instant::now() >= deadline {
                tracing::warn!(%run_id, "gave up polling run");
                return Err(PollError::Timeout);
            }
            let status = gateway.poll_run_status(thread_id, run_id).await?;
            if status.is_success() {
                return Ok(());
            }
            if status.is_terminal() {
                return Err(PollError::Run(status));
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Spawn the poll loop as a cancellable task.
    ///
    /// Cancellation (or dropping the handle) stops the loop between status
    /// calls; no success or failure path runs afterwards.
    pub fn spawn(
        gateway: Arc<dyn AssistantGateway>,
        thread_id: ThreadId,
        run_id: RunId,
        config: PollConfig,
    ) -> PollHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let poller = RunPoller::new(config);
            tokio::select! {
                _ = cancel_rx.wait_for(|cancelled| *cancelled) => Err(PollError::Cancelled),
                result = poller.poll(gateway.as_ref(), &thread_id, &run_id) => result,
            }
        });
        PollHandle {
            cancel: Arc::new(cancel_tx),
            task,
        }
    }
}

/// Owning handle for one spawned poll loop.
pub struct PollHandle {
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<Result<(), PollError>>,
}

impl PollHandle {
    /// Stop the loop. Safe to call any number of times, including after
    /// the loop already finished.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Detached cancellation token for this loop, usable while `wait` owns
    /// the handle.
    pub fn cancellation(&self) -> PollCancellation {
        PollCancellation {
            cancel: Arc::clone(&self.cancel),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<(), PollError> {
        match self.task.await {
            Ok(result) => result,
            // task aborted or panicked; treat as cancelled
            Err(_) => Err(PollError::Cancelled),
        }
    }
}

#[derive(Clone)]
pub struct PollCancellation {
    cancel: Arc<watch::Sender<bool>>,
}

impl PollCancellation {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}
