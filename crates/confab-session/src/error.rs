use confab_provider::ProviderError;
use confab_types::RunStatus;
use thiserror::Error;

use crate::poller::PollError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Thread creation failed during startup; no conversation is possible
    /// until the user retries.
    #[error("failed to initialize conversation: {0}")]
    Init(#[source] ProviderError),

    #[error("conversation thread no longer exists")]
    ThreadNotFound,

    /// The asynchronous job reached a failure terminal.
    #[error("assistant run ended with status {0}")]
    RunFailed(RunStatus),

    /// Distinct from `RunFailed`: the job may still complete server-side.
    #[error("timed out waiting for the assistant")]
    PollingTimeout,

    #[error("a previous message is still being processed")]
    StillProcessing,

    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Human-readable status line distinguishing the recovery action —
    /// never a raw error message.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Init(_) => "Failed to start the conversation. Please try again.",
            Self::ThreadNotFound => {
                "This conversation is no longer available. Please start a new conversation."
            }
            Self::RunFailed(RunStatus::Expired) => {
                "The request expired before the assistant could reply. Please try again."
            }
            Self::RunFailed(RunStatus::Cancelled) => {
                "The reply was cancelled. Please send your message again."
            }
            Self::RunFailed(_) => "The assistant could not process your message. Please try again.",
            Self::PollingTimeout => {
                "The assistant is taking longer than expected. Please wait a moment and try again."
            }
            Self::StillProcessing => "Please wait, the previous message is still being processed.",
            Self::EmptyMessage => "Please enter a message.",
            Self::Provider(err) if err.is_connectivity() => {
                "You appear to be offline. Your message will be sent when you reconnect."
            }
            Self::Provider(ProviderError::Busy) => {
                "Please wait, the previous message is still being processed."
            }
            Self::Provider(_) => "Something went wrong. Please try again.",
            Self::Store(_) => "Could not access local conversation storage. Please try again.",
        }
    }
}

impl From<PollError> for SessionError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Run(status) => Self::RunFailed(status),
            PollError::Timeout => Self::PollingTimeout,
            PollError::Cancelled => Self::RunFailed(RunStatus::Cancelled),
            PollError::Provider(err) => Self::Provider(err),
        }
    }
}
