#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use confab_provider::{AssistantGateway, ProviderError, Result};
use confab_types::{Message, MessageId, MessageRole, RunId, RunStatus, ThreadId};

/// Scripted failure kinds the mock can produce on demand.
#[derive(Debug, Clone, Copy)]
pub enum FailKind {
    Offline,
    ThreadNotFound,
    Server,
}

impl FailKind {
    fn to_error(self, thread_id: &ThreadId) -> ProviderError {
        match self {
            FailKind::Offline => ProviderError::offline(),
            FailKind::ThreadNotFound => ProviderError::ThreadNotFound(thread_id.clone()),
            FailKind::Server => ProviderError::Rejected {
                status: 500,
                message: "server error".to_owned(),
            },
        }
    }
}

/// Hand-rolled scripted gateway: every operation counts its calls, and
/// per-call outcomes are driven by small front-consumed scripts.
#[derive(Default)]
pub struct MockGateway {
    pub create_calls: AtomicUsize,
    pub post_calls: AtomicUsize,
    pub run_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    /// Text of every successfully posted message, in order.
    pub posts: Mutex<Vec<String>>,
    /// `before` cursor of every list call, in order.
    pub befores: Mutex<Vec<Option<MessageId>>>,
    post_script: Mutex<VecDeque<Option<FailKind>>>,
    list_script: Mutex<VecDeque<Option<FailKind>>>,
    status_script: Mutex<VecDeque<RunStatus>>,
    pages: Mutex<VecDeque<Vec<Message>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome per upcoming `post_message` call; `None` means success.
    pub fn script_posts(&self, script: impl IntoIterator<Item = Option<FailKind>>) {
        self.post_script.lock().unwrap().extend(script);
    }

    /// Outcome per upcoming `list_messages` call; `None` means success.
    pub fn script_lists(&self, script: impl IntoIterator<Item = Option<FailKind>>) {
        self.list_script.lock().unwrap().extend(script);
    }

    /// Status per upcoming poll; the final entry repeats forever. An empty
    /// script reports `Completed` immediately.
    pub fn script_statuses(&self, script: impl IntoIterator<Item = RunStatus>) {
        self.status_script.lock().unwrap().extend(script);
    }

    /// Page returned by upcoming `list_messages` calls; the final page
    /// repeats. With no pages scripted, lists return an empty page.
    pub fn push_page(&self, page: Vec<Message>) {
        self.pages.lock().unwrap().push_back(page);
    }
}

#[async_trait]
impl AssistantGateway for MockGateway {
    async fn create_thread(&self) -> Result<ThreadId> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ThreadId::new(format!("thread_{n}")))
    }

    async fn post_message(
        &self,
        thread_id: &ThreadId,
        text: &str,
        _role: MessageRole,
    ) -> Result<()> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.post_script.lock().unwrap().pop_front().flatten();
        match outcome {
            Some(kind) => Err(kind.to_error(thread_id)),
            None => {
                self.posts.lock().unwrap().push(text.to_owned());
                Ok(())
            }
        }
    }

    async fn start_run(&self, _thread_id: &ThreadId) -> Result<RunId> {
        let n = self.run_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RunId::new(format!("run_{n}")))
    }

    async fn poll_run_status(&self, _thread_id: &ThreadId, _run_id: &RunId) -> Result<RunStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.status_script.lock().unwrap();
        let status = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().copied().unwrap_or(RunStatus::Completed)
        };
        Ok(status)
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        _limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<Message>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.befores.lock().unwrap().push(before.cloned());
        let outcome = self.list_script.lock().unwrap().pop_front().flatten();
        if let Some(kind) = outcome {
            return Err(kind.to_error(thread_id));
        }
        let mut pages = self.pages.lock().unwrap();
        let page = if pages.len() > 1 {
            pages.pop_front().unwrap()
        } else {
            pages.front().cloned().unwrap_or_default()
        };
        Ok(page)
    }
}
