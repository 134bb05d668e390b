//! Top-level conversation orchestrator: the only component the UI talks
//! to. Owns thread identity, message list state and the pagination cursor,
//! and coordinates the gateway, poller, offline queue and message cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use confab_cache::BoundedCache;
use confab_provider::{AssistantGateway, ProviderError};
use confab_types::{
    Delivery, Message, MessageId, MessageRole, QueuedMessage, SessionConfig, ThreadId,
};

use crate::error::SessionError;
use crate::poller::{PollCancellation, RunPoller};
use crate::queue::OfflineQueue;
use crate::storage::SessionStore;

/// How a `send_message` call ended up leaving the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Dispatched, run completed, state refreshed.
    Delivered,
    /// Connectivity loss detected; held in the offline queue for replay.
    Queued,
}

/// Clone of the observable session state for the UI layer.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub thread_id: Option<ThreadId>,
    /// Display order: newest-last.
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
    pub is_online: bool,
}

struct SessionState {
    thread_id: Option<ThreadId>,
    messages: Vec<Message>,
    is_loading: bool,
    error: Option<String>,
    has_more: bool,
    is_online: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            thread_id: None,
            messages: Vec::new(),
            is_loading: false,
            error: None,
            has_more: false,
            is_online: true,
        }
    }
}

pub struct ConversationSession {
    gateway: Arc<dyn AssistantGateway>,
    store: Arc<dyn SessionStore>,
    queue: OfflineQueue,
    message_cache: BoundedCache<ThreadId, Vec<Message>>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    /// Explicit "active run" flag: at most one run may be in flight per
    /// session, and a second send must not race the first.
    run_in_flight: AtomicBool,
    active_poll: Mutex<Option<PollCancellation>>,
}

impl ConversationSession {
    pub fn new(
        gateway: Arc<dyn AssistantGateway>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        let message_cache =
            BoundedCache::new(config.message_cache.capacity, config.message_cache.ttl);
        Self {
            gateway,
            queue: OfflineQueue::new(Arc::clone(&store)),
            store,
            message_cache,
            config,
            state: Mutex::new(SessionState::new()),
            run_in_flight: AtomicBool::new(false),
            active_poll: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            thread_id: state.thread_id.clone(),
            messages: state.messages.clone(),
            is_loading: state.is_loading,
            error: state.error.clone(),
            has_more: state.has_more,
            is_online: state.is_online,
        }
    }

    /// Resume the stored conversation or create a fresh one.
    ///
    /// Failure to create a thread is fatal (no conversation is possible);
    /// failure to fetch messages for an existing thread is recoverable and
    /// falls back to an empty list plus an error banner.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        match self.store.load_thread_id()? {
            Some(thread_id) => {
                self.lock_state().thread_id = Some(thread_id.clone());
                if let Err(err) = self.load_first_page(&thread_id).await {
                    tracing::warn!(%thread_id, error = %err, "failed to load stored thread");
                    let mut state = self.lock_state();
                    state.messages.clear();
                    state.has_more = false;
                    state.error = Some(err.user_message().to_owned());
                }
            }
            None => {
                let thread_id = self
                    .gateway
                    .create_thread()
                    .await
                    .map_err(SessionError::Init)?;
                self.seed_system_prompt(&thread_id).await;
                self.store.save_thread_id(&thread_id)?;
                self.lock_state().thread_id = Some(thread_id);
            }
        }

        // opportunistic replay of messages queued before the last restart
        if self.lock_state().is_online && !self.queue.is_empty()? {
            let _ = self.queue.drain(self.gateway.as_ref()).await?;
        }
        Ok(())
    }

    /// Optimistically append the user's message, dispatch it, drive the
    /// run to completion and reconcile local state from the provider.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let thread_id = self
            .lock_state()
            .thread_id
            .clone()
            .ok_or(SessionError::ThreadNotFound)?;

        if self.run_in_flight.swap(true, Ordering::SeqCst) {
            return Err(SessionError::StillProcessing);
        }
        let _guard = RunFlagGuard(&self.run_in_flight);

        let optimistic = Message::optimistic(text);
        {
            let mut state = self.lock_state();
            state.messages.push(optimistic.clone());
            state.is_loading = true;
            state.error = None;
        }

        if !self.lock_state().is_online {
            return self.hold_for_replay(&thread_id, text, &optimistic.id);
        }

        if let Err(err) = self
            .gateway
            .post_message(&thread_id, text, MessageRole::User)
            .await
        {
            return self.handle_dispatch_failure(err, &thread_id, text, &optimistic.id);
        }
        // the cached first page is stale from here on
        self.message_cache.remove(&thread_id);

        let run_id = match self.gateway.start_run(&thread_id).await {
            Ok(run_id) => run_id,
            Err(err) => {
                return self.handle_dispatch_failure(err, &thread_id, text, &optimistic.id)
            }
        };

        let handle = RunPoller::spawn(
            Arc::clone(&self.gateway),
            thread_id.clone(),
            run_id,
            self.config.poll,
        );
        *self.lock_active_poll() = Some(handle.cancellation());
        let poll_result = handle.wait().await;
        self.lock_active_poll().take();

        match poll_result {
            Ok(()) => {
                if let Err(err) = self.refresh_from_provider(&thread_id).await {
                    // delivered, but the refetch failed; keep the entry
                    let mut state = self.lock_state();
                    mark_delivery(&mut state.messages, &optimistic.id, Delivery::Confirmed);
                    state.is_loading = false;
                    state.error = Some(err.user_message().to_owned());
                }
                Ok(SendOutcome::Delivered)
            }
            Err(poll_err) => {
                if let crate::poller::PollError::Provider(provider_err) = &poll_err {
                    if provider_err.is_connectivity() {
                        // already posted; do not queue a duplicate
                        self.lock_state().is_online = false;
                    }
                }
                let err: SessionError = poll_err.into();
                let mut state = self.lock_state();
                mark_delivery(&mut state.messages, &optimistic.id, Delivery::Failed);
                state.is_loading = false;
                state.error = Some(err.user_message().to_owned());
                Err(err)
            }
        }
    }

    /// Abandon the current thread and start over on a brand-new one.
    ///
    /// Returns whether the optional welcome round-trip fully completed;
    /// the reset itself succeeds either way.
    pub async fn reset_thread(&self, welcome: Option<&str>) -> Result<bool, SessionError> {
        let thread_id = self
            .gateway
            .create_thread()
            .await
            .map_err(SessionError::Init)?;
        self.seed_system_prompt(&thread_id).await;
        self.store.save_thread_id(&thread_id)?;

        let old = {
            let mut state = self.lock_state();
            let old = state.thread_id.replace(thread_id.clone());
            state.messages.clear();
            state.has_more = false;
            state.is_loading = false;
            state.error = None;
            old
        };
        if let Some(old) = old {
            self.message_cache.remove(&old);
        }

        let mut welcomed = true;
        if let Some(text) = welcome {
            welcomed = self.seed_welcome(&thread_id, text).await;
        }
        Ok(welcomed)
    }

    /// Recovery path for a stuck session: abandon any in-flight poll loop
    /// and reset the thread. Queued offline messages are left untouched.
    pub async fn force_reset(&self) -> Result<(), SessionError> {
        if let Some(cancellation) = self.lock_active_poll().take() {
            cancellation.cancel();
        }
        let welcome = self.config.welcome_message.clone();
        self.reset_thread(welcome.as_deref()).await?;
        Ok(())
    }

    /// Fetch the page before the oldest loaded message.
    ///
    /// A failure fails only this gesture; already-displayed messages are
    /// left intact.
    pub async fn load_more_messages(&self) -> Result<(), SessionError> {
        let (thread_id, cursor, has_more) = {
            let state = self.lock_state();
            (
                state.thread_id.clone(),
                state.messages.first().map(|message| message.id.clone()),
                state.has_more,
            )
        };
        let Some(thread_id) = thread_id else {
            return Ok(());
        };
        if !has_more {
            return Ok(());
        }

        match self
            .gateway
            .list_messages(&thread_id, self.config.page_size, cursor.as_ref())
            .await
        {
            Ok(older) => {
                let has_more = older.len() == self.config.page_size;
                let mut page = older;
                page.reverse();
                let mut state = self.lock_state();
                page.append(&mut state.messages);
                state.messages = page;
                state.has_more = has_more;
                Ok(())
            }
            Err(err) => {
                let err = lift_thread_errors(err);
                self.lock_state().error = Some(err.user_message().to_owned());
                Err(err)
            }
        }
    }

    /// Record a connectivity transition. Coming back online drains the
    /// offline queue and invalidates the now-stale cached first page.
    pub async fn set_online(&self, online: bool) -> Result<(), SessionError> {
        let was_online = {
            let mut state = self.lock_state();
            std::mem::replace(&mut state.is_online, online)
        };
        if online && !was_online {
            tracing::info!("connectivity restored, draining offline queue");
            let drained = self.queue.drain(self.gateway.as_ref()).await?;
            if drained {
                let thread_id = self.lock_state().thread_id.clone();
                if let Some(thread_id) = thread_id {
                    self.message_cache.remove(&thread_id);
                }
                self.lock_state().error = None;
            }
        }
        Ok(())
    }

    pub fn queued_message_count(&self) -> Result<usize, SessionError> {
        Ok(self.queue.len()?)
    }

    /// First page, through the message cache; a hit never touches the
    /// network.
    async fn load_first_page(&self, thread_id: &ThreadId) -> Result<(), SessionError> {
        let page = match self.message_cache.get(thread_id) {
            Some(cached) => cached,
            None => {
                let fetched = self
                    .gateway
                    .list_messages(thread_id, self.config.page_size, None)
                    .await
                    .map_err(lift_thread_errors)?;
                self.message_cache.insert(thread_id.clone(), fetched.clone());
                fetched
            }
        };
        self.install_first_page(thread_id, page);
        Ok(())
    }

    /// Authoritative re-fetch after a completed run; bypasses the cache
    /// and repopulates it.
    async fn refresh_from_provider(&self, thread_id: &ThreadId) -> Result<(), SessionError> {
        let fetched = self
            .gateway
            .list_messages(thread_id, self.config.page_size, None)
            .await
            .map_err(lift_thread_errors)?;
        self.message_cache.insert(thread_id.clone(), fetched.clone());
        self.install_first_page(thread_id, fetched);
        Ok(())
    }

    /// Replace local state wholesale with a provider page (newest-first),
    /// reconciling any optimistic entries. Ignored if the session has
    /// moved to another thread meanwhile.
    fn install_first_page(&self, thread_id: &ThreadId, page: Vec<Message>) {
        let has_more = page.len() == self.config.page_size;
        let mut display = page;
        display.reverse();

        let mut state = self.lock_state();
        if state.thread_id.as_ref() != Some(thread_id) {
            tracing::debug!(%thread_id, "dropping page for abandoned thread");
            return;
        }
        state.messages = display;
        state.has_more = has_more;
        state.is_loading = false;
        state.error = None;
    }

    async fn seed_system_prompt(&self, thread_id: &ThreadId) {
        if let Some(prompt) = &self.config.system_prompt {
            // a failed seed is not fatal; the thread is still usable
            if let Err(err) = self
                .gateway
                .post_message(thread_id, prompt, MessageRole::System)
                .await
            {
                tracing::warn!(%thread_id, error = %err, "failed to seed system prompt");
            }
        }
    }

    async fn seed_welcome(&self, thread_id: &ThreadId, text: &str) -> bool {
        let result: Result<(), SessionError> = async {
            self.gateway
                .post_message(thread_id, text, MessageRole::User)
                .await
                .map_err(lift_thread_errors)?;
            let run_id = self
                .gateway
                .start_run(thread_id)
                .await
                .map_err(lift_thread_errors)?;
            RunPoller::new(self.config.poll)
                .poll(self.gateway.as_ref(), thread_id, &run_id)
                .await?;
            self.refresh_from_provider(thread_id).await
        }
        .await;

        if let Err(err) = result {
            tracing::warn!(%thread_id, error = %err, "welcome message seeding failed");
            return false;
        }
        true
    }

    fn hold_for_replay(
        &self,
        thread_id: &ThreadId,
        text: &str,
        optimistic_id: &MessageId,
    ) -> Result<SendOutcome, SessionError> {
        self.queue
            .enqueue(QueuedMessage::new(thread_id.clone(), text))?;
        let mut state = self.lock_state();
        mark_delivery(&mut state.messages, optimistic_id, Delivery::Queued);
        state.is_loading = false;
        state.error = Some(OFFLINE_NOTICE.to_owned());
        Ok(SendOutcome::Queued)
    }

    fn handle_dispatch_failure(
        &self,
        err: ProviderError,
        thread_id: &ThreadId,
        text: &str,
        optimistic_id: &MessageId,
    ) -> Result<SendOutcome, SessionError> {
        if err.is_connectivity() {
            tracing::info!(%thread_id, "connectivity loss detected, queueing message");
            self.lock_state().is_online = false;
            return self.hold_for_replay(thread_id, text, optimistic_id);
        }

        let err = lift_thread_errors(err);
        let mut state = self.lock_state();
        mark_delivery(&mut state.messages, optimistic_id, Delivery::Failed);
        state.is_loading = false;
        state.error = Some(err.user_message().to_owned());
        Err(err)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_active_poll(&self) -> MutexGuard<'_, Option<PollCancellation>> {
        match self.active_poll.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

const OFFLINE_NOTICE: &str = "You're offline. Your message will be sent when you reconnect.";

fn lift_thread_errors(err: ProviderError) -> SessionError {
    match err {
        ProviderError::ThreadNotFound(_) => SessionError::ThreadNotFound,
        other => SessionError::Provider(other),
    }
}

fn mark_delivery(messages: &mut [Message], id: &MessageId, delivery: Delivery) {
    if let Some(message) = messages.iter_mut().find(|message| &message.id == id) {
        message.delivery = delivery;
    }
}

/// Clears the active-run flag on every exit path out of `send_message`.
struct RunFlagGuard<'a>(&'a AtomicBool);

impl Drop for RunFlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
