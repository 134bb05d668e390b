//! # Confab
//!
//! Asynchronous conversation orchestration for remote "assistant run"
//! providers: conversation lifecycle, run polling with timeout and
//! cancellation, an offline message queue with replay, paginated history,
//! and bounded TTL+LRU caches in front of slow upstreams.
//!
//! ## Overview
//!
//! Confab drives a conversation against a provider that answers
//! asynchronously — post a message, start a run, poll until it completes,
//! re-fetch the messages. Around that loop it provides:
//!
//! - **Optimistic sends**: the user's message shows immediately and is
//!   reconciled against the authoritative list after the run completes
//! - **Offline tolerance**: messages sent during a connectivity loss are
//!   queued durably and replayed in order on reconnect
//! - **Bounded caching**: recent message pages, web-search results and
//!   synthesized audio each sit behind a capacity/TTL-bounded cache
//! - **Recovery paths**: cancellable polling, thread reset and a
//!   force-reset for stuck sessions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use confab::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Arc::new(HttpGateway::new(
//!         GatewayConfig::new("https://assistant.example.com/api/assistant")
//!             .with_api_key(std::env::var("ASSISTANT_API_KEY")?),
//!     )?);
//!     let store = Arc::new(JsonFileStore::new(".confab-state")?);
//!
//!     let session = ConversationSession::new(
//!         gateway,
//!         store,
//!         SessionConfig::new().with_system_prompt("You are a helpful business assistant."),
//!     );
//!
//!     session.initialize().await?;
//!     session
//!         .send_message("Draft a follow-up email for yesterday's lead.")
//!         .await?;
//!
//!     for message in session.state().messages {
//!         println!("{}: {}", message.role.as_str(), message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Confab is organized into focused crates:
//!
//! - **`confab-types`**: core data model and configuration
//! - **`confab-cache`**: generic size- and time-bounded cache
//! - **`confab-provider`**: gateway trait, HTTP implementation, cached
//!   search and speech clients
//! - **`confab-session`**: session manager, run poller, offline queue and
//!   durable client state

pub mod prelude;

pub use confab_types::{
    CachePolicy, Delivery, Message, MessageId, MessageRole, PollConfig, QueuedMessage, Run, RunId,
    RunStatus, SessionConfig, ThreadId,
};

pub use confab_cache::BoundedCache;

pub use confab_provider::{
    AssistantGateway, AudioClip, CachedSearchClient, CachedSpeechClient, GatewayConfig,
    HttpGateway, ProviderError, SearchBackend, SearchClient, SearchQuery, SearchResponse,
    SearchResult, SpeechBackend, SpeechClient, SpeechRequest,
};

pub use confab_session::{
    ConversationSession, JsonFileStore, MemoryStore, OfflineQueue, PollError, PollHandle,
    RunPoller, SendOutcome, SessionError, SessionSnapshot, SessionStore, StoreError,
};
