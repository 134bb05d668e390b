//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use confab::prelude::*;
//! ```

pub use crate::{
    AssistantGateway, BoundedCache, CachePolicy, CachedSearchClient, CachedSpeechClient,
    ConversationSession, GatewayConfig, HttpGateway, JsonFileStore, MemoryStore, Message,
    MessageRole, PollConfig, ProviderError, RunPoller, RunStatus, SearchClient, SearchQuery,
    SendOutcome, SessionConfig, SessionError, SessionSnapshot, SessionStore, SpeechClient,
    SpeechRequest, ThreadId,
};
