pub mod error;
pub mod gateway;
pub mod http;
pub mod search;
pub mod speech;

pub use error::{ProviderError, Result};
pub use gateway::AssistantGateway;
pub use http::{GatewayConfig, HttpGateway};
pub use search::{
    CachedSearchClient, SearchBackend, SearchClient, SearchQuery, SearchResponse, SearchResult,
};
pub use speech::{AudioClip, CachedSpeechClient, SpeechBackend, SpeechClient, SpeechRequest};
