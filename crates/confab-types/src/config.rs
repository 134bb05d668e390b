use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing bounds for driving a run to a terminal state.
///
/// `max_wait` is a deliberate UX/latency bound: the run may still complete
/// server-side after the client gives up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Capacity and entry lifetime for one cache instance.
///
/// `ttl: None` disables age-based expiry; entries are then evicted purely
/// by capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CachePolicy {
    pub capacity: usize,
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self { capacity, ttl }
    }

    /// Recent assistant-message pages, keyed by thread id.
    pub fn messages() -> Self {
        Self::new(10, Some(Duration::from_secs(5 * 60)))
    }

    /// Web-search responses, keyed by query + pagination parameters.
    pub fn search_results() -> Self {
        Self::new(20, Some(Duration::from_secs(10 * 60)))
    }

    /// Synthesized speech; identical text/voice/rate/pitch never goes stale.
    pub fn audio() -> Self {
        Self::new(50, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Messages fetched per page; also the "there might be more" heuristic.
    pub page_size: usize,
    pub poll: PollConfig,
    /// Seeded into every new thread as a system message when set.
    pub system_prompt: Option<String>,
    /// Default greeting posted by `force_reset`.
    pub welcome_message: Option<String>,
    pub message_cache: CachePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            poll: PollConfig::default(),
            system_prompt: None,
            welcome_message: None,
            message_cache: CachePolicy::messages(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = Some(message.into());
        self
    }

    pub fn with_message_cache(mut self, policy: CachePolicy) -> Self {
        self.message_cache = policy;
        self
    }
}
