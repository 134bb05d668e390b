// Text-to-speech upstream. Synthesized audio for identical
// text/voice/rate/pitch never goes stale, so the cache has no TTL.

use async_trait::async_trait;
use confab_cache::BoundedCache;
use confab_types::CachePolicy;
use serde::Serialize;

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate: 1.0,
            pitch: 1.0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn cache_key(&self) -> String {
        format!("{}|{}|{:.2}|{:.2}", self.voice, self.text, self.rate, self.pitch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Seam between the cache wrapper and the concrete HTTP client.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioClip>;
}

pub struct SpeechClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SpeechClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ProviderError::Config(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SpeechBackend for SpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioClip> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: "speech synthesis failed".to_owned(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_owned();
        let bytes = response.bytes().await?.to_vec();
        Ok(AudioClip {
            bytes,
            content_type,
        })
    }
}

pub struct CachedSpeechClient<B = SpeechClient> {
    inner: B,
    cache: BoundedCache<String, AudioClip>,
}

impl<B: SpeechBackend> CachedSpeechClient<B> {
    pub fn new(inner: B, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache: BoundedCache::new(policy.capacity, policy.ttl),
        }
    }

    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioClip> {
        let key = request.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(voice = %request.voice, "speech cache hit");
            return Ok(hit);
        }
        let clip = self.inner.synthesize(request).await?;
        self.cache.insert(key, clip.clone());
        Ok(clip)
    }
}
