// HTTP gateway speaking the upstream's action-style JSON protocol.

use std::time::Duration;

use async_trait::async_trait;
use confab_types::{Message, MessageId, MessageRole, RunId, RunStatus, ThreadId};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ProviderError, Result};
use crate::gateway::AssistantGateway;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Gateway over a single assistant endpoint that multiplexes operations
/// through an `action` field in the request body.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ProviderError::Config("invalid API key format".to_owned()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ProviderError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    async fn call(&self, body: Value) -> Result<Value> {
        let response = self.http.post(&self.base_url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            });
        Err(classify_status(status.as_u16(), message))
    }
}

/// Map a non-success HTTP status to a structured error kind. The caller
/// resolves 404 to the id-specific not-found variant.
fn classify_status(status: u16, message: String) -> ProviderError {
    match status {
        429 => ProviderError::Busy,
        _ => ProviderError::Rejected { status, message },
    }
}

fn thread_not_found(err: ProviderError, thread_id: &ThreadId) -> ProviderError {
    match err {
        ProviderError::Rejected { status: 404, .. } => {
            ProviderError::ThreadNotFound(thread_id.clone())
        }
        other => other,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadEnvelope {
    thread_id: ThreadId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunEnvelope {
    run_id: RunId,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    status: RunStatus,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    messages: Vec<Message>,
}

#[async_trait]
impl AssistantGateway for HttpGateway {
    async fn create_thread(&self) -> Result<ThreadId> {
        let value = self.call(json!({ "action": "createThread" })).await?;
        let envelope: ThreadEnvelope = serde_json::from_value(value)?;
        tracing::debug!(thread_id = %envelope.thread_id, "created thread");
        Ok(envelope.thread_id)
    }

    async fn post_message(
        &self,
        thread_id: &ThreadId,
        text: &str,
        role: MessageRole,
    ) -> Result<()> {
        self.call(json!({
            "action": "postMessage",
            "threadId": thread_id,
            "message": text,
            "role": role,
        }))
        .await
        .map_err(|err| thread_not_found(err, thread_id))?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &ThreadId) -> Result<RunId> {
        let value = self
            .call(json!({ "action": "startRun", "threadId": thread_id }))
            .await
            .map_err(|err| thread_not_found(err, thread_id))?;
        let envelope: RunEnvelope = serde_json::from_value(value)?;
        Ok(envelope.run_id)
    }

    async fn poll_run_status(&self, thread_id: &ThreadId, run_id: &RunId) -> Result<RunStatus> {
        let value = self
            .call(json!({
                "action": "getRunStatus",
                "threadId": thread_id,
                "runId": run_id,
            }))
            .await
            .map_err(|err| match err {
                ProviderError::Rejected { status: 404, .. } => {
                    ProviderError::RunNotFound(run_id.clone())
                }
                other => other,
            })?;
        let envelope: StatusEnvelope = serde_json::from_value(value)?;
        Ok(envelope.status)
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<Message>> {
        let mut body = json!({
            "action": "getMessages",
            "threadId": thread_id,
            "limit": limit,
        });
        if let Some(before) = before {
            body["before"] = json!(before);
        }

        let value = self
            .call(body)
            .await
            .map_err(|err| thread_not_found(err, thread_id))?;
        let envelope: MessagesEnvelope = serde_json::from_value(value)?;
        Ok(envelope.messages)
    }
}
