//! OpenAI Chat Completions API client.
//!
//! Non-streaming implementation of [`GenerationService`] for
//! `/v1/chat/completions`. Requests carry a bounded timeout and are retried
//! once on transient network failure.

use std::time::Duration;

use anyhow::Context;

use super::{ChatRequest, Completion, GenerationService, LlmSettings, ToolCall};

/// Per-request timeout for the remote model.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for OpenAI-compatible chat completion endpoints.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Create a new client with the given settings.
    ///
    /// # Errors
    ///
    /// Fails when the underlying HTTP client cannot be constructed; a client
    /// without the bounded timeout is never handed out.
    pub fn new(settings: LlmSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, settings })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn send(&self, body: &serde_json::Value) -> reqwest::Result<serde_json::Value> {
        let mut rb = self.http.post(self.chat_url()).json(body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }
        rb.send().await?.error_for_status()?.json().await
    }
}

/// Whether a request failure is worth a single retry.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[async_trait::async_trait]
impl GenerationService for ChatCompletionsClient {
    async fn complete(&self, req: ChatRequest) -> anyhow::Result<Completion> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": req.messages,
            "tools": if req.tools.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::Array(req.tools)
            }
        });

        let v = match self.send(&body).await {
            Ok(v) => v,
            Err(e) if is_transient(&e) => {
                tracing::warn!(error = %e, "Transient generation failure, retrying once");
                self.send(&body).await.context("generation retry failed")?
            }
            Err(e) => return Err(e).context("generation request failed"),
        };

        let message = &v["choices"][0]["message"];
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(ToString::to_string);
        let tool_calls: Vec<ToolCall> = message
            .get("tool_calls")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .context("malformed tool_calls in completion")?
            .unwrap_or_default();

        Ok(Completion {
            content,
            tool_calls,
        })
    }
}
