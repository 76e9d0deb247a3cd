//! Claude API client.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::ClaudeConfig;

use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, ChatResponse, Message, Tool, ToolChoice};

const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Claude API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
    messages_url: String,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::Setup` if the API key is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let api_key = config.api_key.expose_secret();

        let mut key_header = HeaderValue::from_str(api_key)
            .map_err(|_| ClaudeError::Setup("API key is not a valid header value".to_string()))?;
        key_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", key_header);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClaudeError::Setup(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
                messages_url: format!("{}{MESSAGES_PATH}", config.api_url),
            }),
        })
    }

    /// Send a chat request and get a complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, tools), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
        tool_choice: Option<ToolChoice>,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
            tools,
            tool_choice,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.messages_url)
            .json(&request)
            .send()
            .await?;

        let chat = Self::handle_response(response).await?;
        tracing::debug!(
            response_id = %chat.id,
            input_tokens = chat.usage.input_tokens,
            output_tokens = chat.usage.output_tokens,
            "Claude response received"
        );
        Ok(chat)
    }

    /// Force a single call to `tool` and decode its input as `T`.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::MissingToolUse` if the model did not call the
    /// tool, `ClaudeError::Parse` if the input does not match `T`, or any
    /// transport/API error from [`Self::chat`].
    pub async fn call_tool<T: DeserializeOwned>(
        &self,
        prompt: String,
        tool: Tool,
    ) -> Result<T, ClaudeError> {
        let name = tool.name.clone();
        let response = self
            .chat(
                vec![Message::user(prompt)],
                None,
                Some(vec![tool]),
                Some(ToolChoice::Tool { name: name.clone() }),
            )
            .await?;

        let input = response
            .tool_input(&name)
            .ok_or_else(|| ClaudeError::MissingToolUse(name.clone()))?;
        T::deserialize(input)
            .map_err(|e| ClaudeError::Parse(format!("Invalid {name} input: {e}")))
    }

    /// Handle a response, decoding the body or the error.
    async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, ClaudeError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClaudeError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClaudeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ClaudeError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ClaudeError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body).map_or_else(
                |_| ClaudeError::Api {
                    error_type: "unknown".to_string(),
                    message: body.clone(),
                },
                |api_error| ClaudeError::Api {
                    error_type: api_error.error.error_type,
                    message: api_error.error.message,
                },
            ),
            Err(e) => ClaudeError::Http(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<ClaudeClient>();
    }

    #[test]
    fn test_claude_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClaudeClient>();
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let config = ClaudeConfig {
            api_key: secrecy::SecretString::from("bad\nkey"),
            model: "m".to_string(),
            api_url: "http://localhost".to_string(),
        };
        assert!(matches!(
            ClaudeClient::new(&config),
            Err(ClaudeError::Setup(_))
        ));
    }
}
