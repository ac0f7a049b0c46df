use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{CompletionError, TextCompletion};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Clone)]
/// Public struct `ChatCompletionsConfig` used across triage components.
pub struct ChatCompletionsConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// OpenAI-compatible chat-completions client, as exposed by LiteLLM proxies.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
        {
            let bearer = format!("Bearer {api_key}");
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&bearer).map_err(|e| {
                    CompletionError::InvalidResponse(format!("invalid API key header: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim();
        if base.contains(CHAT_COMPLETIONS_PATH) {
            return base.to_string();
        }

        format!("{}{CHAT_COMPLETIONS_PATH}", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextCompletion for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = build_chat_request_body(&self.config.model, prompt);
        let url = self.chat_completions_url();
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "requesting chat completion"
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        parse_chat_response(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    #[serde(default)]
    message: String,
}

fn build_chat_request_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "stream": false,
    })
}

fn parse_chat_response(raw: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponseBody = serde_json::from_str(raw)?;
    if let Some(error) = parsed.error {
        return Err(CompletionError::Provider(error.message));
    }
    let choice =
        parsed.choices.into_iter().next().ok_or_else(|| {
            CompletionError::InvalidResponse("response contained no choices".to_string())
        })?;
    Ok(choice.message.content.unwrap_or_default())
}
