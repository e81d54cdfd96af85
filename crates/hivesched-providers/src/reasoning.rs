//! OpenAI-compatible reasoning-backend client.
//!
//! One struct handles chat completions against any endpoint speaking
//! the standard format; the agentic loop only ever sees the `Provider`
//! trait, so tests swap in a scripted backend.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use hivesched_core::config::ReasoningConfig;
use hivesched_core::error::{HiveError, Result};
use hivesched_core::traits::Provider;
use hivesched_core::types::{
    ChatMessage, FunctionCall, GenerateParams, ProviderResponse, ToolCall, ToolDefinition,
};

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
pub struct ReasoningClient {
    base_url: String,
    api_key: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

impl ReasoningClient {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: std::time::Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for ReasoningClient {
    fn name(&self) -> &str {
        "reasoning"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        if self.api_key.is_empty() {
            return Err(HiveError::ApiKeyMissing("reasoning".into()));
        }

        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "messages": serde_json::to_value(messages).unwrap_or_default(),
        });

        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        debug!(
            "Reasoning request: model={}, {} message(s), {} tool(s)",
            params.model,
            messages.len(),
            tools.len()
        );

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| HiveError::Provider(format!("connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HiveError::Provider(format!("API error {status}: {text}")));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| HiveError::Provider(format!("invalid response body: {e}")))?;

        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| HiveError::Provider("No choices in response".into()))?;

        let content = choice["message"]["content"].as_str().map(String::from);

        let tool_calls = if let Some(tc) = choice["message"]["tool_calls"].as_array() {
            tc.iter()
                .filter_map(|t| {
                    Some(ToolCall {
                        id: t["id"].as_str().unwrap_or("").to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: t["function"]["name"].as_str()?.to_string(),
                            arguments: t["function"]["arguments"].as_str()?.to_string(),
                        },
                    })
                })
                .collect()
        } else {
            vec![]
        };

        let finish_reason = choice["finish_reason"].as_str().map(String::from);
        debug!(
            "Reasoning response: finish_reason={finish_reason:?}, {} tool call(s)",
            tool_calls.len()
        );

        Ok(ProviderResponse {
            content,
            tool_calls,
            finish_reason,
        })
    }
}
