//! Dronebot channel — token-authenticated HTTP client for message
//! delivery, poll creation, error alerts, and role lookup.

use async_trait::async_trait;
use serde::Deserialize;

use hivesched_core::config::DronebotConfig;
use hivesched_core::error::{HiveError, Result};
use hivesched_core::traits::{Notifier, RoleDirectory};
use hivesched_core::types::{DeliveryReceipt, MessageRequest, PollRequest};

/// What dronebot echoes back for a delivery or poll request.
#[derive(Debug, Deserialize)]
struct BotResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleMembersResponse {
    #[serde(default)]
    members: Vec<String>,
}

/// Dronebot HTTP client.
pub struct DronebotClient {
    config: DronebotConfig,
    client: reqwest::Client,
}

impl DronebotClient {
    pub fn new(config: DronebotConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// POST a JSON body and parse the standard bot response envelope.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout_secs: u64,
    ) -> Result<BotResponse> {
        if self.config.api_token.is_empty() {
            return Err(HiveError::Channel("dronebot api_token not configured".into()));
        }

        let response = self
            .client
            .post(self.api_url(path))
            .header("X-Dronebot-Token", &self.config.api_token)
            .json(body)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| HiveError::Channel(format!("dronebot {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(HiveError::Channel(format!("HTTP {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| HiveError::Channel(format!("Invalid dronebot response: {e}")))
    }
}

#[async_trait]
impl Notifier for DronebotClient {
    async fn send_message(&self, req: &MessageRequest) -> Result<DeliveryReceipt> {
        let body = serde_json::to_value(req)
            .map_err(|e| HiveError::Channel(format!("serialize message request: {e}")))?;

        let resp = self
            .post_json("/task/execute", &body, self.config.send_timeout_secs)
            .await?;

        // Fire-and-forget semantics: acceptance is success; the bot may
        // or may not hand back a message id.
        if resp.success {
            Ok(DeliveryReceipt {
                message_id: resp.message_id,
            })
        } else {
            Err(HiveError::Channel(
                resp.error.unwrap_or_else(|| "dronebot rejected message".into()),
            ))
        }
    }

    async fn create_poll(&self, req: &PollRequest) -> Result<DeliveryReceipt> {
        let body = serde_json::to_value(req)
            .map_err(|e| HiveError::Channel(format!("serialize poll request: {e}")))?;

        let resp = self
            .post_json("/task/poll", &body, self.config.poll_timeout_secs)
            .await?;

        // Poll creation requires a positive ack, not merely HTTP 200.
        if !resp.success {
            return Err(HiveError::Channel(
                resp.error.unwrap_or_else(|| "Unknown poll error".into()),
            ));
        }
        tracing::info!(
            "📊 Poll created for task {}, message_id={:?}",
            req.task_id,
            resp.message_id
        );
        Ok(DeliveryReceipt {
            message_id: resp.message_id,
        })
    }

    async fn post_alert(&self, content: &str) -> Result<()> {
        let body = serde_json::json!({
            "channel": self.config.alert_channel,
            "content": content,
        });
        self.post_json("/task/error", &body, self.config.send_timeout_secs)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RoleDirectory for DronebotClient {
    async fn role_members(&self, role_name: &str) -> Result<Vec<String>> {
        if self.config.api_token.is_empty() {
            return Err(HiveError::Channel("dronebot api_token not configured".into()));
        }

        let body = serde_json::json!({
            "action": "get_role_members",
            "role_name": role_name,
        });

        let response = self
            .client
            .post(self.api_url("/roles/members"))
            .header("X-Dronebot-Token", &self.config.api_token)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.config.send_timeout_secs))
            .send()
            .await
            .map_err(|e| HiveError::Channel(format!("role lookup failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(HiveError::Channel(format!(
                "role lookup for '{role_name}' returned HTTP {status}"
            )));
        }

        let parsed: RoleMembersResponse = response
            .json()
            .await
            .map_err(|e| HiveError::Channel(format!("Invalid role response: {e}")))?;
        Ok(parsed.members)
    }
}
