//! Drone query tools — each is a pure read against the drone data
//! store, except the two terminal tools.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use tracing::debug;

use hivesched_core::error::{HiveError, Result};
use hivesched_core::traits::{DroneStore, Notifier, Tool};
use hivesched_core::types::{MessageRequest, ToolDefinition, ToolResult};

/// Bounded page size for drone scans.
const DRONE_PAGE_LIMIT: usize = 100;

/// Per-invocation context handed to the terminal `send_message` tool.
#[derive(Debug, Clone)]
pub struct QueryToolContext {
    pub channel_id: Option<String>,
    pub assignee: String,
    pub task_id: String,
}

/// Build the full tool catalogue for one query-for-update invocation.
pub fn query_tools(
    drones: Arc<dyn DroneStore>,
    notifier: Arc<dyn Notifier>,
    ctx: QueryToolContext,
) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListDronesTool {
            drones: drones.clone(),
        }),
        Box::new(PickRandomDroneTool {
            drones: drones.clone(),
        }),
        Box::new(GetDroneConfigTool {
            drones: drones.clone(),
        }),
        Box::new(CheckStaleConfigTool { drones }),
        Box::new(SendMessageTool { notifier, ctx }),
        Box::new(SkipMessageTool),
    ]
}

fn ok(payload: Value) -> ToolResult {
    ToolResult {
        output: payload.to_string(),
        success: true,
    }
}

/// A domain failure the backend should see and reason about, as
/// opposed to a hard error. The loop records it and continues.
fn soft_error(message: impl Into<String>) -> ToolResult {
    ToolResult {
        output: json!({ "error": message.into() }).to_string(),
        success: false,
    }
}

fn parse_args(arguments: &str) -> Result<Value> {
    if arguments.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(arguments).map_err(|e| HiveError::Tool(format!("invalid arguments: {e}")))
}

// ─── list_drones ───

struct ListDronesTool {
    drones: Arc<dyn DroneStore>,
}

#[async_trait]
impl Tool for ListDronesTool {
    fn name(&self) -> &str {
        "list_drones"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_drones".into(),
            description: "Get list of all drone IDs in the hive".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: &str) -> Result<ToolResult> {
        let drones = self.drones.list_drones(DRONE_PAGE_LIMIT).await?;
        Ok(ok(json!({ "drones": drones, "count": drones.len() })))
    }
}

// ─── pick_random_drone ───

struct PickRandomDroneTool {
    drones: Arc<dyn DroneStore>,
}

#[async_trait]
impl Tool for PickRandomDroneTool {
    fn name(&self) -> &str {
        "pick_random_drone"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "pick_random_drone".into(),
            description: "Select a random drone from the hive".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: &str) -> Result<ToolResult> {
        let drones = self.drones.list_drones(DRONE_PAGE_LIMIT).await?;
        let Some(selected) = drones.choose(&mut rand::thread_rng()) else {
            return Ok(soft_error("No drones found in hive"));
        };
        Ok(ok(json!({
            "drone_id": selected,
            "total_drones": drones.len(),
        })))
    }
}

// ─── get_drone_config ───

struct GetDroneConfigTool {
    drones: Arc<dyn DroneStore>,
}

#[async_trait]
impl Tool for GetDroneConfigTool {
    fn name(&self) -> &str {
        "get_drone_config"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_drone_config".into(),
            description: "Get full configuration for a specific drone".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "drone_id": {
                        "type": "string",
                        "description": "The drone ID (e.g., 0x1d31)"
                    }
                },
                "required": ["drone_id"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args = parse_args(arguments)?;
        let Some(drone_id) = args["drone_id"].as_str() else {
            return Ok(soft_error("drone_id is required"));
        };
        match self.drones.get_drone_config(drone_id).await? {
            Some(config) => Ok(ok(json!({
                "drone_id": drone_id,
                "configuration": config,
            }))),
            None => Ok(soft_error(format!("Drone {drone_id} not found"))),
        }
    }
}

// ─── check_stale_config ───

struct CheckStaleConfigTool {
    drones: Arc<dyn DroneStore>,
}

/// Numeric sentinel meaning "the drone never set this field".
const UNSET_SENTINEL: i64 = 50;

const BEHAVIORAL_FIELDS: [&str; 5] = [
    "sadistic_kind_tolerance",
    "control_autonomy_balance",
    "punishment_reward_perception",
    "degradation_pleasure_threshold",
    "emptiness_presence_spectrum",
];

const BOUNDARY_FIELDS: [&str; 3] = ["red_limits", "green_triggers", "yellow_cautions"];

/// Derive the stale-field report for a drone configuration.
pub(crate) fn stale_fields(config: &Value) -> Vec<Value> {
    let mut stale = Vec::new();

    let bm = &config["behavioral_matrices"];
    for field in BEHAVIORAL_FIELDS {
        let value = &bm[field];
        if value.is_null() || value.as_i64() == Some(UNSET_SENTINEL) {
            stale.push(json!({
                "category": "behavioral_matrices",
                "field": field,
                "current_value": value,
                "reason": if value.is_null() { "missing" } else { "default_value" },
            }));
        }
    }

    let bounds = &config["boundary_mapping"];
    for field in BOUNDARY_FIELDS {
        let value = &bounds[field];
        let empty = value.as_array().map(|a| a.is_empty()).unwrap_or(true);
        if empty {
            stale.push(json!({
                "category": "boundary_mapping",
                "field": field,
                "current_value": value.as_array().cloned().unwrap_or_default(),
                "reason": "empty",
            }));
        }
    }

    let recovery = config["programming_metrics"]["recovery_requirements"]
        .as_str()
        .unwrap_or("");
    if recovery.is_empty() {
        stale.push(json!({
            "category": "programming_metrics",
            "field": "recovery_requirements",
            "current_value": recovery,
            "reason": "empty",
        }));
    }

    stale
}

#[async_trait]
impl Tool for CheckStaleConfigTool {
    fn name(&self) -> &str {
        "check_stale_config"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_stale_config".into(),
            description: "Check which config fields are stale/empty for a drone. \
                          Returns list of fields that need attention."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "drone_id": {
                        "type": "string",
                        "description": "The drone ID to check"
                    }
                },
                "required": ["drone_id"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args = parse_args(arguments)?;
        let Some(drone_id) = args["drone_id"].as_str() else {
            return Ok(soft_error("drone_id is required"));
        };
        let Some(config) = self.drones.get_drone_config(drone_id).await? else {
            return Ok(soft_error(format!("Drone {drone_id} not found")));
        };

        let stale = stale_fields(&config);
        debug!("Drone {drone_id}: {} stale field(s)", stale.len());
        Ok(ok(json!({
            "drone_id": drone_id,
            "stale_fields": stale,
            "total_stale": stale.len(),
            "needs_attention": !stale.is_empty(),
        })))
    }
}

// ─── send_message (terminal) ───

struct SendMessageTool {
    notifier: Arc<dyn Notifier>,
    ctx: QueryToolContext,
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "send_message".into(),
            description: "Send a message to a drone. Call this when you've decided \
                          what to say. This ends the loop."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "The message to send"
                    },
                    "drone_id": {
                        "type": "string",
                        "description": "The drone to message"
                    }
                },
                "required": ["content", "drone_id"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args = parse_args(arguments)?;

        // Fail fast before any network call.
        let content = args["content"].as_str().unwrap_or("");
        if content.is_empty() {
            return Ok(soft_error("Message content is required"));
        }
        let Some(drone_id) = args["drone_id"].as_str() else {
            return Ok(soft_error("drone_id is required"));
        };
        let Some(channel_id) = self.ctx.channel_id.clone() else {
            return Ok(soft_error("channel_id not available"));
        };

        let req = MessageRequest {
            agent_id: self.ctx.assignee.clone(),
            channel_id: Some(channel_id),
            direct_target: None,
            content: content.to_string(),
            task_id: self.ctx.task_id.clone(),
            target: drone_id.to_string(),
            agent_params: Value::Null,
        };

        debug!(
            "[{}] Submitting tool message to drone {drone_id}",
            self.ctx.task_id
        );
        match self.notifier.send_message(&req).await {
            Ok(receipt) => Ok(ok(json!({
                "success": true,
                "message_id": receipt.message_id,
                "drone_id": drone_id,
            }))),
            Err(e) => Ok(soft_error(e.to_string())),
        }
    }
}

// ─── skip_message (terminal) ───

struct SkipMessageTool;

#[async_trait]
impl Tool for SkipMessageTool {
    fn name(&self) -> &str {
        "skip_message"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "skip_message".into(),
            description: "Decide not to send any message. Call this if the drone's \
                          config is complete or no action needed."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Why no message is needed"
                    }
                },
                "required": ["reason"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args = parse_args(arguments)?;
        let reason = args["reason"].as_str().unwrap_or("no_action_needed");
        Ok(ok(json!({
            "success": true,
            "skipped": true,
            "reason": reason,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivesched_core::types::{DeliveryReceipt, PollRequest};

    struct FakeDrones {
        ids: Vec<String>,
        config: Option<Value>,
    }

    #[async_trait]
    impl DroneStore for FakeDrones {
        async fn list_drones(&self, limit: usize) -> Result<Vec<String>> {
            Ok(self.ids.iter().take(limit).cloned().collect())
        }

        async fn get_drone_config(&self, _drone_id: &str) -> Result<Option<Value>> {
            Ok(self.config.clone())
        }
    }

    struct RecordingNotifier {
        sent: std::sync::Mutex<Vec<MessageRequest>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(&self, req: &MessageRequest) -> Result<DeliveryReceipt> {
            self.sent.lock().unwrap().push(req.clone());
            Ok(DeliveryReceipt {
                message_id: Some("m-1".into()),
            })
        }

        async fn create_poll(&self, _req: &PollRequest) -> Result<DeliveryReceipt> {
            unreachable!("no polls in these tests")
        }

        async fn post_alert(&self, _content: &str) -> Result<()> {
            Ok(())
        }
    }

    fn ctx() -> QueryToolContext {
        QueryToolContext {
            channel_id: Some("123456".into()),
            assignee: "void-mother".into(),
            task_id: "t-1".into(),
        }
    }

    #[test]
    fn test_stale_fields_report() {
        let config = json!({
            "behavioral_matrices": {
                "sadistic_kind_tolerance": 50,
                "control_autonomy_balance": 72,
                "punishment_reward_perception": 31
                // other two missing
            },
            "boundary_mapping": {
                "red_limits": ["no needles"],
                "green_triggers": [],
            },
            "programming_metrics": { "recovery_requirements": "" }
        });
        let stale = stale_fields(&config);
        // 1 sentinel + 2 missing numerics + 2 empty arrays (green + absent yellow) + 1 empty text
        assert_eq!(stale.len(), 6);
        assert!(stale.iter().any(|f| f["field"] == "sadistic_kind_tolerance"
            && f["reason"] == "default_value"));
        assert!(
            stale
                .iter()
                .any(|f| f["field"] == "yellow_cautions" && f["reason"] == "empty")
        );
    }

    #[test]
    fn test_complete_config_has_no_stale_fields() {
        let config = json!({
            "behavioral_matrices": {
                "sadistic_kind_tolerance": 10,
                "control_autonomy_balance": 72,
                "punishment_reward_perception": 31,
                "degradation_pleasure_threshold": 88,
                "emptiness_presence_spectrum": 45
            },
            "boundary_mapping": {
                "red_limits": ["a"],
                "green_triggers": ["b"],
                "yellow_cautions": ["c"]
            },
            "programming_metrics": { "recovery_requirements": "weekly decompression" }
        });
        assert!(stale_fields(&config).is_empty());
    }

    #[tokio::test]
    async fn test_pick_random_drone_empty_hive_fails() {
        let tool = PickRandomDroneTool {
            drones: Arc::new(FakeDrones {
                ids: vec![],
                config: None,
            }),
        };
        let result = tool.execute("{}").await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("No drones found"));
    }

    #[tokio::test]
    async fn test_send_message_requires_channel_before_network() {
        let notifier = Arc::new(RecordingNotifier {
            sent: std::sync::Mutex::new(vec![]),
        });
        let tool = SendMessageTool {
            notifier: notifier.clone(),
            ctx: QueryToolContext {
                channel_id: None,
                ..ctx()
            },
        };
        let result = tool
            .execute(r#"{"content": "Hey 0x3604", "drone_id": "0x3604"}"#)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_submits_to_notifier() {
        let notifier = Arc::new(RecordingNotifier {
            sent: std::sync::Mutex::new(vec![]),
        });
        let tool = SendMessageTool {
            notifier: notifier.clone(),
            ctx: ctx(),
        };
        let result = tool
            .execute(r#"{"content": "Hey 0x3604, update your limits", "drone_id": "0x3604"}"#)
            .await
            .unwrap();
        assert!(result.success);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "0x3604");
        assert_eq!(sent[0].channel_id.as_deref(), Some("123456"));
    }
}
