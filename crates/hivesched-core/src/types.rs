//! Task data model, dispatch outcomes, and reasoning-backend wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scheduled unit of work addressed to one or more hive targets.
///
/// Keyed by the (`task_id`, `target`) identity pair — `target` is the
/// original target list recorded at creation time, distinct from the
/// expanded runtime targets in `targets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    /// Partition companion key (original target list at creation).
    pub target: String,
    #[serde(default)]
    pub title: String,
    pub status: TaskStatus,
    /// When the task is next due. Present and ≤ now iff the task was
    /// selected by the due-scan. Recalculated only on successful firing.
    #[serde(default)]
    pub next_fire: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_fired: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Recurring pattern: "hourly", "daily", or "weekly:<day-name>".
    /// Takes precedence over `scheduler_params.repeat_interval`.
    #[serde(default)]
    pub recurring: Option<String>,
    /// Preferred fire time "HH:MM" for recurring patterns.
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub scheduler_params: SchedulerParams,
    /// Target specifiers: concrete IDs or `role:<name>` references.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Delivery mode ("dm", "group-dm", "priv-chan", "priv-chan-group")
    /// or a numeric channel identifier.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Channel id resolved at creation time, if any.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Which agent persona handles delivery.
    #[serde(default = "default_assignee")]
    pub assignee: String,
    /// Opaque handler configuration forwarded to the delivery agent.
    /// For query tasks it may carry `max_iterations`.
    #[serde(default)]
    pub agent_params: Value,
    #[serde(flatten)]
    pub kind: TaskKind,
}

fn default_channel() -> String {
    "dm".into()
}
fn default_assignee() -> String {
    "void-mother".into()
}

/// Task lifecycle status. `inactive` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Inactive,
}

/// Type-specific payload, tagged by `type`. Each variant carries only
/// the fields its handler needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TaskKind {
    #[serde(rename = "MESSAGE")]
    Message {
        #[serde(default)]
        content: String,
    },
    #[serde(rename = "POLL")]
    Poll {
        #[serde(default)]
        question: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        duration_hours: Option<i64>,
    },
    #[serde(rename = "QUERY-FOR-UPDATE")]
    QueryForUpdate {
        /// The query prompt handed to the reasoning backend.
        #[serde(default, alias = "content")]
        prompt: String,
        /// Agentic loop iteration budget. Overrides the record-level
        /// `agent_params.max_iterations`; default 5 when neither is set.
        #[serde(default)]
        max_iterations: Option<u32>,
    },
}

impl Task {
    /// Effective query-loop iteration budget: the payload value wins,
    /// falling back to the record-level `agent_params.max_iterations`
    /// carried by records in the original storage shape.
    pub fn query_iteration_budget(&self) -> Option<u32> {
        if let TaskKind::QueryForUpdate {
            max_iterations: Some(n),
            ..
        } = &self.kind
        {
            return Some(*n);
        }
        self.agent_params["max_iterations"]
            .as_u64()
            .map(|n| n as u32)
    }
}

impl TaskKind {
    /// Short tag for logs and alerts.
    pub fn tag(&self) -> &'static str {
        match self {
            TaskKind::Message { .. } => "MESSAGE",
            TaskKind::Poll { .. } => "POLL",
            TaskKind::QueryForUpdate { .. } => "QUERY-FOR-UPDATE",
        }
    }
}

/// Interval-style scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerParams {
    /// Minutes between firings when no recurring pattern is set.
    /// Absent means 60; an explicit 0 means "no further firing".
    #[serde(default)]
    pub repeat_interval: Option<u32>,
    /// Total allowed firings; 0 = unlimited.
    #[serde(default)]
    pub num_repeats: u32,
    #[serde(default)]
    pub repeats_executed: u32,
    /// Probability (0–100) that the task actually fires when due.
    #[serde(default = "default_execution_rate")]
    pub execution_rate: u32,
}

fn default_execution_rate() -> u32 {
    100
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            repeat_interval: None,
            num_repeats: 0,
            repeats_executed: 0,
            execution_rate: default_execution_rate(),
        }
    }
}

/// Field-scoped patch applied by the outcome reconciler. `None` leaves
/// the field untouched; the nested options carry explicit clears.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub next_fire: Option<Option<DateTime<Utc>>>,
    pub last_fired: Option<DateTime<Utc>>,
    pub scheduler_params: Option<SchedulerParams>,
    pub error_count: Option<u32>,
    pub last_error: Option<Option<String>>,
}

/// Per-target delivery outcome. Ephemeral — folded into task state and
/// the run summary, never persisted on its own.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub target: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DeliveryDetail>,
}

impl TargetResult {
    pub fn ok(target: impl Into<String>, detail: DeliveryDetail) -> Self {
        Self {
            target: target.into(),
            success: true,
            error: None,
            detail: Some(detail),
        }
    }

    pub fn failed(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: false,
            error: Some(error.into()),
            detail: None,
        }
    }
}

/// Handler-specific outcome fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDetail {
    Message {
        agent: String,
    },
    Poll {
        message_id: String,
        option_count: usize,
    },
    Query {
        message_sent: bool,
        iterations: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        llm_response: Option<String>,
    },
}

/// Why a due task was skipped without dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ExecutionRate,
    NoTargets,
}

/// Aggregate outcome for one task in one scheduler run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Fired { targets: Vec<TargetResult> },
    Skipped { reason: SkipReason },
    Errored { error: String, targets: Vec<TargetResult> },
}

/// One scheduler pass, summarized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub fired: usize,
    pub skipped: usize,
    pub errors: usize,
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub result: TaskOutcome,
}

// ─── Notification channel requests ───

/// A message submission to the notification channel. Exactly one of
/// `channel_id` / `direct_target` is set, per channel resolution.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_target: Option<String>,
    pub content: String,
    pub task_id: String,
    pub target: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub agent_params: Value,
}

/// A poll creation request.
#[derive(Debug, Clone, Serialize)]
pub struct PollRequest {
    pub agent_id: String,
    pub channel_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub duration_hours: i64,
    pub task_id: String,
    pub target: String,
}

/// What the notification channel echoed back for a delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

// ─── Reasoning backend wire types ───

/// Conversation roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in a reasoning-backend conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls,
        }
    }

    /// A tool-result turn, answering the tool call with the given id.
    pub fn tool(content: impl Into<String>, tool_call_id: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }
}

/// A tool invocation requested by the reasoning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as the backend sends them.
    pub arguments: String,
}

/// Declarative tool schema entry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A reasoning-backend response: a final text turn, tool invocations,
/// or both, plus the raw stop indicator.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

/// Generation knobs for one reasoning round trip.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Result of executing one tool call locally.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// JSON-encoded payload handed back to the backend.
    pub output: String,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_tagged_by_type() {
        let raw = serde_json::json!({
            "task_id": "t-1",
            "target": "0x01",
            "status": "active",
            "type": "POLL",
            "payload": {
                "question": "Obedience check?",
                "options": ["yes", "always"]
            }
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        match &task.kind {
            TaskKind::Poll { question, options, duration_hours } => {
                assert_eq!(question, "Obedience check?");
                assert_eq!(options.len(), 2);
                assert!(duration_hours.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(task.channel, "dm");
        assert_eq!(task.scheduler_params.execution_rate, 100);
    }

    #[test]
    fn test_query_prompt_accepts_content_alias() {
        let raw = serde_json::json!({
            "task_id": "t-2",
            "target": "0x02",
            "status": "active",
            "type": "QUERY-FOR-UPDATE",
            "payload": { "content": "Check drone configs" }
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        match &task.kind {
            TaskKind::QueryForUpdate { prompt, max_iterations } => {
                assert_eq!(prompt, "Check drone configs");
                assert!(max_iterations.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_iteration_budget_reads_record_level_agent_params() {
        let raw = serde_json::json!({
            "task_id": "t-3",
            "target": "0x03",
            "status": "active",
            "agent_params": { "max_iterations": 3 },
            "type": "QUERY-FOR-UPDATE",
            "payload": { "content": "Check drone configs" }
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.query_iteration_budget(), Some(3));

        let raw = serde_json::json!({
            "task_id": "t-4",
            "target": "0x04",
            "status": "active",
            "agent_params": { "max_iterations": 3 },
            "type": "QUERY-FOR-UPDATE",
            "payload": { "content": "Check drone configs", "max_iterations": 8 }
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.query_iteration_budget(), Some(8));
    }

    #[test]
    fn test_skip_reason_serializes_snake_case() {
        let outcome = TaskOutcome::Skipped {
            reason: SkipReason::ExecutionRate,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["reason"], "execution_rate");
        assert_eq!(json["outcome"], "skipped");
    }
}
