//! Collaborator traits — the contracts the scheduling core requires
//! from its external services. Implementations live in sibling crates;
//! tests substitute fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::types::{
    ChatMessage, DeliveryReceipt, GenerateParams, MessageRequest, PollRequest, ProviderResponse,
    Task, TaskUpdate, ToolDefinition, ToolResult,
};

/// Persistent task storage: point lookups, a status+due-time scan, and
/// conditional field-scoped updates keyed by the identity pair.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks with status=active and next_fire ≤ now.
    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Fetch one task by identity pair.
    async fn get(&self, task_id: &str, target: &str) -> Result<Option<Task>>;

    /// Apply a field-scoped patch and return the new record.
    async fn update(&self, task_id: &str, target: &str, patch: TaskUpdate) -> Result<Task>;
}

/// Role → member-id expansion.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn role_members(&self, role_name: &str) -> Result<Vec<String>>;
}

/// The outbound notification channel. Message sends are accepted
/// fire-and-forget; poll creation requires a positive acknowledgment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, req: &MessageRequest) -> Result<DeliveryReceipt>;

    async fn create_poll(&self, req: &PollRequest) -> Result<DeliveryReceipt>;

    /// Post an operational error alert. Best-effort — callers log but
    /// never propagate a failure here.
    async fn post_alert(&self, content: &str) -> Result<()>;
}

/// The reasoning backend: system prompt + conversation + tool schema
/// in, tool invocations or a final text turn out.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse>;
}

/// Member (drone) configuration records: point lookup + bounded scan.
#[async_trait]
pub trait DroneStore: Send + Sync {
    /// All known drone ids, up to `limit`.
    async fn list_drones(&self, limit: usize) -> Result<Vec<String>>;

    /// One drone's configuration record, if present.
    async fn get_drone_config(&self, drone_id: &str) -> Result<Option<Value>>;
}

/// A tool callable from the agentic loop.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Execute with JSON-encoded arguments.
    async fn execute(&self, arguments: &str) -> Result<ToolResult>;
}
