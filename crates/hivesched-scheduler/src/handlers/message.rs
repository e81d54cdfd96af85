//! MESSAGE handler: interpolate the content template and submit it to
//! the notification channel through the assigned delivery agent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use hivesched_core::error::Result;
use hivesched_core::traits::Notifier;
use hivesched_core::types::{DeliveryDetail, MessageRequest, TargetResult, Task};

use crate::resolve::ResolvedChannel;

pub async fn send_message(
    task: &Task,
    content: &str,
    target: &str,
    channel: &ResolvedChannel,
    notifier: &dyn Notifier,
    agents: &HashMap<String, String>,
) -> Result<TargetResult> {
    if content.trim().is_empty() {
        return Ok(TargetResult::failed(target, "No message content provided"));
    }
    let Some(agent_id) = agents.get(&task.assignee) else {
        return Ok(TargetResult::failed(
            target,
            format!("Unknown agent: {}", task.assignee),
        ));
    };

    let rendered = interpolate(content, target, task, Utc::now());
    let (channel_id, direct_target) = channel.as_parts();
    let req = MessageRequest {
        agent_id: agent_id.clone(),
        channel_id,
        direct_target,
        content: rendered,
        task_id: task.task_id.clone(),
        target: target.to_string(),
        agent_params: task.agent_params.clone(),
    };

    match notifier.send_message(&req).await {
        Ok(_) => {
            info!("✅ Message task {} delivered via {agent_id} to {target}", task.task_id);
            Ok(TargetResult::ok(
                target,
                DeliveryDetail::Message {
                    agent: task.assignee.clone(),
                },
            ))
        }
        Err(e) => Ok(TargetResult::failed(target, e.to_string())),
    }
}

/// Replace content template placeholders. `{target}` renders every
/// comma-separated entry as a mention; role references become role
/// mentions.
pub fn interpolate(content: &str, target: &str, task: &Task, now: DateTime<Utc>) -> String {
    let mentions = target
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| mention(t.trim()))
        .collect::<Vec<_>>()
        .join(" ");
    content
        .replace("{target}", &mentions)
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{time}", &now.format("%H:%M").to_string())
        .replace("{title}", &task.title)
        .replace("{task_id}", &task.task_id)
}

fn mention(target: &str) -> String {
    match target.strip_prefix("role:") {
        Some(role) => format!("<@&{role}>"),
        None => format!("<@{target}>"),
    }
}
