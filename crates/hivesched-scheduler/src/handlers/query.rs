//! QUERY-FOR-UPDATE handler: a bounded agentic loop. The reasoning
//! backend drives the flow with the drone query tools until it calls
//! a terminal tool (`send_message` / `skip_message`), ends its turn
//! without action, or exhausts the iteration budget.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use hivesched_core::error::Result;
use hivesched_core::traits::{DroneStore, Notifier, Provider, Tool};
use hivesched_core::types::{
    ChatMessage, DeliveryDetail, GenerateParams, TargetResult, Task, ToolResult,
};
use hivesched_tools::{QueryToolContext, SEND_MESSAGE, SKIP_MESSAGE, find_tool, is_terminal,
    list_definitions, query_tools};

use crate::resolve::ResolvedChannel;

const DEFAULT_MAX_ITERATIONS: u32 = 5;
/// Final text turns are truncated to this many characters in reports.
const RESPONSE_SNIPPET_CHARS: usize = 500;

#[allow(clippy::too_many_arguments)]
pub async fn run_query(
    task: &Task,
    prompt: &str,
    max_iterations: Option<u32>,
    target: &str,
    channel: &ResolvedChannel,
    provider: &dyn Provider,
    drones: Arc<dyn DroneStore>,
    notifier: Arc<dyn Notifier>,
    params: &GenerateParams,
) -> Result<TargetResult> {
    if prompt.trim().is_empty() {
        return Ok(TargetResult::failed(target, "No content prompt provided"));
    }
    let budget = max_iterations
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_ITERATIONS);

    let ctx = QueryToolContext {
        channel_id: channel.channel_id().map(str::to_string),
        assignee: task.assignee.clone(),
        task_id: task.task_id.clone(),
    };
    let tools = query_tools(drones, notifier, ctx);
    let definitions = list_definitions(&tools);

    let mut messages = vec![
        ChatMessage::system(system_prompt(&task.assignee)),
        ChatMessage::user(prompt),
    ];

    for iteration in 1..=budget {
        debug!("[{}] Agentic loop iteration {iteration}/{budget}", task.task_id);

        let response = match provider.chat(&messages, &definitions, params).await {
            Ok(r) => r,
            Err(e) => {
                error!("[{}] Error in agentic loop: {e}", task.task_id);
                return Ok(TargetResult::failed(target, e.to_string()));
            }
        };

        if !response.tool_calls.is_empty() {
            messages.push(ChatMessage::assistant(
                response.content.clone().unwrap_or_default(),
                Some(response.tool_calls.clone()),
            ));

            for call in &response.tool_calls {
                let name = call.function.name.as_str();
                debug!("[{}] Executing tool: {name}", task.task_id);
                let result = execute_tool(&tools, name, &call.function.arguments).await;

                if is_terminal(name) {
                    return Ok(finish_terminal(task, target, name, &result, iteration));
                }
                messages.push(ChatMessage::tool(result.output, &call.id));
            }
            continue;
        }

        match response.finish_reason.as_deref() {
            Some("stop") | Some("end_turn") | None => {
                let text = response.content.unwrap_or_default();
                info!(
                    "[{}] LLM ended without action: {}",
                    task.task_id,
                    snippet(&text, 100)
                );
                return Ok(TargetResult::ok(
                    target,
                    DeliveryDetail::Query {
                        message_sent: false,
                        iterations: iteration,
                        reason: Some("llm_ended_without_action".into()),
                        message_id: None,
                        llm_response: Some(snippet(&text, RESPONSE_SNIPPET_CHARS)),
                    },
                ));
            }
            Some(other) => {
                warn!("[{}] Unexpected stop reason: {other}", task.task_id);
                return Ok(TargetResult::failed(
                    target,
                    format!("Unexpected stop reason: {other}"),
                ));
            }
        }
    }

    warn!("[{}] Agentic loop exhausted after {budget} iterations", task.task_id);
    Ok(TargetResult::failed(target, "max_iterations_reached"))
}

async fn execute_tool(tools: &[Box<dyn Tool>], name: &str, arguments: &str) -> ToolResult {
    let Some(tool) = find_tool(tools, name) else {
        return error_result(format!("Unknown tool: {name}"));
    };
    match tool.execute(arguments).await {
        Ok(result) => result,
        Err(e) => error_result(e.to_string()),
    }
}

/// A terminal tool ends the loop: a successful `send_message` or any
/// `skip_message` concludes the task, a failed `send_message` fails it.
fn finish_terminal(
    task: &Task,
    target: &str,
    name: &str,
    result: &ToolResult,
    iteration: u32,
) -> TargetResult {
    let output: Value = serde_json::from_str(&result.output).unwrap_or(Value::Null);

    if name == SKIP_MESSAGE {
        let reason = output["reason"].as_str().unwrap_or("no_action_needed");
        info!("[{}] Query concluded without message: {reason}", task.task_id);
        return TargetResult::ok(
            target,
            DeliveryDetail::Query {
                message_sent: false,
                iterations: iteration,
                reason: Some(reason.to_string()),
                message_id: None,
                llm_response: None,
            },
        );
    }

    debug_assert_eq!(name, SEND_MESSAGE);
    if result.success {
        let message_id = output["message_id"].as_str().map(String::from);
        info!("✅ Query task {} sent message on iteration {iteration}", task.task_id);
        return TargetResult::ok(
            target,
            DeliveryDetail::Query {
                message_sent: true,
                iterations: iteration,
                reason: None,
                message_id,
                llm_response: None,
            },
        );
    }
    let err = output["error"].as_str().unwrap_or("send_message failed");
    TargetResult::failed(target, format!("send_message failed: {err}"))
}

fn system_prompt(assignee: &str) -> String {
    format!(
        "You are {assignee}, a helpful drone assistant. You have access to tools \
         to query drone data and send messages.\n\n\
         Your task is described below. Use the tools to accomplish it. Be \
         efficient - don't make unnecessary queries.\n\n\
         When you've gathered enough information, either:\n\
         - Call send_message to send a message to the drone\n\
         - Call skip_message if no message is needed (e.g., their config is \
         already complete)\n\n\
         IMPORTANT: When sending a message, you MUST address the drone by their \
         ID (e.g., \"Hey 0x3604, ...\") at the start of your message. This is \
         crucial as the message goes to a shared channel and the drone needs to \
         know it's meant for them.\n\n\
         Be specific and helpful in your messages. Reference the actual field \
         names that need attention."
    )
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn error_result(message: String) -> ToolResult {
    ToolResult {
        output: serde_json::json!({ "error": message }).to_string(),
        success: false,
    }
}
