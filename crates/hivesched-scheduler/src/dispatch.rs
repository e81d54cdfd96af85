//! Dispatch router: one due task in, one aggregate outcome out.
//!
//! Order of operations: execution-rate gate, target expansion, then
//! either a single broadcast (MESSAGE into a resolved shared channel)
//! or a per-target loop. Per-target failures are isolated — one bad
//! target never stops the rest — and folded into the aggregate error.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use hivesched_core::traits::{DroneStore, Notifier, Provider, RoleDirectory};
use hivesched_core::types::{
    GenerateParams, SkipReason, TargetResult, Task, TaskKind, TaskOutcome,
};

use crate::handlers;
use crate::resolve::{ResolvedChannel, resolve_channel};
use crate::targets::expand_targets;

type Draw = Box<dyn Fn() -> u32 + Send + Sync>;

pub struct DispatchRouter {
    notifier: Arc<dyn Notifier>,
    roles: Arc<dyn RoleDirectory>,
    provider: Arc<dyn Provider>,
    drones: Arc<dyn DroneStore>,
    /// assignee → delivery-agent id.
    agents: HashMap<String, String>,
    generate: GenerateParams,
    /// Uniform draw in [0, 100) for the execution-rate gate.
    draw: Draw,
}

impl DispatchRouter {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        roles: Arc<dyn RoleDirectory>,
        provider: Arc<dyn Provider>,
        drones: Arc<dyn DroneStore>,
        agents: HashMap<String, String>,
        generate: GenerateParams,
    ) -> Self {
        Self {
            notifier,
            roles,
            provider,
            drones,
            agents,
            generate,
            draw: Box::new(|| rand::thread_rng().gen_range(0..100)),
        }
    }

    /// Replace the gate's random draw with a fixed one.
    pub fn with_draw(mut self, draw: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        self.draw = Box::new(draw);
        self
    }

    pub async fn dispatch(&self, task: &Task) -> TaskOutcome {
        let rate = task.scheduler_params.execution_rate.min(100);
        if (self.draw)() >= rate {
            info!(
                "📊 Task {} skipped by execution rate ({rate}%)",
                task.task_id
            );
            return TaskOutcome::Skipped {
                reason: SkipReason::ExecutionRate,
            };
        }

        let expanded = expand_targets(&task.targets, self.roles.as_ref()).await;
        if expanded.is_empty() {
            warn!("⚠️ Task {} has no resolvable targets", task.task_id);
            return TaskOutcome::Skipped {
                reason: SkipReason::NoTargets,
            };
        }

        let results = if let Some(combined) = broadcast_target(task, &expanded) {
            vec![self.dispatch_one(task, &combined).await]
        } else {
            let mut results = Vec::with_capacity(expanded.len());
            for target in &expanded {
                results.push(self.dispatch_one(task, target).await);
            }
            results
        };

        aggregate(results)
    }

    /// Dispatch to one target. Handler faults are caught here so a
    /// single target's failure stays its own.
    async fn dispatch_one(&self, task: &Task, target: &str) -> TargetResult {
        let channel = resolve_channel(task, target);
        if channel == ResolvedChannel::Unresolved {
            return TargetResult::failed(target, "channel_resolution_failed");
        }

        let handled = match &task.kind {
            TaskKind::Message { content } => {
                handlers::message::send_message(
                    task,
                    content,
                    target,
                    &channel,
                    self.notifier.as_ref(),
                    &self.agents,
                )
                .await
            }
            TaskKind::Poll {
                question,
                options,
                duration_hours,
            } => {
                handlers::poll::create_poll(
                    task,
                    question,
                    options,
                    *duration_hours,
                    target,
                    &channel,
                    self.notifier.as_ref(),
                )
                .await
            }
            TaskKind::QueryForUpdate { prompt, .. } => {
                handlers::query::run_query(
                    task,
                    prompt,
                    task.query_iteration_budget(),
                    target,
                    &channel,
                    self.provider.as_ref(),
                    self.drones.clone(),
                    self.notifier.clone(),
                    &self.generate,
                )
                .await
            }
        };

        match handled {
            Ok(result) => result,
            Err(e) => TargetResult::failed(target, e.to_string()),
        }
    }
}

/// A MESSAGE into a shared (non-direct) channel goes out once, with
/// every expanded target combined into a single addressed payload.
fn broadcast_target(task: &Task, expanded: &[String]) -> Option<String> {
    if !matches!(task.kind, TaskKind::Message { .. }) {
        return None;
    }
    if task.channel == "dm" {
        return None;
    }
    let combined = expanded.join(",");
    match resolve_channel(task, &combined) {
        ResolvedChannel::Channel(_) => Some(combined),
        _ => None,
    }
}

/// Fold per-target results into the task outcome. All-success fires;
/// any failure errors the whole task with a per-target breakdown.
fn aggregate(results: Vec<TargetResult>) -> TaskOutcome {
    let failures: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| {
            format!(
                "{}: {}",
                r.target,
                r.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    if failures.is_empty() {
        TaskOutcome::Fired { targets: results }
    } else {
        TaskOutcome::Errored {
            error: failures.join("; "),
            targets: results,
        }
    }
}
