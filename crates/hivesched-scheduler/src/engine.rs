//! Scheduler engine: one pass = due-scan, dispatch, reconcile.
//!
//! Reconciliation is retry-by-resubmission: a fired task gets its
//! schedule advanced and its error state cleared, an errored task
//! keeps `next_fire` in the past so the next scan picks it up again.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use hivesched_core::config::HiveConfig;
use hivesched_core::error::Result;
use hivesched_core::traits::{DroneStore, Notifier, Provider, RoleDirectory, TaskStore};
use hivesched_core::types::{
    GenerateParams, RunSummary, Task, TaskOutcome, TaskReport, TaskStatus, TaskUpdate,
};

use crate::dispatch::DispatchRouter;
use crate::recurrence;

pub struct SchedulerEngine {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    router: DispatchRouter,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        roles: Arc<dyn RoleDirectory>,
        notifier: Arc<dyn Notifier>,
        provider: Arc<dyn Provider>,
        drones: Arc<dyn DroneStore>,
        config: &HiveConfig,
    ) -> Self {
        let router = DispatchRouter::new(
            notifier.clone(),
            roles,
            provider,
            drones,
            config.agents.clone(),
            GenerateParams {
                model: config.reasoning.model.clone(),
                temperature: config.reasoning.temperature,
                max_tokens: config.reasoning.max_tokens,
            },
        );
        Self {
            store,
            notifier,
            router,
        }
    }

    /// One scheduler pass over every due task.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let now = Utc::now();
        let due = self.store.due_tasks(now).await?;
        info!("📊 Scheduler pass: {} task(s) due", due.len());

        let mut summary = RunSummary::default();
        for task in &due {
            let outcome = self.process_task(task).await;
            summary.processed += 1;
            match &outcome {
                TaskOutcome::Fired { .. } => summary.fired += 1,
                TaskOutcome::Skipped { .. } => summary.skipped += 1,
                TaskOutcome::Errored { .. } => summary.errors += 1,
            }
            summary.tasks.push(TaskReport {
                task_id: task.task_id.clone(),
                result: outcome,
            });
        }

        info!(
            "✅ Scheduler pass complete: {} processed, {} fired, {} skipped, {} errors",
            summary.processed, summary.fired, summary.skipped, summary.errors
        );
        Ok(summary)
    }

    async fn process_task(&self, task: &Task) -> TaskOutcome {
        info!("📊 Processing task {} ({})", task.task_id, task.kind.tag());
        let outcome = self.router.dispatch(task).await;

        match &outcome {
            TaskOutcome::Fired { .. } => {
                if let Err(e) = self.mark_fired(task).await {
                    error!(
                        "⚠️ Task {} fired but state update failed: {e}",
                        task.task_id
                    );
                }
            }
            TaskOutcome::Errored { error, .. } => {
                error!("⚠️ Task {} errored: {error}", task.task_id);
                if let Err(e) = self.record_error(task, error).await {
                    error!(
                        "⚠️ Failed to record error for task {}: {e}",
                        task.task_id
                    );
                }
                self.post_alert(task, error).await;
            }
            TaskOutcome::Skipped { .. } => {}
        }
        outcome
    }

    /// Advance a fired task: bump the repeat counter, deactivate when
    /// the repeat limit is reached, recalculate `next_fire` only while
    /// still active, and clear error state.
    async fn mark_fired(&self, task: &Task) -> Result<()> {
        let now = Utc::now();
        let mut params = task.scheduler_params.clone();
        params.repeats_executed += 1;

        let mut status = task.status;
        if params.num_repeats > 0 && params.repeats_executed >= params.num_repeats {
            info!(
                "Task {} reached its repeat limit, deactivating",
                task.task_id
            );
            status = TaskStatus::Inactive;
        }

        let next = if status == TaskStatus::Active {
            recurrence::next_fire(task, now)
        } else {
            None
        };

        let patch = TaskUpdate {
            status: Some(status),
            next_fire: Some(next),
            last_fired: Some(now),
            scheduler_params: Some(params),
            error_count: Some(0),
            last_error: Some(None),
        };
        self.store.update(&task.task_id, &task.target, patch).await?;
        Ok(())
    }

    /// Record an errored task without touching its schedule: the stale
    /// `next_fire` keeps it eligible for the next scan.
    async fn record_error(&self, task: &Task, error: &str) -> Result<()> {
        let patch = TaskUpdate {
            error_count: Some(task.error_count + 1),
            last_error: Some(Some(error.to_string())),
            ..TaskUpdate::default()
        };
        self.store.update(&task.task_id, &task.target, patch).await?;
        Ok(())
    }

    /// Best-effort operator alert; a failure here is logged, never
    /// propagated.
    async fn post_alert(&self, task: &Task, error: &str) {
        let title = if task.title.is_empty() {
            "Untitled"
        } else {
            task.title.as_str()
        };
        let body = format!(
            "**Task Execution Error**\n\
             Task: `{}`\n\
             Title: {title}\n\
             Type: {}\n\
             Error: {error}\n\
             Will retry on next scheduled cycle.",
            task.task_id,
            task.kind.tag(),
        );
        if let Err(e) = self.notifier.post_alert(&body).await {
            error!("⚠️ Failed to post error alert for task {}: {e}", task.task_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use hivesched_core::error::{HiveError, Result};
    use hivesched_core::types::{
        ChatMessage, DeliveryReceipt, MessageRequest, PollRequest, ProviderResponse,
        SchedulerParams, TaskKind, ToolDefinition,
    };
    use serde_json::Value;
    use std::sync::Mutex;

    struct FakeStore {
        tasks: Mutex<Vec<Task>>,
        patches: Mutex<Vec<(String, TaskUpdate)>>,
    }

    impl FakeStore {
        fn new(tasks: Vec<Task>) -> Self {
            Self {
                tasks: Mutex::new(tasks),
                patches: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl TaskStore for FakeStore {
        async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
            Ok(self
                .tasks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| {
                    t.status == TaskStatus::Active && t.next_fire.is_some_and(|f| f <= now)
                })
                .cloned()
                .collect())
        }

        async fn get(&self, task_id: &str, target: &str) -> Result<Option<Task>> {
            Ok(self
                .tasks
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.task_id == task_id && t.target == target)
                .cloned())
        }

        async fn update(&self, task_id: &str, _target: &str, patch: TaskUpdate) -> Result<Task> {
            self.patches
                .lock()
                .unwrap()
                .push((task_id.to_string(), patch));
            let tasks = self.tasks.lock().unwrap();
            tasks
                .iter()
                .find(|t| t.task_id == task_id)
                .cloned()
                .ok_or_else(|| HiveError::Store("task not found".into()))
        }
    }

    struct FlakyNotifier {
        fail_target: Option<String>,
        alerts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send_message(&self, req: &MessageRequest) -> Result<DeliveryReceipt> {
            if self.fail_target.as_deref() == Some(req.target.as_str()) {
                return Err(HiveError::Channel("bot unreachable".into()));
            }
            Ok(DeliveryReceipt::default())
        }

        async fn create_poll(&self, _req: &PollRequest) -> Result<DeliveryReceipt> {
            Ok(DeliveryReceipt {
                message_id: Some("m-1".into()),
            })
        }

        async fn post_alert(&self, content: &str) -> Result<()> {
            self.alerts.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    struct NoRoles;

    #[async_trait]
    impl RoleDirectory for NoRoles {
        async fn role_members(&self, _role_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    struct NoProvider;

    #[async_trait]
    impl Provider for NoProvider {
        fn name(&self) -> &str {
            "none"
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
            _params: &GenerateParams,
        ) -> Result<ProviderResponse> {
            Err(HiveError::Provider("not under test".into()))
        }
    }

    struct NoDrones;

    #[async_trait]
    impl DroneStore for NoDrones {
        async fn list_drones(&self, _limit: usize) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn get_drone_config(&self, _drone_id: &str) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    fn due_message_task(task_id: &str, targets: Vec<&str>, params: SchedulerParams) -> Task {
        Task {
            task_id: task_id.into(),
            target: targets.join(","),
            title: "Ping".into(),
            status: TaskStatus::Active,
            next_fire: Some(Utc::now() - Duration::minutes(5)),
            last_fired: None,
            error_count: 1,
            last_error: None,
            recurring: None,
            schedule_time: None,
            scheduler_params: params,
            targets: targets.into_iter().map(String::from).collect(),
            channel: "dm".into(),
            channel_id: None,
            assignee: "void-mother".into(),
            agent_params: serde_json::Value::Null,
            kind: TaskKind::Message {
                content: "status check {target}".into(),
            },
        }
    }

    fn engine(
        store: Arc<FakeStore>,
        notifier: Arc<FlakyNotifier>,
    ) -> SchedulerEngine {
        SchedulerEngine::new(
            store,
            Arc::new(NoRoles),
            notifier,
            Arc::new(NoProvider),
            Arc::new(NoDrones),
            &HiveConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_repeat_limit_deactivates_and_clears_schedule() {
        let task = due_message_task(
            "t-1",
            vec!["0x01"],
            SchedulerParams {
                num_repeats: 3,
                repeats_executed: 2,
                ..SchedulerParams::default()
            },
        );
        let store = Arc::new(FakeStore::new(vec![task]));
        let notifier = Arc::new(FlakyNotifier {
            fail_target: None,
            alerts: Mutex::new(vec![]),
        });
        let summary = engine(store.clone(), notifier).run_once().await.unwrap();
        assert_eq!(summary.fired, 1);

        let patches = store.patches.lock().unwrap();
        let (_, patch) = &patches[0];
        assert_eq!(patch.status, Some(TaskStatus::Inactive));
        assert_eq!(patch.next_fire, Some(None));
        assert_eq!(patch.scheduler_params.as_ref().unwrap().repeats_executed, 3);
        assert_eq!(patch.error_count, Some(0));
        assert_eq!(patch.last_error, Some(None));
    }

    #[tokio::test]
    async fn test_error_path_records_and_alerts_without_advancing() {
        let task = due_message_task("t-2", vec!["0x0a", "0x0b"], SchedulerParams::default());
        let store = Arc::new(FakeStore::new(vec![task]));
        let notifier = Arc::new(FlakyNotifier {
            fail_target: Some("0x0b".into()),
            alerts: Mutex::new(vec![]),
        });
        let summary = engine(store.clone(), notifier.clone())
            .run_once()
            .await
            .unwrap();
        assert_eq!(summary.errors, 1);

        let patches = store.patches.lock().unwrap();
        let (_, patch) = &patches[0];
        // Schedule untouched, so the next scan retries the task.
        assert!(patch.next_fire.is_none());
        assert!(patch.status.is_none());
        assert_eq!(patch.error_count, Some(2));
        let last_error = patch.last_error.clone().unwrap().unwrap();
        assert!(last_error.contains("0x0b: "));

        let alerts = notifier.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("**Task Execution Error**"));
        assert!(alerts[0].contains("Task: `t-2`"));
        assert!(alerts[0].contains("Type: MESSAGE"));
    }

    #[tokio::test]
    async fn test_run_summary_counts_every_due_task() {
        let fired = due_message_task("t-3", vec!["0x01"], SchedulerParams::default());
        let skipped = due_message_task(
            "t-4",
            vec!["0x01"],
            SchedulerParams {
                execution_rate: 0,
                ..SchedulerParams::default()
            },
        );
        let store = Arc::new(FakeStore::new(vec![fired, skipped]));
        let notifier = Arc::new(FlakyNotifier {
            fail_target: None,
            alerts: Mutex::new(vec![]),
        });
        let summary = engine(store, notifier).run_once().await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.fired, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.tasks.len(), 2);
    }
}
