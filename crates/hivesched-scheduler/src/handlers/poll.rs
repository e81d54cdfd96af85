//! POLL handler: validate the poll shape, then create it in the
//! resolved channel. Polls cannot target direct-message surfaces, and
//! creation requires a positive acknowledgment with a message id.

use tracing::info;

use hivesched_core::error::Result;
use hivesched_core::traits::Notifier;
use hivesched_core::types::{DeliveryDetail, PollRequest, TargetResult, Task};

use crate::resolve::ResolvedChannel;

const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;
const DEFAULT_DURATION_HOURS: i64 = 24;

pub async fn create_poll(
    task: &Task,
    question: &str,
    options: &[String],
    duration_hours: Option<i64>,
    target: &str,
    channel: &ResolvedChannel,
    notifier: &dyn Notifier,
) -> Result<TargetResult> {
    if question.trim().is_empty() {
        return Ok(TargetResult::failed(target, "No poll question provided"));
    }
    if options.len() < MIN_OPTIONS {
        return Ok(TargetResult::failed(
            target,
            "Poll requires at least 2 options",
        ));
    }
    if options.len() > MAX_OPTIONS {
        return Ok(TargetResult::failed(
            target,
            "Poll cannot have more than 10 options",
        ));
    }
    if matches!(task.channel.as_str(), "dm" | "group-dm") {
        return Ok(TargetResult::failed(
            target,
            "Cannot create poll in DM channels",
        ));
    }
    let Some(channel_id) = channel.channel_id() else {
        return Ok(TargetResult::failed(target, "No channel_id available"));
    };

    let duration = match duration_hours {
        Some(d) if d > 0 => d,
        _ => DEFAULT_DURATION_HOURS,
    };
    let req = PollRequest {
        agent_id: task.assignee.clone(),
        channel_id: channel_id.to_string(),
        question: question.to_string(),
        options: options.to_vec(),
        duration_hours: duration,
        task_id: task.task_id.clone(),
        target: target.to_string(),
    };

    match notifier.create_poll(&req).await {
        Ok(receipt) => match receipt.message_id {
            Some(message_id) if !message_id.is_empty() => {
                info!(
                    "✅ Poll task {} created in channel {channel_id} ({message_id})",
                    task.task_id
                );
                Ok(TargetResult::ok(
                    target,
                    DeliveryDetail::Poll {
                        message_id,
                        option_count: options.len(),
                    },
                ))
            }
            _ => Ok(TargetResult::failed(
                target,
                "Poll creation error: no message id returned",
            )),
        },
        Err(e) => Ok(TargetResult::failed(
            target,
            format!("Poll creation error: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hivesched_core::error::{HiveError, Result};
    use hivesched_core::types::{
        DeliveryReceipt, MessageRequest, SchedulerParams, TaskKind, TaskStatus,
    };
    use std::sync::Mutex;

    struct FakeNotifier {
        receipt: Option<String>,
        polls: Mutex<Vec<PollRequest>>,
    }

    impl FakeNotifier {
        fn with_receipt(message_id: Option<&str>) -> Self {
            Self {
                receipt: message_id.map(String::from),
                polls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send_message(&self, _req: &MessageRequest) -> Result<DeliveryReceipt> {
            Err(HiveError::Channel("not under test".into()))
        }

        async fn create_poll(&self, req: &PollRequest) -> Result<DeliveryReceipt> {
            self.polls.lock().unwrap().push(req.clone());
            Ok(DeliveryReceipt {
                message_id: self.receipt.clone(),
            })
        }

        async fn post_alert(&self, _content: &str) -> Result<()> {
            Ok(())
        }
    }

    fn poll_task(channel: &str) -> Task {
        Task {
            task_id: "t-7".into(),
            target: "0x01".into(),
            title: "Vote".into(),
            status: TaskStatus::Active,
            next_fire: None,
            last_fired: None,
            error_count: 0,
            last_error: None,
            recurring: None,
            schedule_time: None,
            scheduler_params: SchedulerParams::default(),
            targets: vec![],
            channel: channel.into(),
            channel_id: None,
            assignee: "void-mother".into(),
            agent_params: serde_json::Value::Null,
            kind: TaskKind::Poll {
                question: "Obedience check?".into(),
                options: vec!["yes".into(), "always".into()],
                duration_hours: None,
            },
        }
    }

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("opt-{i}")).collect()
    }

    #[tokio::test]
    async fn test_option_bounds_enforced() {
        let notifier = FakeNotifier::with_receipt(Some("m-1"));
        let task = poll_task("555");
        let channel = ResolvedChannel::Channel("555".into());

        let r = create_poll(&task, "Q?", &options(1), None, "0x01", &channel, &notifier)
            .await
            .unwrap();
        assert_eq!(r.error.as_deref(), Some("Poll requires at least 2 options"));

        let r = create_poll(&task, "Q?", &options(11), None, "0x01", &channel, &notifier)
            .await
            .unwrap();
        assert_eq!(
            r.error.as_deref(),
            Some("Poll cannot have more than 10 options")
        );
        assert!(notifier.polls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dm_modes_rejected_even_with_channel_id() {
        let notifier = FakeNotifier::with_receipt(Some("m-1"));
        let task = poll_task("dm");
        let channel = ResolvedChannel::Channel("555".into());
        let r = create_poll(&task, "Q?", &options(2), None, "0x01", &channel, &notifier)
            .await
            .unwrap();
        assert_eq!(r.error.as_deref(), Some("Cannot create poll in DM channels"));
    }

    #[tokio::test]
    async fn test_duration_defaults_to_24_hours() {
        let notifier = FakeNotifier::with_receipt(Some("m-1"));
        let task = poll_task("555");
        let channel = ResolvedChannel::Channel("555".into());
        let r = create_poll(&task, "Q?", &options(3), None, "0x01", &channel, &notifier)
            .await
            .unwrap();
        assert!(r.success);
        let polls = notifier.polls.lock().unwrap();
        assert_eq!(polls[0].duration_hours, 24);
        match r.detail {
            Some(DeliveryDetail::Poll { option_count, .. }) => assert_eq!(option_count, 3),
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_ack_message_id_is_a_failure() {
        let notifier = FakeNotifier::with_receipt(None);
        let task = poll_task("555");
        let channel = ResolvedChannel::Channel("555".into());
        let r = create_poll(&task, "Q?", &options(2), Some(48), "0x01", &channel, &notifier)
            .await
            .unwrap();
        assert!(!r.success);
        assert_eq!(
            r.error.as_deref(),
            Some("Poll creation error: no message id returned")
        );
    }
}
