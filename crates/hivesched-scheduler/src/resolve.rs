//! Channel resolution — which delivery surface a dispatch addresses.
//!
//! Precedence: a channel id pre-resolved at creation time wins; a
//! numeric channel mode is itself a channel id; "dm" addresses the
//! target directly; the remaining group modes need an id that was
//! never resolved and stay undeliverable.

use tracing::warn;

use hivesched_core::types::Task;

/// Where a dispatch goes, or the explicit statement that it can't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedChannel {
    /// A concrete channel id.
    Channel(String),
    /// Direct delivery to the named target.
    Direct(String),
    /// No deliverable surface. The dispatch fails with
    /// `channel_resolution_failed`.
    Unresolved,
}

impl ResolvedChannel {
    /// Split into the (`channel_id`, `direct_target`) pair a
    /// [`hivesched_core::types::MessageRequest`] carries. At most one
    /// side is set.
    pub fn as_parts(&self) -> (Option<String>, Option<String>) {
        match self {
            ResolvedChannel::Channel(id) => (Some(id.clone()), None),
            ResolvedChannel::Direct(target) => (None, Some(target.clone())),
            ResolvedChannel::Unresolved => (None, None),
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            ResolvedChannel::Channel(id) => Some(id),
            _ => None,
        }
    }
}

pub fn resolve_channel(task: &Task, target: &str) -> ResolvedChannel {
    if let Some(id) = task.channel_id.as_deref() {
        if !id.is_empty() {
            return ResolvedChannel::Channel(id.to_string());
        }
    }

    let mode = task.channel.as_str();
    if !mode.is_empty() && mode.bytes().all(|b| b.is_ascii_digit()) {
        return ResolvedChannel::Channel(mode.to_string());
    }

    match mode {
        "dm" => ResolvedChannel::Direct(target.to_string()),
        "group-dm" | "priv-chan" | "priv-chan-group" => {
            warn!(
                "⚠️ Task {} uses channel mode '{mode}' with no resolved channel_id",
                task.task_id
            );
            ResolvedChannel::Unresolved
        }
        other => {
            warn!("⚠️ Task {} has unrecognized channel mode '{other}'", task.task_id);
            ResolvedChannel::Unresolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivesched_core::types::{SchedulerParams, TaskKind, TaskStatus};

    fn task(channel: &str, channel_id: Option<&str>) -> Task {
        Task {
            task_id: "t-1".into(),
            target: "0x01".into(),
            title: String::new(),
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
            channel_id: channel_id.map(String::from),
            assignee: "void-mother".into(),
            agent_params: serde_json::Value::Null,
            kind: TaskKind::Message {
                content: String::new(),
            },
        }
    }

    #[test]
    fn test_pre_resolved_id_wins_over_mode() {
        let resolved = resolve_channel(&task("dm", Some("555")), "0x01");
        assert_eq!(resolved, ResolvedChannel::Channel("555".into()));
    }

    #[test]
    fn test_numeric_mode_is_a_channel_id() {
        let resolved = resolve_channel(&task("123456", None), "0x01");
        assert_eq!(resolved, ResolvedChannel::Channel("123456".into()));
    }

    #[test]
    fn test_dm_addresses_the_target() {
        let resolved = resolve_channel(&task("dm", None), "0x07");
        assert_eq!(resolved, ResolvedChannel::Direct("0x07".into()));
    }

    #[test]
    fn test_group_modes_without_id_stay_unresolved() {
        for mode in ["group-dm", "priv-chan", "priv-chan-group", "what"] {
            let resolved = resolve_channel(&task(mode, None), "0x07");
            assert_eq!(resolved, ResolvedChannel::Unresolved, "mode {mode}");
        }
    }
}
