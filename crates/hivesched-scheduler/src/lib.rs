//! # Hivesched Scheduler
//!
//! The task scheduling & dispatch engine. One scheduler pass:
//!
//! ```text
//! SchedulerEngine::run_once
//!   ├── TaskStore: status=active, next_fire ≤ now
//!   └── per task → DispatchRouter
//!         ├── execution-rate gate (probabilistic firing)
//!         ├── expand targets (role: references → members, deduped)
//!         ├── resolve channel (pre-resolved id | numeric | dm | unresolved)
//!         ├── handler: MESSAGE | POLL | QUERY-FOR-UPDATE (agentic loop)
//!         └── aggregate per-target results
//!   └── reconcile: fired → advance schedule; errored → record + alert
//! ```
//!
//! Failures are isolated per target; an errored task keeps its
//! `next_fire` untouched so the next scan retries it.

pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod recurrence;
pub mod resolve;
pub mod store;
pub mod targets;

pub use dispatch::DispatchRouter;
pub use engine::SchedulerEngine;
pub use resolve::ResolvedChannel;
pub use store::{FileDroneStore, FileTaskStore};
