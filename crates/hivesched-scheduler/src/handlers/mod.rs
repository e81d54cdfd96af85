//! Per-kind task handlers. Each takes one resolved target and returns
//! a [`hivesched_core::types::TargetResult`]; validation and delivery
//! failures come back as failed results with operator-readable
//! messages, `Err` is reserved for internal faults the router catches.

pub mod message;
pub mod poll;
pub mod query;
