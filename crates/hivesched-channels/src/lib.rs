//! # Hivesched Channels
//! Outbound delivery surface: the dronebot HTTP API that actually
//! posts messages, creates polls, raises operational alerts, and
//! resolves role membership.

pub mod dronebot;

pub use dronebot::DronebotClient;
