//! # Hivesched Core
//! Shared foundation for the Hivesched workspace: configuration,
//! the error type, the task data model, and the traits every external
//! collaborator (task store, notification channel, reasoning backend,
//! role directory, drone data store) is consumed through.
//!
//! Collaborators are always trait objects injected at construction —
//! nothing in this workspace talks to a global client.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::HiveConfig;
pub use error::{HiveError, Result};
