//! # Hivesched Providers
//!
//! Reasoning-backend client for the query-for-update agentic loop.
//! Any OpenAI-compatible chat-completions endpoint works — the backend
//! is distinguished only by base URL, API key, and model name.

pub mod reasoning;

use hivesched_core::config::ReasoningConfig;
use hivesched_core::error::Result;
use hivesched_core::traits::Provider;

/// Create the reasoning-backend provider from configuration.
pub fn create_provider(config: &ReasoningConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(reasoning::ReasoningClient::new(config)))
}
