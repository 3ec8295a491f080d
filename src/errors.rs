//! Error types for the pgsignal crate
//!
//! This module contains the fatal, construction-time errors. Runtime
//! connection failures are handled inside the event loop and never
//! propagate; see [`crate::connector::ConnectorError`] for that class.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid subscription entry '{entry}', must be <signum> <channel> <connectionstring>")]
    InvalidSubscription { entry: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
