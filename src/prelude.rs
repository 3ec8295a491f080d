//! Convenience re-exports for common pgsignal usage
//!
//! This prelude module re-exports the most commonly used items from the
//! crate, making it easier to import everything you need with a single use
//! statement.
//!
//! # Example
//!
//! ```rust
//! use pgsignal::prelude::*;
//!
//! // Now you have access to all the common pgsignal types and traits
//! ```

// Core bridge components
pub use crate::core::{ConnectionHandle, SignalBridge};
pub use crate::errors::BridgeError;
pub use crate::subscription::SubscriptionSpec;

// Connector capability and its sqlx-backed implementation
pub use crate::connector::{
    ChannelNotification, ChannelStream, Connector, ConnectorError, PgConnector,
};

// Signal delivery
pub use crate::dispatcher::{ChannelSignalSink, ProcessSignalSink, SignalSink};

// Re-export centralized config
pub use config::{AppConfig, BridgeConfig, ConfigError};

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;
