//! Database-side capability: opening channel subscriptions and pulling
//! notifications from them
//!
//! [`PgConnector`] and [`PgChannelStream`] are the sqlx-backed
//! implementations. The traits exist so the event loop can be driven
//! against scripted implementations in tests.

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgNotification};
use thiserror::Error;

use crate::subscription::SubscriptionSpec;

/// Errors from opening or reading a channel subscription.
///
/// These are handled inside the event loop (the handle stays disconnected
/// and is retried on the next timeout tick); they never terminate the bridge.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("{listen_command} failed: {source}")]
    Listen {
        listen_command: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("connection lost: {0}")]
    Receive(#[source] sqlx::Error),
}

/// An asynchronous notification as surfaced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNotification {
    /// Channel the notification was signalled on.
    pub channel: String,
    /// Backend PID of the announcing session.
    pub process_id: u32,
    /// Payload attached by the announcing session (empty when none).
    pub payload: String,
}

impl From<PgNotification> for ChannelNotification {
    fn from(notification: PgNotification) -> Self {
        Self {
            channel: notification.channel().to_string(),
            process_id: notification.process_id(),
            payload: notification.payload().to_string(),
        }
    }
}

/// A live subscription delivering notifications for a single channel.
#[async_trait]
pub trait ChannelStream: Send {
    /// Waits for the next notification.
    ///
    /// Returns `Ok(None)` when the server connection is lost. Callers drain
    /// already-buffered notifications without blocking by polling the
    /// returned future exactly once (`now_or_never`).
    async fn recv(&mut self) -> Result<Option<ChannelNotification>, ConnectorError>;
}

/// Establishes channel subscriptions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a database session and subscribes it to the channel named in
    /// `spec`. No retries happen here; retry cadence belongs to the caller.
    async fn connect(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Box<dyn ChannelStream>, ConnectorError>;
}

/// sqlx-backed [`Connector`].
#[derive(Debug, Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<Box<dyn ChannelStream>, ConnectorError> {
        let mut listener = PgListener::connect(&spec.connection_string)
            .await
            .map_err(ConnectorError::Connect)?;

        // Issues the LISTEN statement; a rejected channel name surfaces
        // here. The session is torn down by drop on the error path.
        listener
            .listen(&spec.channel)
            .await
            .map_err(|source| ConnectorError::Listen {
                listen_command: spec.listen_command.clone(),
                source,
            })?;

        Ok(Box::new(PgChannelStream { inner: listener }))
    }
}

/// [`ChannelStream`] over a live `PgListener` session.
pub struct PgChannelStream {
    inner: PgListener,
}

#[async_trait]
impl ChannelStream for PgChannelStream {
    async fn recv(&mut self) -> Result<Option<ChannelNotification>, ConnectorError> {
        // try_recv reports a lost connection as Ok(None) instead of silently
        // reconnecting; the bridge owns the reconnect cadence, so the whole
        // stream is dropped on that path before sqlx could re-establish it.
        self.inner
            .try_recv()
            .await
            .map(|notification| notification.map(ChannelNotification::from))
            .map_err(ConnectorError::Receive)
    }
}
