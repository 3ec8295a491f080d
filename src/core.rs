//! Core bridge coordination and the connection event loop
//!
//! This module contains the main SignalBridge struct: one task that owns
//! every channel subscription, multiplexes their readiness behind a single
//! bounded wait, drains pending notifications into the signal sink, and
//! retries dropped connections on a fixed cadence.

use std::time::Duration;

use futures::FutureExt;
use futures::future::select_all;
use tokio::time::{sleep, timeout};

use crate::connector::{
    ChannelNotification, ChannelStream, Connector, ConnectorError, PgConnector,
};
use crate::dispatcher::{ProcessSignalSink, SignalSink};
use crate::errors::BridgeError;
use crate::subscription::SubscriptionSpec;
use config::BridgeConfig;

/// Runtime state for one configured subscription.
///
/// Handles live for the whole process and are reused across reconnect
/// attempts; `stream` is `Some` exactly while the subscription holds a
/// healthy session.
pub struct ConnectionHandle {
    spec: SubscriptionSpec,
    stream: Option<Box<dyn ChannelStream>>,
}

impl ConnectionHandle {
    fn new(spec: SubscriptionSpec) -> Self {
        Self { spec, stream: None }
    }

    /// The immutable subscription this handle serves.
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    /// Whether the subscription currently holds a live session.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Main coordinator that bridges channel notifications to the signal sink.
///
/// Owns all connection handles, the connector and the sink; nothing else
/// touches them, so the loop runs without any locking.
pub struct SignalBridge {
    handles: Vec<ConnectionHandle>,
    connector: Box<dyn Connector>,
    sink: Box<dyn SignalSink>,
    retry_interval: Duration,
}

impl SignalBridge {
    /// Creates a bridge that raises OS signals in the current process.
    ///
    /// Fails if any subscription entry is malformed; nothing is connected
    /// yet at that point.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Self::with_sink(config, Box::new(ProcessSignalSink))
    }

    /// Creates a bridge delivering signal numbers to a custom sink.
    pub fn with_sink(
        config: &BridgeConfig,
        sink: Box<dyn SignalSink>,
    ) -> Result<Self, BridgeError> {
        let specs = config
            .subscriptions
            .iter()
            .map(|entry| SubscriptionSpec::parse(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_collaborators(
            specs,
            Box::new(PgConnector),
            sink,
            Duration::from_secs(config.retry_interval_seconds),
        ))
    }

    /// Assembles a bridge from parsed specs and explicit collaborators.
    pub fn with_collaborators(
        specs: Vec<SubscriptionSpec>,
        connector: Box<dyn Connector>,
        sink: Box<dyn SignalSink>,
        retry_interval: Duration,
    ) -> Self {
        Self {
            handles: specs.into_iter().map(ConnectionHandle::new).collect(),
            connector,
            sink,
            retry_interval,
        }
    }

    /// The configured subscriptions and their connection state.
    pub fn handles(&self) -> &[ConnectionHandle] {
        &self.handles
    }

    /// Runs the bridge forever: one startup connection pass, then an
    /// endless wait/dispatch/reconnect cycle.
    ///
    /// The loop has no exit path; hosts stop the bridge by dropping the
    /// task that runs it.
    pub async fn run(mut self) {
        self.connect_pass().await;
        loop {
            self.poll_once().await;
        }
    }

    /// Attempts to connect every currently disconnected subscription.
    ///
    /// One attempt per handle per call; failures leave the handle
    /// disconnected for the next pass.
    async fn connect_pass(&mut self) {
        for handle in self.handles.iter_mut().filter(|h| h.stream.is_none()) {
            match self.connector.connect(&handle.spec).await {
                Ok(stream) => {
                    tracing::debug!(
                        "listening to channel \"{}\" for signal {}",
                        handle.spec.channel,
                        handle.spec.signum
                    );
                    handle.stream = Some(stream);
                }
                Err(err) => {
                    tracing::debug!("channel \"{}\": {}", handle.spec.channel, err);
                }
            }
        }
    }

    /// One cycle of the main loop: a bounded wait for activity on any
    /// connected subscription, then dispatch, demotion or a reconnect pass.
    async fn poll_once(&mut self) {
        if !self.handles.iter().any(ConnectionHandle::is_connected) {
            // Nothing to wait on; the wait could only time out, so sleep
            // the period and retry connections.
            sleep(self.retry_interval).await;
            self.connect_pass().await;
            return;
        }

        let fired = {
            let recvs = self
                .handles
                .iter_mut()
                .enumerate()
                .filter_map(|(idx, handle)| {
                    handle
                        .stream
                        .as_mut()
                        .map(|stream| async move { (idx, stream.recv().await) }.boxed())
                })
                .collect::<Vec<_>>();

            // One ready subscription per wait; the others stay ready and
            // resolve again on the next cycle.
            match timeout(self.retry_interval, select_all(recvs)).await {
                Ok((ready, _, _)) => Some(ready),
                Err(_) => None,
            }
        };

        match fired {
            // The wait timed out. This is the only moment disconnected
            // subscriptions are retried.
            None => {
                crate::debug_log!("wait timed out, retrying disconnected channels");
                self.connect_pass().await;
            }
            Some((idx, Ok(Some(notification)))) => self.drain(idx, notification),
            Some((idx, Ok(None))) => self.demote(idx, None),
            Some((idx, Err(err))) => self.demote(idx, Some(err)),
        }
    }

    /// Dispatches one signal per pending notification on the ready handle,
    /// emptying its queue before the next wait.
    fn drain(&mut self, idx: usize, first: ChannelNotification) {
        let handle = &mut self.handles[idx];
        let signum = handle.spec.signum;
        let mut next = Some(first);

        while let Some(notification) = next.take() {
            tracing::debug!(
                "received notification for {} by PID {}",
                notification.channel,
                notification.process_id
            );
            crate::trace_log!("notification payload: {:?}", notification.payload);
            self.sink.send(signum);

            let Some(stream) = handle.stream.as_mut() else {
                break;
            };
            // Polling the receive future exactly once pops a buffered
            // notification without waiting on the socket.
            next = match stream.recv().now_or_never() {
                Some(Ok(Some(notification))) => Some(notification),
                Some(Ok(None)) => {
                    tracing::debug!(
                        "lost connection for channel \"{}\"",
                        handle.spec.channel
                    );
                    handle.stream = None;
                    None
                }
                Some(Err(err)) => {
                    tracing::debug!(
                        "lost connection for channel \"{}\": {}",
                        handle.spec.channel,
                        err
                    );
                    handle.stream = None;
                    None
                }
                None => None,
            };
        }
    }

    /// Drops a lost session. The handle is picked up again by the next
    /// timeout-triggered connect pass, never immediately.
    fn demote(&mut self, idx: usize, err: Option<ConnectorError>) {
        let handle = &mut self.handles[idx];
        handle.stream = None;
        match err {
            Some(err) => tracing::debug!(
                "lost connection for channel \"{}\": {}",
                handle.spec.channel,
                err
            ),
            None => tracing::debug!("lost connection for channel \"{}\"", handle.spec.channel),
        }
    }
}
