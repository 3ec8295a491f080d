//! Signal dispatch
//!
//! The delivery side of the bridge is fire-and-forget: one notification
//! produces exactly one `send` call, with no deduplication, coalescing or
//! rate limiting, however fast notifications arrive.

use nix::sys::signal::{Signal, raise};
use tokio::sync::mpsc;

/// Delivery channel for raised signal numbers.
///
/// Injectable so hosts can route signals their own way and tests can assert
/// call sequences without a real signal sink.
pub trait SignalSink: Send {
    /// Fire-and-forget delivery of one signal number.
    fn send(&mut self, signum: u8);
}

/// Raises the numbered OS signal in the current process.
#[derive(Debug, Default)]
pub struct ProcessSignalSink;

impl SignalSink for ProcessSignalSink {
    fn send(&mut self, signum: u8) {
        match Signal::try_from(i32::from(signum)) {
            Ok(signal) => {
                if let Err(err) = raise(signal) {
                    tracing::debug!("raising signal {} failed: {}", signum, err);
                }
            }
            Err(_) => tracing::debug!("signal number {} names no OS signal", signum),
        }
    }
}

/// Forwards signal numbers into an unbounded channel, for hosts that deliver
/// signals through their own machinery.
#[derive(Debug)]
pub struct ChannelSignalSink {
    tx: mpsc::UnboundedSender<u8>,
}

impl ChannelSignalSink {
    /// Creates the sink plus the receiving end the host consumes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalSink for ChannelSignalSink {
    fn send(&mut self, signum: u8) {
        // A closed receiver means the host no longer cares; delivery is
        // fire-and-forget either way.
        let _ = self.tx.send(signum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_in_order() {
        let (mut sink, mut rx) = ChannelSignalSink::new();

        sink.send(5);
        sink.send(9);
        sink.send(5);

        assert_eq!(rx.try_recv().unwrap(), 5);
        assert_eq!(rx.try_recv().unwrap(), 9);
        assert_eq!(rx.try_recv().unwrap(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_survives_a_dropped_receiver() {
        let (mut sink, rx) = ChannelSignalSink::new();
        drop(rx);

        sink.send(5);
    }

    #[test]
    fn process_sink_swallows_numbers_naming_no_signal() {
        let mut sink = ProcessSignalSink;

        // 0 and 255 name no OS signal; send must not panic.
        sink.send(0);
        sink.send(255);
    }
}
