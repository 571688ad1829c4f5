//! Event payloads delivered to registered callbacks.
//!
//! Callbacks are plain `Fn` closures appended to per-channel (or
//! per-connection) registration lists. Every registered listener is
//! invoked for each event; invocation order is unspecified. Listeners
//! run on the connection task, so they should hand heavy work off
//! (e.g. through a `tokio::sync::mpsc` sender) rather than block.

use bytes::Bytes;

/// A message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Name of the channel the message arrived on.
    pub channel: String,
    /// Connection id of the publisher.
    pub sender: String,
    /// Raw message bytes.
    pub payload: Bytes,
}

/// A point-to-point message addressed to this connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    /// Connection id of the sender.
    pub sender: String,
    /// Raw message bytes.
    pub payload: Bytes,
}

/// Another connection subscribed to or unsubscribed from a channel we
/// are subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEvent {
    /// Name of the channel the peer joined or left.
    pub channel: String,
    /// Connection id of the peer.
    pub peer: String,
}

pub(crate) type MessageHandler = Box<dyn Fn(&ChannelMessage) + Send + Sync>;
pub(crate) type PeerHandler = Box<dyn Fn(&PeerEvent) + Send + Sync>;
pub(crate) type DirectHandler = Box<dyn Fn(&DirectMessage) + Send + Sync>;
