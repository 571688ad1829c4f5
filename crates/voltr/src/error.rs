//! Unified error type for the Voltr client.

use voltr_protocol::ProtocolError;

/// Errors that can occur while operating a Voltr connection or one of
/// its channels.
///
/// The `#[from]` variants let `?` convert protocol and I/O errors
/// automatically; the rest are operational errors with a precise
/// meaning in the subscription state machine.
#[derive(Debug, thiserror::Error)]
pub enum VoltrError {
    /// The first frame after connecting did not establish an active
    /// session. The transport has been closed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The operation requires an active session (successful handshake,
    /// not yet closed or dropped by the server).
    #[error("connection is not active")]
    NotActive,

    /// `subscribe` on a channel that is already subscribed.
    #[error("already subscribed to this channel")]
    AlreadySubscribed,

    /// `unsubscribe` on a channel that is not subscribed.
    #[error("not subscribed to this channel")]
    NotSubscribed,

    /// The channel (or another anonymous subscription on this
    /// connection) is awaiting the server's create acknowledgment and
    /// cannot be operated on until it arrives.
    #[error("a subscribe is awaiting the server's response")]
    SubscribePending,

    /// The server rejected this channel's creation. Request a new
    /// channel from the connection.
    #[error("channel creation was rejected; request a new channel")]
    ChannelErrored,

    /// The operation needs a channel name, but the server has not
    /// assigned one.
    #[error("channel has no name")]
    Unnamed,

    /// The channel is already in the tracked registry.
    #[error("channel is already tracked")]
    AlreadyTracked,

    /// The channel is not in the tracked registry.
    #[error("channel is not tracked")]
    NotTracked,

    /// A wire-level framing or grammar error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport I/O failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The connection task is gone (the connection was closed).
    #[error("connection closed")]
    ConnectionClosed,
}
