//! Error types for the protocol layer.

/// Errors that can occur while framing or parsing Voltr wire traffic.
///
/// Framing errors ([`MissingSeparator`](Self::MissingSeparator),
/// [`InvalidLength`](Self::InvalidLength)) mean the frame boundary is
/// lost — the stream cannot be trusted afterwards. Grammar errors
/// ([`InvalidMessage`](Self::InvalidMessage)) concern a single payload
/// and leave the framing intact.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The length field ran past its digit budget without a `:`.
    #[error("no ':' separator within the first {0} bytes of the frame")]
    MissingSeparator(usize),

    /// The length field is empty, contains a non-digit byte, or does
    /// not fit in a `usize`.
    #[error("invalid frame length field: {0}")]
    InvalidLength(String),

    /// The payload violates the message grammar.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
