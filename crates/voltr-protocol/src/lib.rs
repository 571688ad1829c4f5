//! Wire protocol for Voltr.
//!
//! This crate defines the "language" spoken over a Voltr TCP session:
//!
//! - **Framing** ([`encode_frame`], [`decode_frame`]) — the
//!   length-prefixed frame unit (`<decimal-length>:<payload-bytes>`).
//! - **Grammar** ([`Message`], [`ServiceMessage`], [`ControlMessage`],
//!   the [`command`] builders) — how payloads are classified and how
//!   outgoing commands are spelled.
//! - **Errors** ([`ProtocolError`]) — what can go wrong on the wire.
//!
//! The protocol layer is pure: it never touches a socket. The client
//! crate feeds it buffered bytes and sends the bytes it produces.

mod error;
mod frame;
mod message;

pub use error::ProtocolError;
pub use frame::{SEPARATOR, decode_frame, encode_frame, split_identifier};
pub use message::{
    ChannelControl, ControlMessage, Message, ServiceMessage, classify, command,
    parse_channel_control,
};
