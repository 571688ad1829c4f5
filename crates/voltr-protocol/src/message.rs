//! Message grammar: classification of inbound payloads and builders
//! for outbound command payloads.
//!
//! Every decoded frame payload is one of three kinds, selected by its
//! first byte:
//!
//! - `@` — a direct message: `@<sender-cid>:<payload>`
//! - `!` — a service (control) message, UTF-8 text. Text starting
//!   with `_` is a global control message (`_connected <cid>`,
//!   `_created <name>`, `_createfailed`); anything else is scoped to
//!   a channel: `<channel>:<control-text>`.
//! - anything else — a channel message: `<channel>:<sender>:<payload>`

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::frame::split_identifier;

/// A classified inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A point-to-point message addressed to this connection.
    Direct {
        /// Connection id of the sender.
        sender: String,
        /// Raw message bytes.
        payload: Bytes,
    },

    /// A protocol control message.
    Service(ServiceMessage),

    /// A message published on a channel. The payload still embeds the
    /// sender cid before a `:` — splitting it is the channel's job.
    Channel {
        /// The channel the message was published on.
        channel: String,
        /// `<sender>:<payload>` bytes.
        payload: Bytes,
    },
}

/// A control message, either connection-global or channel-scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMessage {
    /// A global control message (`!_...` on the wire).
    Global(ControlMessage),

    /// A control message addressed to one channel.
    Scoped {
        /// The target channel name.
        channel: String,
        /// The control text, e.g. `subscribed bob`.
        text: String,
    },
}

/// Global control operations the server can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Handshake acknowledgment carrying our connection id.
    Connected(String),

    /// An anonymous channel creation succeeded; carries the
    /// server-assigned channel name.
    Created(String),

    /// An anonymous channel creation was rejected.
    CreateFailed,
}

/// A control event scoped to a channel: another connection joined or
/// left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelControl {
    /// `subscribed <cid>` — a peer subscribed to the channel.
    PeerSubscribed(String),
    /// `unsubscribed <cid>` — a peer unsubscribed from the channel.
    PeerUnsubscribed(String),
}

/// Classifies a decoded frame payload.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidMessage`] for an empty payload,
/// missing separators, or non-UTF-8 control text. These are
/// payload-level errors: framing is intact and the stream usable.
pub fn classify(payload: Bytes) -> Result<Message, ProtocolError> {
    let Some(&first) = payload.first() else {
        return Err(ProtocolError::InvalidMessage("empty payload".into()));
    };

    match first {
        b'@' => {
            let rest = payload.slice(1..);
            let (sender, body) = split_identifier(&rest)?;
            Ok(Message::Direct {
                sender,
                payload: body,
            })
        }
        b'!' => {
            let text = std::str::from_utf8(&payload[1..]).map_err(|_| {
                ProtocolError::InvalidMessage("service message is not UTF-8".into())
            })?;
            Ok(Message::Service(parse_service(text)?))
        }
        _ => {
            let (channel, body) = split_identifier(&payload)?;
            Ok(Message::Channel {
                channel,
                payload: body,
            })
        }
    }
}

/// Parses service message text, already stripped of the leading `!`.
fn parse_service(text: &str) -> Result<ServiceMessage, ProtocolError> {
    if let Some(global) = text.strip_prefix('_') {
        return Ok(ServiceMessage::Global(parse_control(global)?));
    }

    let (channel, rest) = text.split_once(':').ok_or_else(|| {
        ProtocolError::InvalidMessage(format!("scoped service message without ':': {text}"))
    })?;
    Ok(ServiceMessage::Scoped {
        channel: channel.to_string(),
        text: rest.to_string(),
    })
}

/// Parses a global control message of the form `<op> <argument>`.
fn parse_control(text: &str) -> Result<ControlMessage, ProtocolError> {
    let (op, arg) = match text.split_once(' ') {
        Some((op, arg)) => (op, Some(arg)),
        None => (text, None),
    };
    match (op, arg) {
        ("connected", Some(cid)) => Ok(ControlMessage::Connected(cid.to_string())),
        ("created", Some(name)) => Ok(ControlMessage::Created(name.to_string())),
        ("createfailed", _) => Ok(ControlMessage::CreateFailed),
        _ => Err(ProtocolError::InvalidMessage(format!(
            "unknown control operation: {op}"
        ))),
    }
}

/// Parses channel-scoped control text (`subscribed <cid>` /
/// `unsubscribed <cid>`).
///
/// Returns `Ok(None)` for unknown operations — the protocol may grow
/// new ones, and the client ignores what it does not understand.
pub fn parse_channel_control(text: &str) -> Result<Option<ChannelControl>, ProtocolError> {
    let (op, cid) = text.split_once(' ').ok_or_else(|| {
        ProtocolError::InvalidMessage(format!("channel control without argument: {text}"))
    })?;
    Ok(match op {
        "subscribed" => Some(ChannelControl::PeerSubscribed(cid.to_string())),
        "unsubscribed" => Some(ChannelControl::PeerUnsubscribed(cid.to_string())),
        _ => None,
    })
}

/// Builders for the outgoing command payloads. Each returns the raw
/// payload bytes ready for [`encode_frame`](crate::encode_frame).
pub mod command {
    use super::*;

    /// The placeholder name for an anonymous subscription.
    pub const ANONYMOUS: &str = "_";

    /// `subscribe <name>`, or `subscribe _` for an anonymous channel.
    pub fn subscribe(name: Option<&str>) -> Bytes {
        Bytes::from(format!("subscribe {}", name.unwrap_or(ANONYMOUS)))
    }

    /// `unsubscribe <name>`
    pub fn unsubscribe(name: &str) -> Bytes {
        Bytes::from(format!("unsubscribe {name}"))
    }

    /// `publish <name> <payload>`
    pub fn publish(name: &str, payload: &[u8]) -> Bytes {
        with_payload(&format!("publish {name} "), payload)
    }

    /// `broadcast <name> <payload>`
    pub fn broadcast(name: &str, payload: &[u8]) -> Bytes {
        with_payload(&format!("broadcast {name} "), payload)
    }

    /// `send @<cid> <payload>`
    pub fn send_direct(cid: &str, payload: &[u8]) -> Bytes {
        with_payload(&format!("send @{cid} "), payload)
    }

    fn with_payload(prefix: &str, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(prefix.len() + payload.len());
        buf.put_slice(prefix.as_bytes());
        buf.put_slice(payload);
        buf.freeze()
    }
}
