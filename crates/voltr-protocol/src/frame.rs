//! Length-prefixed framing codec.
//!
//! A frame is the ASCII decimal byte-length of the payload, a `:`
//! separator, then exactly that many raw payload bytes:
//!
//! ```text
//! ┌────────────────┬─────┬──────────────────┐
//! │ Length (ASCII) │ ':' │ Payload (Length) │
//! │ "21"           │     │ raw bytes        │
//! └────────────────┴─────┴──────────────────┘
//! ```
//!
//! Payload bytes are never re-scanned for framing characters — a
//! payload may freely contain `:` and digit bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// The `:` byte that terminates the length field and splits message
/// payloads.
pub const SEPARATOR: u8 = b':';

/// Maximum number of digits accepted in the length field. Ten digits
/// cover every frame the service can plausibly send; anything longer
/// means the stream is not carrying framed Voltr traffic.
pub const MAX_LENGTH_DIGITS: usize = 10;

/// Encodes a payload into the wire format, appending to `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    let prefix = payload.len().to_string();
    dst.reserve(prefix.len() + 1 + payload.len());
    dst.put_slice(prefix.as_bytes());
    dst.put_u8(SEPARATOR);
    dst.put_slice(payload);
}

/// Decodes one frame from the front of `src`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete
/// frame (length field still open, or payload bytes outstanding) —
/// the caller reads more bytes and retries. On success the frame is
/// consumed from `src` and the payload returned.
///
/// # Errors
///
/// - [`ProtocolError::InvalidLength`] if a non-digit byte appears
///   before the `:`, the length field is empty, or the length does
///   not fit in a `usize`.
/// - [`ProtocolError::MissingSeparator`] if more than
///   [`MAX_LENGTH_DIGITS`] digits accumulate without a `:`.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
    // Scan the length field: digits until ':'.
    let mut end = None;
    for (i, &b) in src.iter().enumerate() {
        match b {
            b'0'..=b'9' if i < MAX_LENGTH_DIGITS => continue,
            b'0'..=b'9' => {
                return Err(ProtocolError::MissingSeparator(MAX_LENGTH_DIGITS));
            }
            SEPARATOR => {
                end = Some(i);
                break;
            }
            other => {
                return Err(ProtocolError::InvalidLength(format!(
                    "unexpected byte 0x{other:02x} in length field"
                )));
            }
        }
    }

    let Some(digits) = end else {
        return Ok(None); // Length field still open.
    };
    if digits == 0 {
        return Err(ProtocolError::InvalidLength("empty length field".into()));
    }

    // The scan guarantees ASCII digits, so UTF-8 and parse cannot fail
    // short of overflow.
    let text = std::str::from_utf8(&src[..digits])
        .map_err(|e| ProtocolError::InvalidLength(e.to_string()))?;
    let len: usize = text
        .parse()
        .map_err(|_| ProtocolError::InvalidLength(format!("length {text} overflows")))?;

    if src.len() < digits + 1 + len {
        return Ok(None); // Payload bytes outstanding.
    }

    src.advance(digits + 1);
    Ok(Some(src.split_to(len).freeze()))
}

/// Splits `raw` at the first `:` into a leading UTF-8 identifier and
/// the remaining bytes. The remainder is never re-scanned, so it may
/// itself contain `:`.
pub fn split_identifier(raw: &Bytes) -> Result<(String, Bytes), ProtocolError> {
    let at = raw
        .iter()
        .position(|&b| b == SEPARATOR)
        .ok_or_else(|| ProtocolError::InvalidMessage("no ':' separator in payload".into()))?;
    let id = std::str::from_utf8(&raw[..at])
        .map_err(|_| ProtocolError::InvalidMessage("identifier is not UTF-8".into()))?
        .to_string();
    Ok((id, raw.slice(at + 1..)))
}
