//! Message assembly: from frame bytes to a [`Message`].
//!
//! [`RelayCodec`] is the entry point. It is a plain value holding the
//! configured [`DecodeLimits`]; decoding borrows it immutably and keeps no
//! state between calls, so decoding the same bytes twice gives the same
//! result and one codec can be shared freely across tasks.
//!
//! ```text
//! frame bytes ─→ header ─→ (inflate) ─→ identifier ─→ (type, value)*
//! ```

use std::io::{ErrorKind, Read};

use crate::cursor::Cursor;
use crate::decode::{decode_text, decode_type, decode_value, Nullable};
use crate::frame::{inflate, DecodeLimits, FrameHeader, HEADER_LEN};
use crate::types::Message;
use crate::ProtocolError;

/// Decoder for relay frames.
///
/// ## Example
///
/// ```rust
/// use weerelay_protocol::{RelayCodec, TypeTag, Value};
///
/// // length 16, uncompressed, identifier "", one int 42
/// let frame = [
///     0, 0, 0, 16, 0,
///     0, 0, 0, 0,
///     b'i', b'n', b't', 0, 0, 0, 42,
/// ];
///
/// let msg = RelayCodec::default().decode_frame(&frame).unwrap();
/// assert_eq!(msg.identifier, "");
/// assert_eq!(msg.body, vec![(TypeTag::Int, Value::Int(42))]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCodec {
    limits: DecodeLimits,
}

impl RelayCodec {
    /// Creates a codec with the given limits.
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Returns the limits this codec enforces.
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decodes one complete frame held in memory.
    ///
    /// `frame` must be exactly the bytes the header declares: fewer is
    /// [`ProtocolError::Truncated`], more is
    /// [`ProtocolError::FramingMismatch`].
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Message, ProtocolError> {
        let header_bytes: &[u8; HEADER_LEN] = frame
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(ProtocolError::Truncated {
                needed: HEADER_LEN,
                available: frame.len(),
            })?;
        let header = FrameHeader::parse_checked(header_bytes, &self.limits)?;

        let body = &frame[HEADER_LEN..];
        if body.len() < header.body_len() {
            // Hand the short body to the assembler: the step that runs out
            // of bytes reports how far it got.
            if header.compressed {
                return Err(ProtocolError::Truncated {
                    needed: header.body_len(),
                    available: body.len(),
                });
            }
            return self.assemble(header, body, header.body_len());
        }
        if body.len() > header.body_len() {
            return Err(ProtocolError::FramingMismatch(format!(
                "frame holds {} body bytes, header declares {}",
                body.len(),
                header.body_len()
            )));
        }
        self.decode_body(header, body)
    }

    /// Decodes a body whose header was already read.
    ///
    /// `body` must be exactly `header.body_len()` bytes as they came off
    /// the wire (still compressed if the header says so).
    pub fn decode_body(
        &self,
        header: FrameHeader,
        body: &[u8],
    ) -> Result<Message, ProtocolError> {
        if body.len() != header.body_len() {
            return Err(ProtocolError::FramingMismatch(format!(
                "body is {} bytes, header declares {}",
                body.len(),
                header.body_len()
            )));
        }
        if header.compressed {
            let payload = inflate(body, &self.limits)?;
            tracing::trace!(
                compressed = body.len(),
                inflated = payload.len(),
                "inflated frame body"
            );
            self.assemble(header, &payload, payload.len())
        } else {
            self.assemble(header, body, body.len())
        }
    }

    /// Reads and decodes one message from a blocking byte source.
    ///
    /// Reads exactly the header and the body it declares, nothing more,
    /// so the source is left positioned at the next frame.
    pub fn read_message<R: Read>(&self, reader: &mut R) -> Result<Message, ProtocolError> {
        let mut header_bytes = [0u8; HEADER_LEN];
        read_exact(reader, &mut header_bytes)?;
        let header = FrameHeader::parse_checked(&header_bytes, &self.limits)?;

        let mut body = vec![0u8; header.body_len()];
        read_exact(reader, &mut body)?;
        self.decode_body(header, &body)
    }

    /// Reads the identifier then `(type, value)` pairs until the budget
    /// is spent.
    fn assemble(
        &self,
        header: FrameHeader,
        payload: &[u8],
        budget: usize,
    ) -> Result<Message, ProtocolError> {
        let mut c = Cursor::with_budget(payload, budget).with_max_depth(self.limits.max_depth);

        let identifier = decode_text(&mut c)?;
        let mut body = Vec::new();
        while c.remaining() > 0 {
            let tag = decode_type(&mut c)?;
            let value = decode_value(&mut c, tag, Nullable::No)?;
            body.push((tag, value));
        }

        // The budget is spent; any bytes the buffer still holds were never
        // accounted for.
        if c.available() != 0 {
            return Err(ProtocolError::FramingMismatch(format!(
                "{} payload bytes left after budget reached zero",
                c.available()
            )));
        }

        tracing::trace!(
            identifier = %identifier,
            items = body.len(),
            length = header.length,
            compressed = header.compressed,
            "decoded message"
        );

        Ok(Message {
            length: header.length,
            compressed: header.compressed,
            identifier,
            body,
        })
    }
}

/// `read_exact` with the short-read case reported as truncation.
fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    needed: buf.len(),
                    available: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ProtocolError::Io {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeTag, Value};

    #[test]
    fn test_decode_minimal_frame() {
        // length 9: header + empty identifier, no items.
        let msg = RelayCodec::default()
            .decode_frame(&[0, 0, 0, 9, 0, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(msg.length, 9);
        assert!(!msg.compressed);
        assert_eq!(msg.identifier, "");
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_decode_frame_with_absent_identifier_reads_empty() {
        let msg = RelayCodec::default()
            .decode_frame(&[0, 0, 0, 9, 0, 0xFF, 0xFF, 0xFF, 0xFF])
            .unwrap();
        assert_eq!(msg.identifier, "");
    }

    #[test]
    fn test_decode_frame_shorter_than_header() {
        assert_eq!(
            RelayCodec::default().decode_frame(&[0, 0, 0]),
            Err(ProtocolError::Truncated {
                needed: 5,
                available: 3
            })
        );
    }

    #[test]
    fn test_identifier_truncated() {
        // Declares 9 bytes; identifier length says 5 more than exist.
        let frame = [0, 0, 0, 9, 0, 0, 0, 0, 5];
        assert_eq!(
            RelayCodec::default().decode_frame(&frame),
            Err(ProtocolError::Truncated {
                needed: 5,
                available: 0
            })
        );
    }

    #[test]
    fn test_frame_longer_than_declared() {
        let frame = [0, 0, 0, 9, 0, 0, 0, 0, 0, 0xAA];
        assert!(matches!(
            RelayCodec::default().decode_frame(&frame),
            Err(ProtocolError::FramingMismatch(_))
        ));
    }

    #[test]
    fn test_item_overrunning_declared_length() {
        // Declared payload 7: identifier (4) + "int" (3); the int value
        // itself lies outside the frame.
        let frame = [0, 0, 0, 12, 0, 0, 0, 0, 0, b'i', b'n', b't', 0, 0, 0, 1];
        assert!(matches!(
            RelayCodec::default().decode_frame(&frame),
            Err(ProtocolError::FramingMismatch(_))
        ));
    }

    #[test]
    fn test_read_message_leaves_next_frame_untouched() {
        let mut wire: Vec<u8> = vec![0, 0, 0, 16, 0, 0, 0, 0, 0];
        wire.extend_from_slice(b"int\x00\x00\x00\x2A");
        wire.extend_from_slice(&[0, 0, 0, 9, 0, 0, 0, 0, 0]);
        let mut reader = wire.as_slice();

        let codec = RelayCodec::default();
        let first = codec.read_message(&mut reader).unwrap();
        assert_eq!(first.body, vec![(TypeTag::Int, Value::Int(42))]);
        assert_eq!(reader.len(), 9);

        let second = codec.read_message(&mut reader).unwrap();
        assert!(second.body.is_empty());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_message_short_source_is_truncated() {
        let wire = [0u8, 0, 0, 9, 0, 0, 0];
        assert_eq!(
            RelayCodec::default().read_message(&mut wire.as_slice()),
            Err(ProtocolError::Truncated {
                needed: 4,
                available: 2
            })
        );
    }
}
