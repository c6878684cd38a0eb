//! Error types for the protocol layer.
//!
//! Every variant is a per-message failure. The relay format has no
//! resynchronisation markers, so once decoding a message fails the byte
//! stream position is unknown and the caller must drop the connection.

/// Errors that can occur while decoding a relay message or encoding a
/// command line.
///
/// The first five variants are the core taxonomy of the codec. The rest
/// describe malformed structure that doesn't fit any of them (a negative
/// length that isn't the null sentinel, a string that isn't UTF-8, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A decode step needed more bytes than the buffer holds.
    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the current step asked for.
        needed: usize,
        /// Bytes left in the buffer when it asked.
        available: usize,
    },

    /// A 3-byte type tag outside the recognised set.
    ///
    /// The offending bytes are kept (lossily rendered) so logs show what
    /// actually came over the wire.
    #[error("unknown type tag {0:?}")]
    UnknownType(String),

    /// The remaining-byte budget didn't land on exactly zero.
    #[error("framing mismatch: {0}")]
    FramingMismatch(String),

    /// The zlib body of a compressed frame could not be inflated.
    #[error("decompression failed: {0}")]
    DecompressionFailure(String),

    /// A `lon`, `tim` or `ptr` digit field held something other than
    /// the digits it is supposed to carry.
    #[error("malformed {kind} field {text:?}")]
    MalformedInteger {
        /// The wire type being decoded (`"lon"`, `"tim"`, `"ptr"`).
        kind: &'static str,
        /// The raw field, lossily rendered.
        text: String,
    },

    /// A length or count that is negative without being the `-1`
    /// sentinel, or a negative short length where none is allowed.
    #[error("invalid {what} length {len}")]
    InvalidLength {
        /// What the length describes.
        what: &'static str,
        /// The value read from the wire.
        len: i64,
    },

    /// A `str` or `buf` payload that is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// An hdata keys entry without a `name:type` shape.
    #[error("malformed hdata key {0:?}")]
    MalformedKeys(String),

    /// The compression byte of a frame header was neither 0 nor 1.
    #[error("unknown compression flag {0}")]
    UnknownCompression(u8),

    /// A frame header declared more bytes than the configured limit.
    #[error("frame of {len} bytes exceeds limit of {limit}")]
    FrameTooLarge {
        /// Declared frame length.
        len: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A message did not carry the kind of value its consumer needs.
    #[error("expected {expected}, found {found}")]
    UnexpectedValue {
        /// What the consumer needed.
        expected: &'static str,
        /// Wire type name of what arrived.
        found: &'static str,
    },

    /// A named field was missing or had the wrong type.
    #[error("field {field:?} is missing or not {expected}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Type the field must have.
        expected: &'static str,
    },

    /// Compound values were nested deeper than the configured limit.
    #[error("values nested deeper than {limit} levels")]
    NestingTooDeep {
        /// Configured maximum depth.
        limit: usize,
    },

    /// The byte source of the blocking reader failed for a reason other
    /// than running out of bytes.
    #[error("read failed ({kind:?}): {message}")]
    Io {
        /// Kind reported by the source.
        kind: std::io::ErrorKind,
        /// Rendered source error.
        message: String,
    },

    /// An outbound command could not be rendered as a single line.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
