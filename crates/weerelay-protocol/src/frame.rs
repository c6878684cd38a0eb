//! Frame header parsing and body decompression.
//!
//! ```text
//! ┌──────────────┬─────────────┬──────────────────────────────┐
//! │ length (u32) │ compression │ body (length - 5 bytes)      │
//! │ big-endian   │ 0 or 1      │ raw, or zlib when flag is 1  │
//! └──────────────┴─────────────┴──────────────────────────────┘
//! ```

use flate2::{Decompress, FlushDecompress, Status};

use crate::cursor::DEFAULT_MAX_DEPTH;
use crate::ProtocolError;

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 5;

/// Chunk the inflater grows its output by.
const INFLATE_CHUNK: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// DecodeLimits
// ---------------------------------------------------------------------------

/// Size limits applied while reading and decoding frames.
///
/// The relay sends whole buffers' worth of lines in one frame, so the
/// defaults are generous; they exist so a corrupt length field or a zlib
/// bomb fails fast instead of exhausting memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest accepted frame, header included.
    pub max_frame_len: usize,
    /// Largest accepted payload after decompression.
    pub max_inflated_len: usize,
    /// Deepest accepted nesting of compound values (`arr` in `arr` ...).
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_frame_len: 16 * 1024 * 1024,
            max_inflated_len: 64 * 1024 * 1024,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameHeader
// ---------------------------------------------------------------------------

/// The 5-byte header that opens every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame length, these 5 bytes included.
    pub length: u32,
    /// Whether the body is a zlib stream.
    pub compressed: bool,
}

impl FrameHeader {
    /// Parses a header.
    ///
    /// # Errors
    /// - [`ProtocolError::FramingMismatch`] if the length can't even cover
    ///   the header itself.
    /// - [`ProtocolError::UnknownCompression`] for a flag other than 0/1.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        let length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if (length as usize) < HEADER_LEN {
            return Err(ProtocolError::FramingMismatch(format!(
                "declared length {length} is shorter than the header"
            )));
        }
        let compressed = match bytes[4] {
            0 => false,
            1 => true,
            other => return Err(ProtocolError::UnknownCompression(other)),
        };
        Ok(Self { length, compressed })
    }

    /// Parses a header and checks it against `limits`.
    pub fn parse_checked(
        bytes: &[u8; HEADER_LEN],
        limits: &DecodeLimits,
    ) -> Result<Self, ProtocolError> {
        let header = Self::parse(bytes)?;
        if header.length as usize > limits.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len: header.length as usize,
                limit: limits.max_frame_len,
            });
        }
        Ok(header)
    }

    /// Bytes of body that follow the header on the wire.
    pub fn body_len(&self) -> usize {
        self.length as usize - HEADER_LEN
    }

    /// Encodes the header back to its wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [a, b, c, d] = self.length.to_be_bytes();
        [a, b, c, d, u8::from(self.compressed)]
    }
}

// ---------------------------------------------------------------------------
// Inflate
// ---------------------------------------------------------------------------

/// Inflates a zlib-wrapped body.
///
/// Drains the decompressor chunk by chunk; the length of the returned
/// buffer is the exact payload size the decompressor reported, which the
/// message assembler uses as its byte budget. There is one pass and no
/// read-to-end guessing.
///
/// # Errors
/// [`ProtocolError::DecompressionFailure`] if the stream is corrupt,
/// ends early, has trailing bytes, or inflates past
/// `limits.max_inflated_len`.
pub fn inflate(body: &[u8], limits: &DecodeLimits) -> Result<Vec<u8>, ProtocolError> {
    let mut z = Decompress::new(true);
    // One byte past the limit is enough to detect an overrun.
    let ceiling = limits.max_inflated_len.saturating_add(1);
    let mut out: Vec<u8> = Vec::with_capacity(
        body.len().saturating_mul(4).min(INFLATE_CHUNK).min(ceiling),
    );

    loop {
        let consumed = z.total_in() as usize;
        let produced = z.total_out() as usize;

        if produced > limits.max_inflated_len {
            return Err(ProtocolError::DecompressionFailure(format!(
                "payload exceeds {} bytes",
                limits.max_inflated_len
            )));
        }
        if out.capacity() == out.len() {
            out.reserve_exact(INFLATE_CHUNK.min(ceiling - out.len()));
        }

        let status = z
            .decompress_vec(&body[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| ProtocolError::DecompressionFailure(e.to_string()))?;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                let progressed = z.total_in() as usize != consumed
                    || z.total_out() as usize != produced;
                if !progressed && out.len() < out.capacity() {
                    // Output room left, no input left to use it on.
                    return Err(ProtocolError::DecompressionFailure(
                        "zlib stream ended early".into(),
                    ));
                }
            }
        }
    }

    if out.len() > limits.max_inflated_len {
        return Err(ProtocolError::DecompressionFailure(format!(
            "payload exceeds {} bytes",
            limits.max_inflated_len
        )));
    }
    let consumed = z.total_in() as usize;
    if consumed != body.len() {
        return Err(ProtocolError::DecompressionFailure(format!(
            "{} trailing bytes after zlib stream",
            body.len() - consumed
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_header_parse() {
        let h = FrameHeader::parse(&[0, 0, 0, 14, 0]).unwrap();
        assert_eq!(h.length, 14);
        assert!(!h.compressed);
        assert_eq!(h.body_len(), 9);

        let h = FrameHeader::parse(&[0, 0, 1, 0, 1]).unwrap();
        assert_eq!(h.length, 256);
        assert!(h.compressed);
    }

    #[test]
    fn test_header_to_bytes_matches_wire() {
        let h = FrameHeader {
            length: 0x0102_0304,
            compressed: true,
        };
        assert_eq!(h.to_bytes(), [1, 2, 3, 4, 1]);
        assert_eq!(FrameHeader::parse(&h.to_bytes()), Ok(h));
    }

    #[test]
    fn test_header_shorter_than_itself() {
        assert!(matches!(
            FrameHeader::parse(&[0, 0, 0, 4, 0]),
            Err(ProtocolError::FramingMismatch(_))
        ));
        // Exactly a header, no body: valid frame header.
        assert_eq!(FrameHeader::parse(&[0, 0, 0, 5, 0]).unwrap().body_len(), 0);
    }

    #[test]
    fn test_header_unknown_compression() {
        assert_eq!(
            FrameHeader::parse(&[0, 0, 0, 9, 2]),
            Err(ProtocolError::UnknownCompression(2))
        );
    }

    #[test]
    fn test_header_over_limit() {
        let limits = DecodeLimits {
            max_frame_len: 100,
            ..DecodeLimits::default()
        };
        assert_eq!(
            FrameHeader::parse_checked(&[0, 0, 1, 0, 0], &limits),
            Err(ProtocolError::FrameTooLarge {
                len: 256,
                limit: 100
            })
        );
    }

    #[test]
    fn test_inflate_reports_exact_size() {
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let out = inflate(&zlib(&payload), &DecodeLimits::default()).unwrap();
        assert_eq!(out.len(), payload.len());
        assert_eq!(out, payload);
    }

    #[test]
    fn test_inflate_empty_payload() {
        let out = inflate(&zlib(b""), &DecodeLimits::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(matches!(
            inflate(b"definitely not zlib", &DecodeLimits::default()),
            Err(ProtocolError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_inflate_rejects_cut_stream() {
        let z = zlib(b"hello hello hello hello");
        assert!(matches!(
            inflate(&z[..z.len() - 3], &DecodeLimits::default()),
            Err(ProtocolError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_inflate_rejects_trailing_bytes() {
        let mut z = zlib(b"hello");
        z.extend_from_slice(b"junk");
        assert!(matches!(
            inflate(&z, &DecodeLimits::default()),
            Err(ProtocolError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_inflate_enforces_limit() {
        let limits = DecodeLimits {
            max_inflated_len: 1000,
            ..DecodeLimits::default()
        };
        let z = zlib(&vec![0u8; 100_000]);
        assert!(matches!(
            inflate(&z, &limits),
            Err(ProtocolError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_inflate_payload_at_exact_limit() {
        let limits = DecodeLimits {
            max_inflated_len: 40_000,
            ..DecodeLimits::default()
        };
        let exact = vec![7u8; 40_000];
        assert_eq!(inflate(&zlib(&exact), &limits).unwrap(), exact);

        let over = vec![7u8; 40_001];
        assert!(matches!(
            inflate(&zlib(&over), &limits),
            Err(ProtocolError::DecompressionFailure(_))
        ));
    }
}
