//! Sequential big-endian reader with a byte budget.
//!
//! The budget is the number of payload bytes the current message still
//! owes. It starts at the payload size and every successful read takes
//! exactly the bytes it consumed off it. Nothing else touches it, which
//! is what lets the message assembler trust "budget is zero" to mean
//! "the whole message was consumed, no more, no less".
//!
//! The cursor also tracks how deep the compound decoders have nested, so
//! a frame of arrays inside arrays fails with an error long before it
//! could exhaust the stack.

use crate::ProtocolError;

/// Nesting depth accepted when no limit is configured.
///
/// The relay's own replies nest two or three levels (a hashtable inside
/// an hdata object, an array inside an infolist item).
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A read position over an immutable byte slice, plus the budget of
/// bytes left in the logical message.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    remaining: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor whose budget is the whole slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_budget(data, data.len())
    }

    /// Creates a cursor with an explicit budget.
    ///
    /// The budget may differ from `data.len()` when it tracks "bytes left
    /// in the message" rather than "bytes left in the buffer".
    pub fn with_budget(data: &'a [u8], remaining: usize) -> Self {
        Self {
            data,
            pos: 0,
            remaining,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how deep compound values may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compound values currently open around the read position.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enters one level of compound value.
    pub(crate) fn descend(&mut self) -> Result<(), ProtocolError> {
        if self.depth >= self.max_depth {
            return Err(ProtocolError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves a level entered with [`descend`](Self::descend).
    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bytes the message still owes.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes physically left in the buffer.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        let [b] = self.take::<1>()?;
        Ok(b)
    }

    /// Reads a big-endian two's-complement `i32`.
    pub fn read_i32_be(&mut self) -> Result<i32, ProtocolError> {
        self.take::<4>().map(i32::from_be_bytes)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> Result<u32, ProtocolError> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    /// Reads exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.available() {
            return Err(ProtocolError::Truncated {
                needed: n,
                available: self.available(),
            });
        }
        if n > self.remaining {
            return Err(ProtocolError::FramingMismatch(format!(
                "read of {n} bytes overruns message budget of {}",
                self.remaining
            )));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        self.remaining -= n;
        Ok(bytes)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
