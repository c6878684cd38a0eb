//! Transport layer for the WeeChat relay client.
//!
//! Provides the [`Connection`] trait, which abstracts a duplex byte
//! stream into "receive one raw frame" and "send one command line", and
//! [`StreamConnection`], its implementation over any tokio
//! `AsyncRead`/`AsyncWrite` pair ([`TcpConnection`] for real relays).
//!
//! The transport reads frame boundaries only: it looks at the 5-byte
//! header to learn how many bytes to read and hands back the whole frame
//! untouched. Decoding is the protocol crate's job.

#![allow(async_fn_in_trait)]

mod error;
mod stream;

pub use error::TransportError;
pub use stream::{StreamConnection, TcpConnection};

use std::fmt;

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay-{}", self.0)
    }
}

/// A connection to a relay: frames in, command lines out.
///
/// Exactly one task may call [`recv_frame`](Self::recv_frame) in a loop;
/// the protocol has no interleaved frames, so concurrent readers are
/// never valid. [`send_line`](Self::send_line) may be called from any
/// number of tasks: each line is written whole before the next starts.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes one complete command line and flushes it.
    async fn send_line(&self, line: &str) -> Result<(), Self::Error>;

    /// Reads the next complete frame, header included.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly between
    /// frames.
    async fn recv_frame(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Shuts down the write side. Further sends fail.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
