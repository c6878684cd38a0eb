//! [`Connection`] over a pair of tokio byte streams.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use weerelay_protocol::{DecodeLimits, FrameHeader, HEADER_LEN};

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A relay connection over a TCP socket.
pub type TcpConnection = StreamConnection<BufReader<OwnedReadHalf>, OwnedWriteHalf>;

/// A relay connection over any read half and write half.
///
/// Each half sits behind its own mutex: the reader lock is only ever
/// taken by the reader task, the writer lock serialises command lines.
pub struct StreamConnection<R, W> {
    id: ConnectionId,
    reader: Mutex<R>,
    /// `None` once the write side has been shut down.
    writer: Mutex<Option<W>>,
    limits: DecodeLimits,
}

impl<R, W> StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already-connected pair of stream halves.
    pub fn new(reader: R, writer: W, limits: DecodeLimits) -> Self {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            reader: Mutex::new(reader),
            writer: Mutex::new(Some(writer)),
            limits,
        }
    }
}

impl TcpConnection {
    /// Connects to a relay at `addr` (`host:port`).
    pub async fn connect(addr: &str, limits: DecodeLimits) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::ConnectFailed)?;
        let (read, write) = stream.into_split();
        let conn = Self::new(BufReader::new(read), write, limits);
        tracing::info!(id = %conn.id, addr, "connected to relay");
        Ok(conn)
    }
}

impl<R, W> Connection for StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    async fn send_line(&self, line: &str) -> Result<(), Self::Error> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| TransportError::ConnectionClosed("write side shut down".into()))?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)?;
        tracing::trace!(id = %self.id, bytes = line.len(), "sent command line");
        Ok(())
    }

    async fn recv_frame(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut reader = self.reader.lock().await;

        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = reader
                .read(&mut header[filled..])
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                if filled == 0 {
                    tracing::debug!(id = %self.id, "relay closed the stream");
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed(format!(
                    "stream ended after {filled} of {HEADER_LEN} header bytes"
                )));
            }
            filled += n;
        }

        let parsed =
            FrameHeader::parse_checked(&header, &self.limits).map_err(TransportError::InvalidFrame)?;

        let mut frame = vec![0u8; parsed.length as usize];
        frame[..HEADER_LEN].copy_from_slice(&header);
        reader
            .read_exact(&mut frame[HEADER_LEN..])
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => TransportError::ConnectionClosed(format!(
                    "stream ended inside a {}-byte frame",
                    parsed.length
                )),
                _ => TransportError::ReceiveFailed(e),
            })?;

        tracing::trace!(
            id = %self.id,
            length = parsed.length,
            compressed = parsed.compressed,
            "received frame"
        );
        Ok(Some(frame))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };
        writer.shutdown().await.map_err(TransportError::SendFailed)?;
        tracing::debug!(id = %self.id, "closed write side");
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
