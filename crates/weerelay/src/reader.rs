//! The reader task: frames in, messages out.
//!
//! One task per client owns the receive side of the connection. It pulls
//! frames, decodes them, and pushes the results into the inbound queue.
//! The first error is pushed as-is and ends the task: after a bad frame
//! the stream position is unknown, so there is nothing to resynchronise
//! to.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use weerelay_protocol::{Message, RelayCodec};
use weerelay_transport::{Connection, TcpConnection};

use crate::ClientError;

pub(crate) type Inbox = mpsc::Receiver<Result<Message, ClientError>>;
type Outbox = mpsc::Sender<Result<Message, ClientError>>;

/// Reads frames until the stream ends, an error occurs, or the client
/// drops the queue.
pub(crate) async fn run_reader(
    conn: Arc<TcpConnection>,
    codec: RelayCodec,
    read_timeout: Option<Duration>,
    tx: Outbox,
) {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "reader task started");

    loop {
        let received = match read_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv_frame()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::info!(%conn_id, ?limit, "relay read timed out");
                    let _ = tx.send(Err(ClientError::Timeout(limit))).await;
                    break;
                }
            },
            None => conn.recv_frame().await,
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "relay closed the connection");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "receive failed");
                let _ = tx.send(Err(e.into())).await;
                break;
            }
        };

        let item = codec.decode_frame(&frame).map_err(ClientError::from);
        let failed = item.is_err();
        if let Err(e) = &item {
            tracing::debug!(%conn_id, error = %e, "failed to decode frame");
        }
        if tx.send(item).await.is_err() {
            tracing::debug!(%conn_id, "client dropped the queue");
            break;
        }
        if failed {
            break;
        }
    }

    tracing::debug!(%conn_id, "reader task finished");
}
