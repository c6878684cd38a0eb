//! `RelayClient`: one connection, one reader task, one inbound queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weerelay_protocol::{
    Buffer, Command, Message, RelayCodec, Request, BUFFER_HDATA_KEYS, BUFFER_HDATA_PATH,
};
use weerelay_transport::{Connection, ConnectionId, TcpConnection};

use crate::config::{ClientConfig, RelayClientBuilder};
use crate::reader::{run_reader, Inbox};
use crate::ClientError;

/// Identifier [`RelayClient::list_buffers`] tags its request with.
pub const BUFFER_LIST_ID: &str = "weerelay_buffers";

/// A connected relay client.
///
/// Commands go out through `&self` methods and may be sent from several
/// tasks at once; each line is written whole. Replies and events come
/// back in arrival order through [`recv`](Self::recv).
pub struct RelayClient {
    conn: Arc<TcpConnection>,
    inbox: Inbox,
    /// Messages that arrived while waiting for a specific reply.
    held: VecDeque<Result<Message, ClientError>>,
    reader: JoinHandle<()>,
    closed: AtomicBool,
}

impl RelayClient {
    /// Creates a new builder.
    pub fn builder() -> RelayClientBuilder {
        RelayClientBuilder::new()
    }

    /// Connects with `config`, sends `init`, and starts the reader task.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let conn = Arc::new(TcpConnection::connect(&config.address, config.limits).await?);
        let conn_id = conn.id();

        let init = Request::new(Command::Init {
            password: config.password.clone(),
            compression: config.compression,
        });
        conn.send_line(&init.to_line()?).await?;
        tracing::debug!(%conn_id, compression = config.compression, "sent init");

        let (tx, inbox) = mpsc::channel(config.queue_capacity.max(1));
        let reader = tokio::spawn(run_reader(
            Arc::clone(&conn),
            RelayCodec::new(config.limits),
            config.read_timeout,
            tx,
        ));

        Ok(Self {
            conn,
            inbox,
            held: VecDeque::new(),
            reader,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the identifier of the underlying connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Sends one request.
    ///
    /// The line is validated before anything is written, so a rejected
    /// request leaves the connection untouched.
    pub async fn send(&self, request: impl Into<Request>) -> Result<(), ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        let request = request.into();
        let line = request.to_line()?;
        self.conn.send_line(&line).await?;
        tracing::debug!(
            conn_id = %self.conn.id(),
            command = request.command.name(),
            id = request.id.as_deref().unwrap_or(""),
            "sent command"
        );
        Ok(())
    }

    /// Sends a command without an identifier.
    pub async fn command(&self, command: Command) -> Result<(), ClientError> {
        self.send(command).await
    }

    /// Sends `ping`. The relay answers with a `_pong` event echoing
    /// `arguments`.
    pub async fn ping(&self, arguments: Option<&str>) -> Result<(), ClientError> {
        self.command(Command::Ping {
            arguments: arguments.map(str::to_string),
        })
        .await
    }

    /// Sends `test`. The relay answers with one value of every type.
    pub async fn test(&self) -> Result<(), ClientError> {
        self.command(Command::Test).await
    }

    /// Requests hdata at `path`, tagging the reply with `id`.
    pub async fn hdata(&self, id: &str, path: &str, keys: Option<&str>) -> Result<(), ClientError> {
        self.send(Request::with_id(
            id,
            Command::Hdata {
                path: path.to_string(),
                keys: keys.map(str::to_string),
            },
        ))
        .await
    }

    /// Requests the info `name`, tagging the reply with `id`.
    pub async fn info(&self, id: &str, name: &str) -> Result<(), ClientError> {
        self.send(Request::with_id(
            id,
            Command::Info {
                name: name.to_string(),
            },
        ))
        .await
    }

    /// Sends `data` to `buffer` as if typed there.
    pub async fn input(&self, buffer: &str, data: &str) -> Result<(), ClientError> {
        self.command(Command::Input {
            buffer: buffer.to_string(),
            data: data.to_string(),
        })
        .await
    }

    /// Subscribes to updates for all buffers.
    pub async fn sync(&self) -> Result<(), ClientError> {
        self.command(Command::Sync {
            buffers: None,
            options: None,
        })
        .await
    }

    /// Fetches the buffer list and waits for the reply.
    ///
    /// Anything else that arrives in the meantime is held back and
    /// handed out by [`recv`](Self::recv) afterwards, in arrival order.
    pub async fn list_buffers(&mut self) -> Result<Vec<Buffer>, ClientError> {
        self.hdata(BUFFER_LIST_ID, BUFFER_HDATA_PATH, Some(BUFFER_HDATA_KEYS))
            .await?;
        loop {
            match self.inbox.recv().await {
                Some(Ok(msg)) if msg.identifier == BUFFER_LIST_ID => {
                    return Ok(Buffer::from_message(&msg)?);
                }
                Some(Ok(msg)) => self.held.push_back(Ok(msg)),
                Some(Err(e)) => return Err(e),
                None => return Err(ClientError::Closed),
            }
        }
    }

    /// Sends `quit` and shuts down the write side.
    ///
    /// Messages already in flight can still be drained with
    /// [`recv`](Self::recv); the queue ends once the relay hangs up.
    pub async fn quit(&self) -> Result<(), ClientError> {
        self.send(Command::Quit).await?;
        self.closed.store(true, Ordering::Release);
        self.conn.close().await?;
        tracing::info!(conn_id = %self.conn.id(), "quit sent");
        Ok(())
    }

    /// Receives the next message or the error that ended the stream.
    ///
    /// Returns `None` once the reader task has finished and everything
    /// it queued has been taken.
    pub async fn recv(&mut self) -> Option<Result<Message, ClientError>> {
        if let Some(held) = self.held.pop_front() {
            return Some(held);
        }
        self.inbox.recv().await
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
