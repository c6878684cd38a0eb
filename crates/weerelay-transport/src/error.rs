use weerelay_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection, or the local side already did.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Connecting to the relay failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A frame header was rejected before its body was read.
    #[error("invalid frame: {0}")]
    InvalidFrame(#[source] ProtocolError),
}
