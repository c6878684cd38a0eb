//! Unified error type for the relay client.

use std::time::Duration;

use weerelay_protocol::ProtocolError;
use weerelay_transport::TransportError;

/// Top-level error that wraps the transport and protocol errors.
///
/// The reader task pushes at most one of these into the inbound queue,
/// after which the queue ends.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The byte stream failed (connect, send, receive, framing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame arrived but could not be decoded, or a command could not
    /// be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No frame arrived within the configured read timeout.
    #[error("no frame from relay within {0:?}")]
    Timeout(Duration),

    /// The client already sent `quit` or was shut down.
    #[error("client is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Transport(_)));
        assert!(client_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownType("xyz".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Protocol(_)));
        assert!(client_err.to_string().contains("xyz"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ClientError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "no frame from relay within 250ms");
    }
}
