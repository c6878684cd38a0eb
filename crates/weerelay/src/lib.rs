//! # weerelay
//!
//! Async client for the WeeChat relay binary protocol.
//!
//! A [`RelayClient`] owns one TCP connection. Commands are encoded by
//! [`weerelay_protocol`] and written as text lines; a single reader task
//! pulls frames off the socket, decodes them into [`Message`]s, and
//! queues them for [`RelayClient::recv`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weerelay::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let mut client = RelayClient::builder()
//!     .password("secret")
//!     .compression(false)
//!     .connect()
//!     .await?;
//! client.test().await?;
//! if let Some(reply) = client.recv().await {
//!     for (tag, value) in &reply?.body {
//!         println!("{tag}: {value:?}");
//!     }
//! }
//! client.quit().await
//! # }
//! ```

mod client;
mod config;
mod error;
mod reader;

pub use client::{RelayClient, BUFFER_LIST_ID};
pub use config::{ClientConfig, RelayClientBuilder, DEFAULT_ADDRESS, DEFAULT_QUEUE_CAPACITY};
pub use error::ClientError;

pub use weerelay_protocol::{
    Buffer, Command, DecodeLimits, Fields, HData, HDataObject, Message, ProtocolError, Request,
    TypeTag, Value,
};
pub use weerelay_transport::{ConnectionId, TransportError};

/// Everything a typical client needs.
pub mod prelude {
    pub use crate::{
        Buffer, ClientConfig, ClientError, Command, Message, RelayClient, RelayClientBuilder,
        Request, TypeTag, Value,
    };
}
