//! Wire protocol for the WeeChat relay.
//!
//! This crate turns the relay's binary messages into typed values and
//! turns commands into the text lines the relay expects:
//!
//! - **Types** ([`Value`], [`TypeTag`], [`Message`], [`HData`], ...):
//!   the value model every decoder produces.
//! - **Codec** ([`RelayCodec`]): frame header, zlib body, identifier,
//!   then `(type, value)` items until the frame is used up.
//! - **Buffers** ([`Buffer`]): typed records for the buffer list hdata.
//! - **Commands** ([`Command`], [`Request`]): outbound text lines.
//! - **Errors** ([`ProtocolError`]): what can go wrong.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or tasks. It decodes
//! from a byte slice (or pulls one frame from a blocking [`std::io::Read`])
//! and leaves connection handling to the transport crate.
//!
//! ```text
//! Transport (frames) → Protocol (Message) → Client (queue, commands)
//! ```

mod buffer;
mod codec;
mod command;
mod cursor;
pub mod decode;
mod error;
mod frame;
mod types;

pub use buffer::{Buffer, BUFFER_HDATA_KEYS, BUFFER_HDATA_PATH};
pub use codec::RelayCodec;
pub use command::{Command, Request};
pub use cursor::{Cursor, DEFAULT_MAX_DEPTH};
pub use error::ProtocolError;
pub use frame::{inflate, DecodeLimits, FrameHeader, HEADER_LEN};
pub use types::{Fields, HData, HDataObject, Message, TypeTag, Value};
