//! # rsws-stream - Pull-based streams over event-driven WebSocket connections
//!
//! `rsws-stream` turns a push-based socket (one that emits `open`, `message`,
//! `close` and `error` events and offers a fire-and-forget `send`) into
//! demand-driven streams:
//!
//! - [`Source`]: a [`Stream`](futures_core::Stream) of inbound messages
//! - [`Sink`]: consumes a stream of outbound messages
//! - [`Duplex`]: both halves over one connection, sharing one terminal event
//!
//! ## Features
//!
//! - **No lost or duplicated messages**: strict FIFO delivery, buffered until read
//! - **Writes wait for open**: nothing is dropped while the socket connects
//! - **Symmetric failures**: a transport error reaches both halves identically
//! - **Transport-agnostic**: any socket implementing [`transport::Socket`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures_util::{stream, StreamExt};
//! use rsws_stream::{Config, Connection};
//!
//! let conn = Connection::connect(&transport, "ws://localhost:8080/echo");
//! let (mut source, sink) = conn.duplex(Config::keep_open()).split();
//!
//! sink.spawn(stream::iter(vec![bytes::Bytes::from_static(b"hello")]));
//! while let Some(message) = source.next().await {
//!     println!("Received: {:?}", message?);
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod stream;
pub mod transport;

pub use config::Config;
pub use connection::{Connection, ConnectionState, SocketEvents, Terminal};
pub use error::{Error, Result, TransportError};
pub use message::{CloseCode, CloseFrame, Message};
pub use stream::{duplex, sink, source, Duplex, Sink, Source};
pub use transport::{Socket, Transport};
