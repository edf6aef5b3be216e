//! Pull-based streams over a push-based connection.
//!
//! - [`Source`] produces inbound messages on demand
//! - [`Sink`] writes a caller-supplied stream to the socket
//! - [`Duplex`] pairs the two over one connection
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures_util::{stream, StreamExt};
//! use rsws_stream::{duplex, Config};
//!
//! let (mut source, sink) = duplex(conn, Config::keep_open()).split();
//! let writer = sink.spawn(stream::iter(vec![Bytes::from_static(b"x")]));
//! while let Some(message) = source.next().await {
//!     println!("Received: {:?}", message?);
//! }
//! writer.await??;
//! ```

mod duplex;
mod sink;
mod source;

pub use duplex::Duplex;
pub use sink::Sink;
pub use source::Source;

use crate::config::Config;
use crate::connection::Connection;

/// Create the reading half of `connection`.
pub fn source(connection: &Connection) -> Source {
    connection.source()
}

/// Create the writing half of `connection`.
pub fn sink(connection: &Connection, config: Config) -> Sink {
    connection.sink(config)
}

/// Create both halves over `connection`.
pub fn duplex(connection: Connection, config: Config) -> Duplex {
    connection.duplex(config)
}
