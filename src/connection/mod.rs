//! Connection lifecycle tracking and inbound buffering.
//!
//! A [`Connection`] wraps one transport socket. The transport pushes events
//! (`open`, `message`, `close`, `error`) through [`SocketEvents`]; readers
//! and writers pull from and wait on the connection.
//!
//! ## Connection Lifecycle
//!
//! 1. **Connecting** - The transport is still establishing the socket
//! 2. **Open** - Ready for data transfer
//! 3. **Closing** - Close requested locally, waiting for the transport
//! 4. **Closed** / **Errored** - Terminal; the first close or error wins
//!
//! ## Example
//!
//! ```rust,ignore
//! use rsws_stream::Connection;
//!
//! let conn = Connection::connect(&transport, "ws://localhost:8080/echo");
//! conn.connected().await?;
//! conn.close();
//! ```

mod queue;
mod state;
mod tracker;

pub use state::ConnectionState;
pub use tracker::Terminal;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::{Connection, SocketEvents};

#[cfg(test)]
pub(crate) use connection::tests::mock_connection;
