//! Transport capability traits.
//!
//! The socket transport itself (connection establishment, TLS, framing) lives
//! outside this crate. A transport only has to provide a fire-and-forget
//! [`Socket`] handle and report lifecycle events through the
//! [`SocketEvents`](crate::connection::SocketEvents) handle it is given.

use bytes::Bytes;

use crate::connection::SocketEvents;

#[cfg(feature = "memory")]
pub mod memory;

/// A connected (or connecting) socket handle.
///
/// Neither method reports failure directly: a failed send or close surfaces
/// later as an `error` event.
pub trait Socket: Send + Sync + 'static {
    /// Queue `data` for delivery to the peer.
    fn send(&self, data: Bytes);

    /// Start closing the socket.
    ///
    /// Called at most once per connection. If the socket is still
    /// connecting, the transport must abort the attempt and eventually
    /// report `close` or `error`.
    fn close(&self);
}

/// Something that can open sockets to an endpoint.
pub trait Transport {
    /// The socket handle this transport produces.
    type Socket: Socket;

    /// Begin connecting to `endpoint`.
    ///
    /// Must not block. Every lifecycle event for the new socket, including a
    /// failure to connect, is reported through `events`.
    fn connect(&self, endpoint: &str, events: SocketEvents) -> Self::Socket;
}
