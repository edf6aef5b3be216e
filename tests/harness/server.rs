//! In-process test server.
//!
//! Binds a fixed set of endpoints on a `MemoryTransport` and serves every
//! connection on its own task.

use rsws_stream::transport::memory::{MemoryListener, MemoryPeer, MemoryTransport};
use rsws_stream::{CloseFrame, Connection, Message, TransportError};
use tokio::task::JoinSet;

/// Echoes every message back until the client closes.
pub const ECHO: &str = "/echo";
/// Sends [`READ_VALUES`] and closes normally.
pub const READ: &str = "/read";
/// Echoes the first message, then fails the connection.
pub const ABORT: &str = "/abort";

pub const READ_VALUES: [&str; 4] = ["a", "b", "c", "d"];

pub struct TestServer {
    transport: MemoryTransport,
    tasks: JoinSet<()>,
}

impl TestServer {
    /// Bind all endpoints and start serving. Must run inside a tokio runtime.
    pub fn spawn() -> Self {
        let transport = MemoryTransport::new();
        let mut tasks = JoinSet::new();

        tasks.spawn(serve(transport.bind(ECHO), echo));
        tasks.spawn(serve(transport.bind(READ), read));
        tasks.spawn(serve(transport.bind(ABORT), abort_after_first));

        Self { transport, tasks }
    }

    pub fn transport(&self) -> &MemoryTransport {
        &self.transport
    }

    pub fn connect(&self, endpoint: &str) -> Connection {
        Connection::connect(&self.transport, endpoint)
    }

    pub async fn shutdown(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}

async fn serve<F, Fut>(mut listener: MemoryListener, handler: F)
where
    F: Fn(MemoryPeer) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    while let Some(peer) = listener.accept().await {
        tokio::spawn(handler(peer));
    }
}

async fn echo(mut peer: MemoryPeer) {
    while let Some(message) = peer.recv().await {
        if !peer.send(message) {
            break;
        }
    }
}

async fn read(mut peer: MemoryPeer) {
    for value in READ_VALUES {
        peer.send(Message::text(value));
    }
    peer.close(CloseFrame::normal());
}

async fn abort_after_first(mut peer: MemoryPeer) {
    if let Some(message) = peer.recv().await {
        peer.send(message);
        peer.abort(TransportError::new("connection reset by peer"));
    }
}
