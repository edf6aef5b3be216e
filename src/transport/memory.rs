//! In-process transport.
//!
//! Endpoints are plain names bound with [`MemoryTransport::bind`]. Each
//! connection is a pair of unbounded channels driven by a tokio task that
//! turns peer frames into socket events, so connections behave like real
//! sockets: they open asynchronously, may be refused, and can fail mid-stream.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::connection::SocketEvents;
use crate::error::TransportError;
use crate::message::{CloseCode, CloseFrame, Message};
use crate::transport::{Socket, Transport};

enum Frame {
    Data(Message),
    Close(Option<CloseFrame>),
    Abort(TransportError),
}

type Registry = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<MemoryPeer>>>>;

/// In-process transport with named endpoints.
///
/// Cloning shares the endpoint registry.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    listeners: Registry,
}

impl MemoryTransport {
    /// Create a transport with no bound endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting connections on `endpoint`.
    ///
    /// Replaces any listener previously bound to the same name.
    pub fn bind(&self, endpoint: impl Into<String>) -> MemoryListener {
        let endpoint = endpoint.into();
        let (tx, incoming) = mpsc::unbounded_channel();
        self.listeners.lock().insert(endpoint.clone(), tx.clone());
        debug!(endpoint = %endpoint, "memory endpoint bound");
        MemoryListener {
            endpoint,
            incoming,
            registration: tx,
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut endpoints: Vec<_> = self.listeners.lock().keys().cloned().collect();
        endpoints.sort();
        f.debug_struct("MemoryTransport")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl Transport for MemoryTransport {
    type Socket = MemorySocket;

    /// ## Panics
    ///
    /// Panics if called outside a tokio runtime.
    fn connect(&self, endpoint: &str, events: SocketEvents) -> MemorySocket {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        let closing = Arc::new(AtomicBool::new(false));
        let listener = self.listeners.lock().get(endpoint).cloned();
        let peer = MemoryPeer {
            tx: server_tx,
            rx: server_rx,
            closed: false,
        };

        tokio::spawn(drive(
            endpoint.to_owned(),
            listener,
            peer,
            client_rx,
            events,
            Arc::clone(&closing),
        ));

        MemorySocket {
            tx: client_tx,
            closing,
        }
    }
}

async fn drive(
    endpoint: String,
    listener: Option<mpsc::UnboundedSender<MemoryPeer>>,
    peer: MemoryPeer,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    events: SocketEvents,
    closing: Arc<AtomicBool>,
) {
    // Open on a later tick, like a network handshake would.
    tokio::task::yield_now().await;

    if closing.load(Ordering::Acquire) {
        debug!(endpoint = %endpoint, "closed while connecting, abandoning attempt");
        events.close(Some(CloseFrame::normal()));
        return;
    }

    let accepted = listener.is_some_and(|l| l.send(peer).is_ok());
    if !accepted {
        debug!(endpoint = %endpoint, "no listener, refusing connection");
        events.error(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("connect {endpoint}: connection refused"),
        ));
        events.close(Some(CloseFrame::new(CloseCode::Abnormal, "")));
        return;
    }

    events.open();
    while let Some(frame) = rx.recv().await {
        match frame {
            Frame::Data(message) => events.message(message),
            Frame::Close(frame) => {
                events.close(frame);
                return;
            }
            Frame::Abort(cause) => {
                events.error(cause);
                events.close(Some(CloseFrame::new(CloseCode::Abnormal, "")));
                return;
            }
        }
    }

    if closing.load(Ordering::Acquire) {
        events.close(None);
    } else {
        events.error(TransportError::new("connection reset by peer"));
        events.close(Some(CloseFrame::new(CloseCode::Abnormal, "")));
    }
}

/// Client side of an in-process connection.
#[derive(Debug)]
pub struct MemorySocket {
    tx: mpsc::UnboundedSender<Frame>,
    closing: Arc<AtomicBool>,
}

impl Socket for MemorySocket {
    fn send(&self, data: Bytes) {
        if self.tx.send(Frame::Data(Message::Binary(data))).is_err() {
            trace!("peer gone, dropping outbound message");
        }
    }

    fn close(&self) {
        self.closing.store(true, Ordering::Release);
        let _ = self.tx.send(Frame::Close(Some(CloseFrame::normal())));
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frame::Data(m) => f.debug_tuple("Data").field(&m.len()).finish(),
            Frame::Close(c) => f.debug_tuple("Close").field(c).finish(),
            Frame::Abort(e) => f.debug_tuple("Abort").field(e).finish(),
        }
    }
}

/// Accepts connections made to one endpoint.
///
/// Dropping the listener unbinds the endpoint; later connections are refused.
#[derive(Debug)]
pub struct MemoryListener {
    endpoint: String,
    incoming: mpsc::UnboundedReceiver<MemoryPeer>,
    registration: mpsc::UnboundedSender<MemoryPeer>,
    listeners: Registry,
}

impl MemoryListener {
    /// Wait for the next connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.recv().await
    }

    /// The endpoint name this listener is bound to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        let mut listeners = self.listeners.lock();
        if listeners
            .get(&self.endpoint)
            .is_some_and(|tx| tx.same_channel(&self.registration))
        {
            listeners.remove(&self.endpoint);
        }
    }
}

/// Server side of an in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
    closed: bool,
}

impl MemoryPeer {
    /// Send a message to the client. Returns `false` once the connection is gone.
    pub fn send(&self, message: impl Into<Message>) -> bool {
        !self.closed && self.tx.send(Frame::Data(message.into())).is_ok()
    }

    /// Receive the next client message.
    ///
    /// Returns `None` once the client closes (the close is answered
    /// automatically) or disappears.
    pub async fn recv(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        match self.rx.recv().await {
            Some(Frame::Data(message)) => Some(message),
            Some(Frame::Close(frame)) => {
                self.closed = true;
                let _ = self.tx.send(Frame::Close(frame));
                None
            }
            Some(Frame::Abort(_)) | None => {
                self.closed = true;
                None
            }
        }
    }

    /// Close the connection cleanly from the server side.
    pub fn close(&mut self, frame: CloseFrame) {
        if !self.closed {
            self.closed = true;
            let _ = self.tx.send(Frame::Close(Some(frame)));
        }
    }

    /// Fail the connection with `cause`, as a broken transport would.
    pub fn abort(&mut self, cause: impl Into<TransportError>) {
        if !self.closed {
            self.closed = true;
            let _ = self.tx.send(Frame::Abort(cause.into()));
        }
    }
}
