use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::connection::queue::InboundQueue;
use crate::connection::tracker::{StateTracker, Terminal};
use crate::connection::ConnectionState;
use crate::error::{Error, Result, TransportError};
use crate::message::{CloseFrame, Message};
use crate::stream::{Duplex, Sink, Source};
use crate::transport::{Socket, Transport};

struct Shared {
    tracker: StateTracker,
    inbound: InboundQueue,
    source_claimed: AtomicBool,
}

impl Shared {
    fn terminate(&self, terminal: Terminal) -> bool {
        let first = self.tracker.terminate(terminal);
        self.inbound.end();
        first
    }
}

/// Event sink handed to a transport when it opens a socket.
///
/// The transport calls these methods as its socket reports `open`,
/// `message`, `close` and `error`. Events after the connection has ended are
/// ignored.
#[derive(Clone)]
pub struct SocketEvents {
    shared: Arc<Shared>,
}

impl SocketEvents {
    /// The socket finished connecting.
    pub fn open(&self) {
        if self.shared.tracker.mark_open() {
            debug!("socket open");
        } else {
            trace!("ignoring open event on finished connection");
        }
    }

    /// The socket received a message. Text is converted to its UTF-8 bytes.
    pub fn message(&self, message: impl Into<Message>) {
        let message = message.into();
        let len = message.len();
        if self.shared.inbound.push(message.into_bytes()) {
            trace!(len, "message buffered");
        } else {
            trace!(len, "discarding message received after close");
        }
    }

    /// The socket closed.
    pub fn close(&self, frame: Option<CloseFrame>) {
        let code = frame.as_ref().map(|f| f.code);
        let clean = code.is_none_or(|c| c.is_clean());
        if self.shared.terminate(Terminal::Closed(frame)) {
            if clean {
                debug!(code = ?code.map(|c| c.as_u16()), "socket closed");
            } else {
                warn!(code = ?code.map(|c| c.as_u16()), "socket closed abnormally");
            }
        }
    }

    /// The socket failed.
    ///
    /// Before `open` this is a connection failure, afterwards a mid-stream
    /// failure. Either way it terminates both halves of the connection.
    pub fn error(&self, cause: impl Into<TransportError>) {
        let cause = cause.into();
        let err = if self.shared.tracker.opened() {
            Error::Transport(cause)
        } else {
            Error::Connect(cause)
        };
        let message = err.to_string();
        if self.shared.terminate(Terminal::Failed(err)) {
            warn!(error = %message, "socket error");
        } else {
            trace!(error = %message, "ignoring error on finished connection");
        }
    }
}

impl fmt::Debug for SocketEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketEvents")
            .field("state", &self.shared.tracker.state())
            .finish()
    }
}

/// A socket wrapped with lifecycle tracking and an inbound queue.
///
/// `Connection` is a cheap handle: clones refer to the same socket, state and
/// queue. Sources and sinks built from it observe the same terminal event.
///
/// ## Example
///
/// ```rust,ignore
/// use rsws_stream::{Config, Connection};
/// use rsws_stream::transport::memory::MemoryTransport;
///
/// let transport = MemoryTransport::new();
/// let conn = Connection::connect(&transport, "echo");
/// conn.connected().await?;
/// let (source, sink) = conn.duplex(Config::keep_open()).split();
/// ```
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    socket: Arc<dyn Socket>,
}

impl Connection {
    /// Wrap a socket built by `open`.
    ///
    /// `open` receives the [`SocketEvents`] handle the socket must report
    /// its lifecycle through.
    pub fn new<S, F>(open: F) -> Self
    where
        S: Socket,
        F: FnOnce(SocketEvents) -> S,
    {
        let shared = Arc::new(Shared {
            tracker: StateTracker::new(),
            inbound: InboundQueue::new(),
            source_claimed: AtomicBool::new(false),
        });
        let socket = open(SocketEvents {
            shared: Arc::clone(&shared),
        });
        Self {
            shared,
            socket: Arc::new(socket),
        }
    }

    /// Open a socket to `endpoint` with `transport`.
    pub fn connect<T: Transport>(transport: &T, endpoint: &str) -> Self {
        debug!(endpoint, "connecting");
        Self::new(|events| transport.connect(endpoint, events))
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.tracker.state()
    }

    /// Check if the connection is open for sending.
    pub fn is_open(&self) -> bool {
        self.state().can_send()
    }

    /// Wait until the connection is open.
    ///
    /// ## Errors
    ///
    /// - `Error::Connect` if the transport failed before opening
    /// - `Error::Transport` if it opened and has since failed
    /// - `Error::ConnectionClosed` if it closed without ever opening
    ///
    /// Once failed, every call returns the same captured error.
    pub async fn connected(&self) -> Result<()> {
        self.shared.tracker.wait_open().await
    }

    /// Wait for the connection to end and report how.
    pub async fn closed(&self) -> Terminal {
        self.shared.tracker.wait_terminal().await
    }

    /// The terminal event, if the connection has ended.
    pub fn terminal(&self) -> Option<Terminal> {
        self.shared.tracker.terminal()
    }

    /// The captured error, if the connection failed.
    pub fn error(&self) -> Option<Error> {
        self.terminal().and_then(|t| t.error().cloned())
    }

    /// Register a callback for the terminal event.
    ///
    /// Called exactly once. If the connection has already ended the callback
    /// runs immediately on the calling thread.
    pub fn on_terminal<F>(&self, callback: F)
    where
        F: FnOnce(&Terminal) + Send + 'static,
    {
        self.shared.tracker.on_terminal(callback);
    }

    /// Close the connection.
    ///
    /// Idempotent. Readers stop receiving new messages at once (buffered ones
    /// stay readable) and sinks stop accepting input. Both halves then end
    /// normally, even if the transport fails while closing. The connection
    /// reaches a terminal state when the transport confirms the close.
    pub fn close(&self) {
        if self.shared.tracker.request_close() {
            debug!(state = %self.state(), "close requested");
            self.shared.inbound.end();
            self.socket.close();
        }
    }

    /// Number of received messages waiting to be read.
    pub fn buffered(&self) -> usize {
        self.shared.inbound.len()
    }

    /// Create the reading half.
    pub fn source(&self) -> Source {
        Source::new(self.clone())
    }

    /// Create the writing half.
    pub fn sink(&self, config: Config) -> Sink {
        Sink::new(self.clone(), config)
    }

    /// Create both halves over this connection.
    pub fn duplex(self, config: Config) -> Duplex {
        Duplex::new(self, config)
    }

    pub(crate) fn send(&self, data: Bytes) {
        trace!(len = data.len(), "sending message");
        self.socket.send(data);
    }

    /// Claim the single reader slot. Returns `false` if already claimed.
    pub(crate) fn claim_source(&self) -> bool {
        !self.shared.source_claimed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn tracker(&self) -> &StateTracker {
        &self.shared.tracker
    }

    pub(crate) fn inbound(&self) -> &InboundQueue {
        &self.shared.inbound
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("buffered", &self.buffered())
            .field("inbound_ended", &self.shared.inbound.is_ended())
            .finish()
    }
}
