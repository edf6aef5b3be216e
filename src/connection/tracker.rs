//! Connection state tracking and the shared terminal slot.

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::CloseFrame;

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// The transport reported a close event.
    Closed(Option<CloseFrame>),
    /// The transport reported an error.
    Failed(Error),
}

impl Terminal {
    /// Outcome for a writer that was waiting on the connection to end.
    pub fn into_result(self) -> Result<()> {
        match self {
            Terminal::Closed(_) => Ok(()),
            Terminal::Failed(err) => Err(err),
        }
    }

    /// The captured error, if the connection failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Terminal::Failed(err) => Some(err),
            Terminal::Closed(_) => None,
        }
    }
}

type TerminalListener = Box<dyn FnOnce(&Terminal) + Send>;

struct Inner {
    opened: bool,
    close_requested: bool,
    terminal: Option<Terminal>,
    listeners: Vec<TerminalListener>,
}

/// Observes lifecycle events and exposes awaitable readiness and termination.
///
/// The terminal slot is written once; the first close or error wins.
pub(crate) struct StateTracker {
    state: watch::Sender<ConnectionState>,
    inner: Mutex<Inner>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            state,
            inner: Mutex::new(Inner {
                opened: false,
                close_requested: false,
                terminal: None,
                listeners: Vec::new(),
            }),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn terminal(&self) -> Option<Terminal> {
        self.inner.lock().terminal.clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        debug_assert!(
            prev == next || prev.can_transition_to(next),
            "invalid transition {prev} -> {next}"
        );
        debug!(from = %prev, to = %next, "connection state changed");
    }

    /// Record the transport's `open` event.
    ///
    /// Returns `false` if the event was ignored because the connection
    /// already ended. A close requested while connecting moves the
    /// connection straight on to `Closing`.
    pub(crate) fn mark_open(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.terminal.is_some() || inner.opened {
            return false;
        }
        inner.opened = true;
        self.set_state(ConnectionState::Open);
        if inner.close_requested {
            self.set_state(ConnectionState::Closing);
        }
        true
    }

    /// Record a local close request.
    ///
    /// Returns `true` only for the first request on a live connection; the
    /// caller must then ask the transport to close.
    pub(crate) fn request_close(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.terminal.is_some() || inner.close_requested {
            return false;
        }
        inner.close_requested = true;
        if inner.opened {
            self.set_state(ConnectionState::Closing);
        }
        true
    }

    /// Fill the terminal slot and notify every registered listener.
    ///
    /// Returns `false` if the slot was already filled.
    pub(crate) fn terminate(&self, terminal: Terminal) -> bool {
        let listeners = {
            let mut inner = self.inner.lock();
            if inner.terminal.is_some() {
                return false;
            }
            inner.terminal = Some(terminal.clone());
            self.set_state(match terminal {
                Terminal::Closed(_) => ConnectionState::Closed,
                Terminal::Failed(_) => ConnectionState::Errored,
            });
            std::mem::take(&mut inner.listeners)
        };
        for listener in listeners {
            listener(&terminal);
        }
        true
    }

    /// Register interest in the terminal event.
    ///
    /// Fires at most once. A listener registered after termination is
    /// called immediately.
    pub(crate) fn on_terminal<F>(&self, listener: F)
    where
        F: FnOnce(&Terminal) + Send + 'static,
    {
        let terminal = {
            let mut inner = self.inner.lock();
            match &inner.terminal {
                Some(terminal) => terminal.clone(),
                None => {
                    inner.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&terminal);
    }

    /// Wait until the connection opens.
    ///
    /// Fails with the captured error if the connection failed first, or with
    /// [`Error::ConnectionClosed`] if it closed without ever opening.
    pub(crate) async fn wait_open(&self) -> Result<()> {
        self.wait_open_or_end().await;
        self.open_outcome()
    }

    /// Wait until the connection either opens or ends without opening.
    ///
    /// Returns whether it opened.
    pub(crate) async fn wait_open_or_end(&self) -> bool {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|s| *s != ConnectionState::Connecting).await;
        self.opened()
    }

    fn open_outcome(&self) -> Result<()> {
        let inner = self.inner.lock();
        match &inner.terminal {
            Some(Terminal::Failed(err)) => Err(err.clone()),
            _ if inner.opened => Ok(()),
            Some(Terminal::Closed(frame)) => Err(Error::ConnectionClosed(
                frame.as_ref().map(|f| f.code.as_u16()),
            )),
            None => Err(Error::ConnectionClosed(None)),
        }
    }

    /// Wait until the connection stops accepting writes (closing or terminal).
    pub(crate) async fn wait_not_writable(&self) {
        let mut rx = self.state.subscribe();
        // Cannot observe a closed channel while `self` holds the sender.
        let _ = rx
            .wait_for(|s| !matches!(s, ConnectionState::Connecting | ConnectionState::Open))
            .await;
    }

    /// Wait for the terminal event.
    pub(crate) async fn wait_terminal(&self) -> Terminal {
        let mut rx = self.state.subscribe();
        // Cannot observe a closed channel while `self` holds the sender.
        let _ = rx.wait_for(ConnectionState::is_terminal).await;
        self.terminal().unwrap_or(Terminal::Closed(None))
    }

    /// What either half reports once the connection stops carrying data.
    ///
    /// `None` means a normal end. A local close ends both halves normally,
    /// including when the transport fails while the close is in flight; the
    /// failure stays visible through [`terminal`](Self::terminal).
    pub(crate) fn end_of_stream(&self) -> Option<Error> {
        let inner = self.inner.lock();
        match &inner.terminal {
            _ if inner.close_requested => None,
            Some(Terminal::Failed(err)) => Some(err.clone()),
            _ if inner.opened => None,
            Some(Terminal::Closed(frame)) => Some(Error::ConnectionClosed(
                frame.as_ref().map(|f| f.code.as_u16()),
            )),
            None => None,
        }
    }

    /// Whether the transport has ever reported `open`.
    pub(crate) fn opened(&self) -> bool {
        self.inner.lock().opened
    }
}
