//! The reading half: a pull-based stream of inbound messages.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::stream::{FusedStream, Stream};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};

/// Stream of messages received on a connection.
///
/// Yields every received message in arrival order, then ends:
///
/// - with `None` when the connection closes cleanly or is closed locally,
/// - with one `Err` carrying the connection's captured error when it failed,
///   after all messages buffered before the failure have been yielded.
///
/// A `Source` is single-pass. Only one source per connection receives
/// messages; any further source yields [`Error::SourceAlreadyClaimed`].
#[derive(Debug)]
pub struct Source {
    connection: Connection,
    claimed: bool,
    done: bool,
}

impl Source {
    pub(crate) fn new(connection: Connection) -> Self {
        let claimed = connection.claim_source();
        if !claimed {
            warn!("connection already has a source");
        }
        Self {
            connection,
            claimed,
            done: false,
        }
    }

    /// Wait until the underlying connection is open.
    pub async fn connected(&self) -> Result<()> {
        self.connection.connected().await
    }

    /// The connection this source reads from.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Stream for Source {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if !this.claimed {
            this.done = true;
            return Poll::Ready(Some(Err(Error::SourceAlreadyClaimed)));
        }

        match this.connection.inbound().poll_pull(cx) {
            Poll::Ready(Some(message)) => Poll::Ready(Some(Ok(message))),
            Poll::Ready(None) => {
                this.done = true;
                match this.connection.tracker().end_of_stream() {
                    Some(err) => {
                        debug!(error = %err, "source ended with error");
                        Poll::Ready(Some(Err(err)))
                    }
                    None => {
                        debug!("source ended");
                        Poll::Ready(None)
                    }
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (self.connection.buffered(), None)
        }
    }
}

impl FusedStream for Source {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
