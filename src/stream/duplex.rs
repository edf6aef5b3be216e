//! Both halves over one connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::stream::Stream;

use crate::config::Config;
use crate::connection::{Connection, ConnectionState};
use crate::error::Result;
use crate::stream::{Sink, Source};

/// A [`Source`] and a [`Sink`] sharing one connection.
///
/// Both halves observe the same terminal event: closing or failing through
/// either half is visible to the other on its next operation. `Duplex` adds
/// nothing the halves cannot do separately; it just keeps them together.
///
/// `Duplex` is itself a stream of inbound messages, delegating to its source.
#[derive(Debug)]
pub struct Duplex {
    connection: Connection,
    source: Source,
    sink: Sink,
}

impl Duplex {
    pub(crate) fn new(connection: Connection, config: Config) -> Self {
        let source = connection.source();
        let sink = connection.sink(config);
        Self {
            connection,
            source,
            sink,
        }
    }

    /// Wait until the connection is open.
    pub async fn connected(&self) -> Result<()> {
        self.connection.connected().await
    }

    /// Close the shared connection.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The shared connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The reading half.
    pub fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    /// A handle to the writing half.
    pub fn sink(&self) -> Sink {
        self.sink.clone()
    }

    /// Separate the halves so they can be driven independently.
    pub fn split(self) -> (Source, Sink) {
        (self.source, self.sink)
    }
}

impl Stream for Duplex {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().source).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}
