//! The writing half: forwards a caller-supplied stream to the socket.

use std::pin::pin;

use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;

/// Consumes a stream of outbound messages.
///
/// Waits for the connection to open before the first write, then sends each
/// element in order. When the input ends the connection is closed unless
/// [`Config::close_on_end`] is `false`.
#[derive(Debug, Clone)]
pub struct Sink {
    connection: Connection,
    config: Config,
}

impl Sink {
    pub(crate) fn new(connection: Connection, config: Config) -> Self {
        Self { connection, config }
    }

    /// Send every element of `input`.
    ///
    /// ## Errors
    ///
    /// Returns the same error the paired [`Source`](crate::Source) ends with:
    /// the connection's captured error if it fails before opening or while
    /// writing. Input is not consumed past the point where the connection
    /// stops being writable. A clean close stops the sink without error, and
    /// so does a local close, even one the transport fails to complete.
    pub async fn consume<S, T>(self, input: S) -> Result<()>
    where
        S: Stream<Item = T>,
        T: Into<Bytes>,
    {
        let tracker = self.connection.tracker();
        if !tracker.wait_open_or_end().await {
            debug!(state = %self.connection.state(), "sink stopped, connection ended before open");
            return self.outcome();
        }

        let mut input = pin!(input);
        let mut sent = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                () = tracker.wait_not_writable() => {
                    debug!(sent, state = %self.connection.state(), "sink stopped, connection not writable");
                    return self.outcome();
                }
                next = input.next() => next,
            };
            let Some(item) = next else {
                break;
            };
            self.connection.send(item.into());
            sent += 1;
        }

        debug!(sent, close_on_end = self.config.close_on_end, "sink input ended");
        if self.config.close_on_end {
            self.connection.close();
            self.connection.closed().await;
            return self.outcome();
        }
        Ok(())
    }

    fn outcome(&self) -> Result<()> {
        match self.connection.tracker().end_of_stream() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run [`consume`](Self::consume) on a tokio task.
    ///
    /// The returned handle resolves to the sink's outcome, so errors are
    /// still observable when the caller does not await the writes directly.
    pub fn spawn<S, T>(self, input: S) -> JoinHandle<Result<()>>
    where
        S: Stream<Item = T> + Send + 'static,
        T: Into<Bytes> + Send + 'static,
    {
        tokio::spawn(self.consume(input))
    }

    /// Wait until the underlying connection is open.
    pub async fn connected(&self) -> Result<()> {
        self.connection.connected().await
    }

    /// The connection this sink writes to.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The sink's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{mock_connection, ConnectionState};
    use crate::error::{Error, TransportError};
    use crate::message::{CloseCode, CloseFrame};
    use futures_util::stream;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn items(values: &[&'static str]) -> impl Stream<Item = Bytes> + Send + 'static {
        stream::iter(
            values
                .iter()
                .map(|v| Bytes::from_static(v.as_bytes()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_waits_for_open_before_writing() {
        let (conn, events, socket) = mock_connection();
        let writer = conn.sink(Config::keep_open()).spawn(items(&["x", "y"]));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(socket.written().is_empty());

        events.open();
        writer.await.unwrap().unwrap();
        assert_eq!(
            socket.written(),
            vec![Bytes::from_static(b"x"), Bytes::from_static(b"y")]
        );
        assert_eq!(socket.close_count(), 0);
        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_close_on_end_waits_for_close() {
        let (conn, events, socket) = mock_connection();
        events.open();
        let writer = conn.sink(Config::default()).spawn(items(&["z"]));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(socket.close_count(), 1);
        assert!(!writer.is_finished());

        events.close(Some(CloseFrame::normal()));
        writer.await.unwrap().unwrap();
        assert_eq!(socket.written(), vec![Bytes::from_static(b"z")]);
    }

    #[tokio::test]
    async fn test_fails_with_connect_error() {
        let (conn, events, socket) = mock_connection();
        let writer = conn.sink(Config::default()).spawn(items(&["x"]));
        events.error(TransportError::new("connection refused"));

        let err = writer.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Connect(_)));
        assert!(socket.written().is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_error_stops_input() {
        let (conn, events, socket) = mock_connection();
        events.open();

        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let input = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let writer = conn.sink(Config::keep_open()).spawn(input);

        tx.send(Bytes::from_static(b"1")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        events.error(TransportError::new("connection reset by peer"));

        let err = writer.await.unwrap().unwrap_err();
        assert_eq!(Some(err), conn.error());
        assert!(tx.send(Bytes::from_static(b"2")).is_err());
        assert_eq!(socket.written(), vec![Bytes::from_static(b"1")]);
    }

    #[tokio::test]
    async fn test_local_close_stops_sink_cleanly() {
        let (conn, events, socket) = mock_connection();
        events.open();

        let input = futures_util::stream::pending::<Bytes>();
        let writer = conn.sink(Config::keep_open()).spawn(input);
        tokio::time::sleep(Duration::from_millis(10)).await;

        conn.close();
        writer.await.unwrap().unwrap();
        assert_eq!(socket.close_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_while_closing_on_end_matches_source() {
        let (conn, events, _socket) = mock_connection();
        events.open();
        let (mut source, sink) = conn.clone().duplex(Config::default()).split();
        let writer = sink.spawn(items(&[]));

        assert_eq!(source.next().await, None);
        assert!(!writer.is_finished());

        events.error(TransportError::new("broken pipe"));
        writer.await.unwrap().unwrap();
        assert!(matches!(
            conn.error(),
            Some(Error::Transport(e)) if e.message() == "broken pipe"
        ));
    }

    #[tokio::test]
    async fn test_close_before_open_then_transport_close_ends_cleanly() {
        let (conn, events, socket) = mock_connection();
        let (source, sink) = conn.clone().duplex(Config::keep_open()).split();

        conn.close();
        events.close(Some(CloseFrame::normal()));

        sink.consume(items(&["x"])).await.unwrap();
        assert_eq!(source.collect::<Vec<_>>().await, vec![]);
        assert!(socket.written().is_empty());
        assert_eq!(
            conn.connected().await,
            Err(Error::ConnectionClosed(Some(1000)))
        );
    }

    #[tokio::test]
    async fn test_remote_close_before_open_fails_like_source() {
        let (conn, events, _socket) = mock_connection();
        let (source, sink) = conn.duplex(Config::keep_open()).split();
        events.close(Some(CloseFrame::new(CloseCode::Abnormal, "")));

        let sink_err = sink.consume(items(&["x"])).await.unwrap_err();
        let source_items: Vec<_> = source.collect().await;
        assert_eq!(sink_err, Error::ConnectionClosed(Some(1006)));
        assert_eq!(source_items, vec![Err(sink_err)]);
    }

    #[tokio::test]
    async fn test_close_mid_input_stops_taking_elements() {
        let (conn, events, socket) = mock_connection();
        events.open();

        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let input = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let writer = conn.sink(Config::keep_open()).spawn(input);

        tx.send(Bytes::from_static(b"1")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        conn.close();
        let _ = tx.send(Bytes::from_static(b"2"));

        writer.await.unwrap().unwrap();
        assert_eq!(socket.written(), vec![Bytes::from_static(b"1")]);
        assert!(tx.send(Bytes::from_static(b"3")).is_err());
    }
}
