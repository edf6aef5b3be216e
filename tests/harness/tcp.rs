//! TCP-backed probe transport.
//!
//! Only establishes the TCP connection; it is used to observe real
//! operating-system connection failures. Like dual-stack clients, it tries
//! the IPv6 and IPv4 loopback addresses and reports every failed attempt as
//! one aggregate error.

use bytes::Bytes;
use rsws_stream::{CloseFrame, Socket, SocketEvents, Transport, TransportError};
use tokio::net::{TcpListener, TcpStream};

/// Transport whose endpoints are bare port numbers on localhost.
pub struct TcpProbe;

pub struct ProbeSocket {
    events: SocketEvents,
}

impl Socket for ProbeSocket {
    fn send(&self, _data: Bytes) {}

    fn close(&self) {
        self.events.close(Some(CloseFrame::normal()));
    }
}

impl Transport for TcpProbe {
    type Socket = ProbeSocket;

    fn connect(&self, endpoint: &str, events: SocketEvents) -> ProbeSocket {
        let port = endpoint.to_owned();
        let task_events = events.clone();
        tokio::spawn(async move {
            let mut causes = Vec::new();
            for addr in [format!("[::1]:{port}"), format!("127.0.0.1:{port}")] {
                match TcpStream::connect(&addr).await {
                    Ok(_stream) => {
                        task_events.open();
                        return;
                    }
                    Err(err) => causes.push(TransportError::new(format!("connect {addr}: {err}"))),
                }
            }
            task_events.error(TransportError::aggregate("all connection attempts failed", causes));
            task_events.close(None);
        });
        ProbeSocket { events }
    }
}

/// A localhost port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
