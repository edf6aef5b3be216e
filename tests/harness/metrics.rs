//! Counters for concurrency tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    connections: AtomicUsize,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
    clean_ends: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self) {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_messages_sent(&self, n: usize) {
        self.inner.messages_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clean_end(&self) {
        self.inner.clean_ends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> usize {
        self.inner.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> usize {
        self.inner.messages_received.load(Ordering::Relaxed)
    }

    pub fn clean_ends(&self) -> usize {
        self.inner.clean_ends.load(Ordering::Relaxed)
    }
}
