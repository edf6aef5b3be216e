//! Inbound message queue bridging pushed events to pulled reads.
//!
//! The queue is unbounded: the transport has already received the bytes, so
//! refusing them is not an option. A slow reader simply leaves messages
//! buffered. Callers that need bounded memory must limit consumption
//! themselves.

use std::collections::VecDeque;
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use parking_lot::Mutex;

struct Inner {
    items: VecDeque<Bytes>,
    waiter: Option<Waker>,
    ended: bool,
}

/// FIFO buffer with a single waiting-consumer slot.
///
/// `push` either wakes the parked consumer or just buffers; `poll_pull`
/// either drains a buffered message or parks the consumer.
pub(crate) struct InboundQueue {
    inner: Mutex<Inner>,
}

impl InboundQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                waiter: None,
                ended: false,
            }),
        }
    }

    /// Append a message. Returns `false` if the queue has already ended.
    pub(crate) fn push(&self, message: Bytes) -> bool {
        let waiter = {
            let mut inner = self.inner.lock();
            if inner.ended {
                return false;
            }
            inner.items.push_back(message);
            inner.waiter.take()
        };
        if let Some(waker) = waiter {
            waker.wake();
        }
        true
    }

    /// Stop accepting messages. Buffered messages remain readable.
    ///
    /// Returns `false` if the queue had already ended.
    pub(crate) fn end(&self) -> bool {
        let waiter = {
            let mut inner = self.inner.lock();
            if inner.ended {
                return false;
            }
            inner.ended = true;
            inner.waiter.take()
        };
        if let Some(waker) = waiter {
            waker.wake();
        }
        true
    }

    /// Take the next message, `None` once ended and drained, or park the caller.
    pub(crate) fn poll_pull(&self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.items.pop_front() {
            return Poll::Ready(Some(message));
        }
        if inner.ended {
            return Poll::Ready(None);
        }
        if !inner
            .waiter
            .as_ref()
            .is_some_and(|w| w.will_wake(cx.waker()))
        {
            inner.waiter = Some(cx.waker().clone());
        }
        Poll::Pending
    }

    #[cfg(test)]
    pub(crate) async fn pull(&self) -> Option<Bytes> {
        std::future::poll_fn(|cx| self.poll_pull(cx)).await
    }

    /// Number of buffered messages.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.inner.lock().ended
    }
}
