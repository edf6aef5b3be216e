//! Test harness utilities for stream integration tests.
//!
//! This module provides in-process servers, a TCP-backed probe transport for
//! real connection failures, and counters for concurrency tests.

#![allow(dead_code)]

mod metrics;
mod server;
mod tcp;

pub use metrics::Metrics;
pub use server::{ABORT, ECHO, READ, READ_VALUES, TestServer};
pub use tcp::{TcpProbe, unused_port};

use bytes::Bytes;

/// Turn string literals into payloads.
pub fn payloads(values: &[&str]) -> Vec<Bytes> {
    values
        .iter()
        .map(|v| Bytes::copy_from_slice(v.as_bytes()))
        .collect()
}
