//! Mock transport for testing.
//!
//! Allows queueing inbound frames and capturing sent frames for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    connect_count: usize,
    sent_frames: Vec<String>,
    receive_queue: VecDeque<String>,
    hold_open: bool,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame to be returned by a later `recv()` call.
    pub fn queue_response(&self, frame: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(frame.into());
    }

    /// Queue several frames in order.
    pub fn queue_responses(&self, frames: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .receive_queue
            .extend(frames.iter().map(|frame| frame.to_string()));
    }

    /// Make `recv()` wait forever instead of reporting a closed connection
    /// once the queue is empty, like an idle socket.
    pub fn hold_open_when_empty(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.hold_open = true;
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_frames.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_frames.last().cloned()
    }

    /// Number of frames still waiting to be received.
    pub fn queued_len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.receive_queue.len()
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_address.clone()
    }

    /// How many times `connect()` succeeded.
    pub fn connect_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connect_count += 1;
        inner.connected_address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let hold_open = {
            let mut inner = self.inner.lock().unwrap();

            if !inner.connected {
                return Err(TransportError::NotConnected);
            }

            if let Some(error) = inner.fail_next_recv.take() {
                return Err(TransportError::ReceiveFailed(error));
            }

            if let Some(frame) = inner.receive_queue.pop_front() {
                return Ok(frame);
            }
            inner.hold_open
        };

        if hold_open {
            std::future::pending::<()>().await;
        }
        Err(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        Ok(())
    }
}
