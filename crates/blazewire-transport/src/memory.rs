use std::collections::VecDeque;

use bytes::{Buf, Bytes};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{InboundMessage, MessageKind, Transport};

/// A message sent through a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Bytes),
}

impl Outbound {
    /// The text body, if this was a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Outbound::Text(text) => Some(text),
            Outbound::Binary(_) => None,
        }
    }
}

/// In-memory transport with a scripted inbound queue.
///
/// Inbound messages are pushed by the owner and consumed in order. Outbound
/// messages are recorded for inspection. Reads can be capped to a maximum
/// number of bytes per call to exercise partial-read handling.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: VecDeque<(MessageKind, Bytes)>,
    current: Option<(MessageKind, Bytes)>,
    sent: Vec<Outbound>,
    connected: bool,
    reconnect_succeeds: bool,
    reconnect_attempts: usize,
    max_read: Option<usize>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Create a connected transport with nothing buffered.
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            current: None,
            sent: Vec::new(),
            connected: true,
            reconnect_succeeds: true,
            reconnect_attempts: 0,
            max_read: None,
        }
    }

    /// Cap every `read_bytes` call to at most `max` bytes.
    pub fn with_max_read(mut self, max: usize) -> Self {
        self.max_read = Some(max.max(1));
        self
    }

    /// Buffer an inbound text message.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.inbound
            .push_back((MessageKind::Text, Bytes::from(text.into())));
    }

    /// Buffer an inbound binary message.
    pub fn push_binary(&mut self, payload: impl Into<Bytes>) {
        self.inbound
            .push_back((MessageKind::Binary, payload.into()));
    }

    /// Messages still waiting to become current.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Everything sent so far.
    pub fn sent(&self) -> &[Outbound] {
        &self.sent
    }

    /// Drain the record of sent messages.
    pub fn take_sent(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.sent)
    }

    /// Simulate the remote end dropping the connection.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.current = None;
    }

    /// Control whether subsequent `reconnect` calls succeed.
    pub fn set_reconnect_succeeds(&mut self, succeeds: bool) {
        self.reconnect_succeeds = succeeds;
    }

    /// Number of `reconnect` calls observed.
    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts
    }
}

impl Transport for MemoryTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        if !self.connected {
            return Err(TransportError::Closed);
        }

        self.current = self.inbound.pop_front();
        Ok(self.current.as_ref().map(|(kind, body)| InboundMessage {
            kind: *kind,
            len: body.len(),
        }))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some((_, body)) = self.current.as_mut() else {
            return Err(TransportError::NoMessage);
        };

        let mut n = buf.len().min(body.remaining());
        if let Some(max) = self.max_read {
            n = n.min(max);
        }
        body.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.current
            .as_ref()
            .and_then(|(_, body)| body.first().copied())
    }

    fn available(&self) -> usize {
        self.current
            .as_ref()
            .map(|(_, body)| body.remaining())
            .unwrap_or(0)
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        self.sent.push(Outbound::Text(text.to_string()));
        Ok(())
    }

    fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        self.sent
            .push(Outbound::Binary(Bytes::copy_from_slice(payload)));
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.reconnect_attempts += 1;
        if self.reconnect_succeeds {
            debug!("memory transport reconnected");
            self.connected = true;
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}
