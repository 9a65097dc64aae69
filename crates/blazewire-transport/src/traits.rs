use crate::error::{Result, TransportError};

/// The two message kinds multiplexed over a controller connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A single JSON object.
    Text,
    /// A binary frame: type byte, flag byte, payload.
    Binary,
}

impl MessageKind {
    /// Short name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Binary => "binary",
        }
    }
}

/// Metadata for the message most recently made current by
/// [`Transport::next_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage {
    /// Whether the message is text or binary.
    pub kind: MessageKind,
    /// Total message length in bytes.
    pub len: usize,
}

/// A message-oriented connection to a controller.
///
/// Messages are whole application-level units. Reading happens against the
/// *current* message: `next_message` discards whatever is left of the
/// previous one and makes the next buffered message current. None of these
/// calls block waiting on the network.
pub trait Transport {
    /// Whether the connection is believed to be up.
    fn is_connected(&self) -> bool;

    /// Advance to the next buffered inbound message.
    ///
    /// Returns `Ok(None)` when nothing is buffered right now.
    fn next_message(&mut self) -> Result<Option<InboundMessage>>;

    /// Copy up to `buf.len()` unread bytes of the current message into `buf`.
    ///
    /// Returns `Ok(0)` once the current message is exhausted. Implementations
    /// may return fewer bytes than are available.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Look at the next unread byte of the current message without consuming it.
    fn peek_byte(&self) -> Option<u8>;

    /// Unread bytes left in the current message.
    fn available(&self) -> usize;

    /// Send one text message.
    fn send_text(&mut self, text: &str) -> Result<()>;

    /// Send one binary message.
    fn send_binary(&mut self, payload: &[u8]) -> Result<()>;

    /// Try to re-establish a dropped connection.
    fn reconnect(&mut self) -> Result<()> {
        Err(TransportError::ReconnectUnsupported)
    }

    /// Consume one byte of the current message.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_bytes(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Consume the rest of the current message.
    fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.available());
        let mut chunk = [0u8; 512];
        loop {
            let n = self.read_bytes(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        (**self).next_message()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_bytes(buf)
    }

    fn peek_byte(&self) -> Option<u8> {
        (**self).peek_byte()
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        (**self).send_text(text)
    }

    fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send_binary(payload)
    }

    fn reconnect(&mut self) -> Result<()> {
        (**self).reconnect()
    }
}
