use blazewire_transport::Transport;
use tracing::debug;

use crate::codec::{fragment, FrameConfig};
use crate::error::Result;
use crate::types::type_name;

/// Sends binary messages over a transport, fragmenting them into frames.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Transport> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Fragment `payload` and send every frame. Returns the number of frames sent.
    pub fn send(&mut self, frame_type: u8, payload: &[u8]) -> Result<usize> {
        let frames = fragment(frame_type, payload, self.config.max_fragment)?;
        for frame in &frames {
            self.inner.send_binary(frame)?;
        }
        debug!(
            frame_type = type_name(frame_type),
            frames = frames.len(),
            bytes = payload.len(),
            "sent binary message"
        );
        Ok(frames.len())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use blazewire_transport::{MemoryTransport, Outbound};

    use super::*;
    use crate::types::PUT_PIXEL_MAP;

    #[test]
    fn send_fragments_over_transport() {
        let mut transport = MemoryTransport::new();
        let config = FrameConfig { max_fragment: 4 };
        let sent = FrameWriter::with_config(&mut transport, config)
            .send(PUT_PIXEL_MAP, b"0123456789")
            .unwrap();
        assert_eq!(sent, 3);

        let out = transport.take_sent();
        let flags: Vec<u8> = out
            .iter()
            .map(|m| match m {
                Outbound::Binary(b) => b[1],
                Outbound::Text(_) => panic!("unexpected text"),
            })
            .collect();
        assert_eq!(flags, vec![1, 2, 4]);
    }

    #[test]
    fn send_to_closed_transport_fails() {
        let mut transport = MemoryTransport::new();
        transport.disconnect();
        let err = FrameWriter::new(&mut transport)
            .send(PUT_PIXEL_MAP, b"x")
            .unwrap_err();
        assert!(matches!(err, crate::FrameError::Transport(_)));
    }
}
