use std::io::ErrorKind;
use std::net::TcpStream;

use bytes::{Buf, Bytes};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use crate::error::{Result, TransportError};
use crate::traits::{InboundMessage, MessageKind, Transport};

type WsStream = WebSocket<MaybeTlsStream<TcpStream>>;

/// Default controller WebSocket port.
pub const DEFAULT_PORT: u16 = 81;

/// Poll-based WebSocket transport.
///
/// The socket is switched to non-blocking mode after the handshake, so
/// `next_message` returns `Ok(None)` instead of waiting when nothing has
/// arrived.
pub struct WsTransport {
    url: String,
    socket: Option<WsStream>,
    current: Option<(MessageKind, Bytes)>,
}

impl WsTransport {
    /// Connect to a controller. Accepts `host`, `host:port` or a full `ws://` URL.
    pub fn connect(address: &str) -> Result<Self> {
        let mut transport = Self {
            url: normalize_ws_url(address),
            socket: None,
            current: None,
        };
        transport.dial()?;
        Ok(transport)
    }

    /// The URL this transport dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn dial(&mut self) -> Result<()> {
        let (socket, _response) = connect(self.url.as_str()).map_err(|e| {
            TransportError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream.set_nonblocking(true)?;
            stream.set_nodelay(true)?;
        }

        info!(url = %self.url, "connected to controller");
        self.socket = Some(socket);
        self.current = None;
        Ok(())
    }

    fn drop_socket(&mut self) {
        self.socket = None;
        self.current = None;
    }

    fn send(&mut self, message: Message) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(TransportError::Closed)?;
        match socket.send(message) {
            Ok(()) => Ok(()),
            // Queued in the write buffer; flushed on a later call.
            Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.drop_socket();
                Err(TransportError::Closed)
            }
            Err(e) => Err(TransportError::Protocol(e.to_string())),
        }
    }
}

impl Transport for WsTransport {
    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        self.current = None;
        let socket = self.socket.as_mut().ok_or(TransportError::Closed)?;

        loop {
            let (kind, body) = match socket.read() {
                Ok(Message::Text(text)) => (MessageKind::Text, Bytes::from(text)),
                Ok(Message::Binary(data)) => (MessageKind::Binary, Bytes::from(data)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "controller closed the connection");
                    self.drop_socket();
                    return Err(TransportError::Closed);
                }
                // Ping, pong and raw frames carry nothing for the client.
                Ok(_) => continue,
                Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock => {
                    return Ok(None);
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.drop_socket();
                    return Err(TransportError::Closed);
                }
                Err(e) => {
                    warn!(error = %e, "websocket read failed");
                    self.drop_socket();
                    return Err(TransportError::Protocol(e.to_string()));
                }
            };

            let len = body.len();
            self.current = Some((kind, body));
            return Ok(Some(InboundMessage { kind, len }));
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some((_, body)) = self.current.as_mut() else {
            return Err(TransportError::NoMessage);
        };
        let n = buf.len().min(body.remaining());
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
        self.send(Message::Text(text.to_string()))
    }

    fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        self.send(Message::Binary(payload.to_vec()))
    }

    fn reconnect(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
        }
        self.dial()
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}

/// Turn `host`, `host:port` or a URL into a `ws://` URL with an explicit port.
pub fn normalize_ws_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("ws://") || address.starts_with("wss://") {
        return address.to_string();
    }
    if address.contains(':') {
        format!("ws://{address}")
    } else {
        format!("ws://{address}:{DEFAULT_PORT}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_host() {
        assert_eq!(normalize_ws_url("192.168.1.20"), "ws://192.168.1.20:81");
    }

    #[test]
    fn keeps_explicit_port_and_scheme() {
        assert_eq!(normalize_ws_url("pb.local:8181"), "ws://pb.local:8181");
        assert_eq!(normalize_ws_url("ws://pb.local:81/"), "ws://pb.local:81");
    }

    #[test]
    fn connect_refused_is_reported() {
        let result = WsTransport::connect("127.0.0.1:1");
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
