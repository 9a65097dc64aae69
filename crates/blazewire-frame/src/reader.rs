use blazewire_transport::{MessageKind, Transport};

use crate::codec::{FrameFlags, FrameHeader, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Look at the type byte of the current binary message without consuming it.
pub fn peek_type<T: Transport + ?Sized>(transport: &T) -> Option<u8> {
    transport.peek_byte()
}

/// Consume the type byte of the current message.
pub fn read_type<T: Transport + ?Sized>(transport: &mut T) -> Result<u8> {
    let remaining = transport.available();
    transport.read_byte()?.ok_or(FrameError::Truncated {
        len: remaining,
        needed: HEADER_SIZE,
    })
}

/// Consume the flag byte that follows the type byte.
pub fn read_flags<T: Transport + ?Sized>(transport: &mut T) -> Result<FrameFlags> {
    transport
        .read_byte()?
        .map(FrameFlags::from_bits)
        .ok_or(FrameError::Truncated {
            len: 1,
            needed: HEADER_SIZE,
        })
}

/// Consume both header bytes, leaving the transport positioned at the payload.
pub fn read_header<T: Transport + ?Sized>(transport: &mut T) -> Result<FrameHeader> {
    let frame_type = read_type(transport)?;
    let flags = read_flags(transport)?;
    Ok(FrameHeader::new(frame_type, flags))
}

/// Advance the transport and return the next message as a whole decoded frame.
///
/// Returns `Ok(None)` when nothing is buffered. Text messages are skipped.
pub fn next_frame<T: Transport + ?Sized>(transport: &mut T) -> Result<Option<(FrameHeader, Vec<u8>)>> {
    while let Some(message) = transport.next_message()? {
        if message.kind != MessageKind::Binary {
            continue;
        }
        let header = read_header(transport)?;
        let payload = transport.read_remaining()?;
        return Ok(Some((header, payload)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use blazewire_transport::MemoryTransport;

    use super::*;
    use crate::types::{PREVIEW_FRAME, PROGRAM_LIST};

    #[test]
    fn reads_header_then_payload() {
        let mut transport = MemoryTransport::new();
        transport.push_binary(vec![PROGRAM_LIST, 1, b'x', b'y']);
        transport.next_message().unwrap();

        assert_eq!(peek_type(&transport), Some(PROGRAM_LIST));
        let header = read_header(&mut transport).unwrap();
        assert_eq!(header.frame_type, PROGRAM_LIST);
        assert_eq!(header.flags, FrameFlags::FIRST);
        assert_eq!(transport.read_remaining().unwrap(), b"xy");
    }

    #[test]
    fn header_only_frame_has_empty_payload() {
        let mut transport = MemoryTransport::new();
        transport.push_binary(vec![PROGRAM_LIST, 4]);
        transport.next_message().unwrap();

        let header = read_header(&mut transport).unwrap();
        assert!(header.flags.is_last());
        assert_eq!(transport.available(), 0);
    }

    #[test]
    fn missing_flag_byte_is_truncated() {
        let mut transport = MemoryTransport::new();
        transport.push_binary(vec![PREVIEW_FRAME]);
        transport.next_message().unwrap();

        assert!(matches!(
            read_header(&mut transport),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn next_frame_skips_text() {
        let mut transport = MemoryTransport::new();
        transport.push_text("{\"fps\":60}");
        transport.push_binary(vec![PREVIEW_FRAME, 5, 0xAA]);

        let (header, payload) = next_frame(&mut transport).unwrap().unwrap();
        assert_eq!(header.frame_type, PREVIEW_FRAME);
        assert!(header.flags.is_single());
        assert_eq!(payload, vec![0xAA]);
        assert!(next_frame(&mut transport).unwrap().is_none());
    }
}
