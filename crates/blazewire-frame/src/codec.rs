use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: type (1) + flags (1) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Default largest payload carried by one outbound fragment.
pub const DEFAULT_MAX_FRAGMENT: usize = 8 * 1024;

/// Segment flags of a binary frame.
///
/// The bits are not mutually exclusive: a message that fits in one frame
/// carries both FIRST and LAST.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameFlags(u8);

impl FrameFlags {
    pub const FIRST: FrameFlags = FrameFlags(1);
    pub const MIDDLE: FrameFlags = FrameFlags(2);
    pub const LAST: FrameFlags = FrameFlags(4);
    /// FIRST | LAST: a complete message in one frame.
    pub const SINGLE: FrameFlags = FrameFlags(1 | 4);

    pub const fn from_bits(bits: u8) -> Self {
        FrameFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: FrameFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_first(self) -> bool {
        self.contains(Self::FIRST)
    }

    pub const fn is_middle(self) -> bool {
        self.contains(Self::MIDDLE)
    }

    pub const fn is_last(self) -> bool {
        self.contains(Self::LAST)
    }

    /// Both FIRST and LAST are set.
    pub const fn is_single(self) -> bool {
        self.contains(Self::SINGLE)
    }
}

impl std::ops::BitOr for FrameFlags {
    type Output = FrameFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        FrameFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for FrameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_first() {
            names.push("FIRST");
        }
        if self.is_middle() {
            names.push("MIDDLE");
        }
        if self.is_last() {
            names.push("LAST");
        }
        if names.is_empty() {
            write!(f, "FrameFlags({:#04x})", self.0)
        } else {
            write!(f, "FrameFlags({})", names.join("|"))
        }
    }
}

/// Type code and segment flags at the start of every binary frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u8,
    pub flags: FrameFlags,
}

impl FrameHeader {
    pub fn new(frame_type: u8, flags: FrameFlags) -> Self {
        Self { frame_type, flags }
    }
}

/// Encode one frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────────┬──────────────────────┐
/// │ Type (1B) │ Flags(1B) │ Payload (rest of msg) │
/// └───────────┴───────────┴──────────────────────┘
/// ```
/// Length is implied by the enclosing transport message.
pub fn encode_frame(header: FrameHeader, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(header.frame_type);
    dst.put_u8(header.flags.bits());
    dst.put_slice(payload);
}

/// Split a complete binary message into its header and payload.
pub fn decode_frame(src: &[u8]) -> Result<(FrameHeader, &[u8])> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            len: src.len(),
            needed: HEADER_SIZE,
        });
    }
    let header = FrameHeader::new(src[0], FrameFlags::from_bits(src[1]));
    Ok((header, &src[HEADER_SIZE..]))
}

/// Fragment a payload into encoded frames of at most `max_fragment` payload bytes.
///
/// A payload that fits in one fragment is sent as a single FIRST|LAST frame.
/// Longer payloads become FIRST, zero or more MIDDLE, then LAST.
pub fn fragment(frame_type: u8, payload: &[u8], max_fragment: usize) -> Result<Vec<Bytes>> {
    if payload.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    if max_fragment == 0 {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: 0,
        });
    }

    let chunks: Vec<&[u8]> = payload.chunks(max_fragment).collect();
    let last = chunks.len() - 1;
    let mut frames = Vec::with_capacity(chunks.len());

    for (i, chunk) in chunks.into_iter().enumerate() {
        let flags = match (i == 0, i == last) {
            (true, true) => FrameFlags::SINGLE,
            (true, false) => FrameFlags::FIRST,
            (false, true) => FrameFlags::LAST,
            (false, false) => FrameFlags::MIDDLE,
        };
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + chunk.len());
        encode_frame(FrameHeader::new(frame_type, flags), chunk, &mut buf);
        frames.push(buf.freeze());
    }

    Ok(frames)
}

/// Configuration for outbound framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest payload per outbound fragment. Default: 8 KiB.
    pub max_fragment: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_fragment: DEFAULT_MAX_FRAGMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EXPANDER_CONFIG, PROGRAM_LIST, PUT_SOURCE};

    #[test]
    fn test_encode_decode_header() {
        let mut buf = BytesMut::new();
        encode_frame(
            FrameHeader::new(PROGRAM_LIST, FrameFlags::FIRST),
            b"1\tRainbow\n",
            &mut buf,
        );

        let (header, payload) = decode_frame(&buf).unwrap();
        assert_eq!(header.frame_type, PROGRAM_LIST);
        assert!(header.flags.is_first());
        assert!(!header.flags.is_last());
        assert_eq!(payload, b"1\tRainbow\n");
    }

    #[test]
    fn test_decode_truncated() {
        let result = decode_frame(&[EXPANDER_CONFIG]);
        assert!(matches!(
            result,
            Err(FrameError::Truncated { len: 1, needed: 2 })
        ));
    }

    #[test]
    fn test_single_flag_needs_both_bits() {
        assert!(FrameFlags::from_bits(5).is_single());
        assert!(!FrameFlags::FIRST.is_single());
        assert!(!FrameFlags::LAST.is_single());
        assert!(FrameFlags::from_bits(7).is_single());
    }

    #[test]
    fn test_fragment_single() {
        let frames = fragment(PUT_SOURCE, b"abc", 16).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), &[PUT_SOURCE, 5, b'a', b'b', b'c']);
    }

    #[test]
    fn test_fragment_sequence() {
        let frames = fragment(PUT_SOURCE, b"abcdefg", 3).unwrap();
        let flags: Vec<u8> = frames.iter().map(|f| f[1]).collect();
        assert_eq!(flags, vec![1, 2, 4]);

        let joined: Vec<u8> = frames
            .iter()
            .flat_map(|f| f[HEADER_SIZE..].to_vec())
            .collect();
        assert_eq!(joined, b"abcdefg");
    }

    #[test]
    fn test_fragment_rejects_empty() {
        assert!(matches!(
            fragment(PUT_SOURCE, b"", 8),
            Err(FrameError::EmptyFrame)
        ));
        assert!(matches!(
            fragment(PUT_SOURCE, b"x", 0),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_flags_debug() {
        assert_eq!(
            format!("{:?}", FrameFlags::FIRST | FrameFlags::LAST),
            "FrameFlags(FIRST|LAST)"
        );
        assert_eq!(format!("{:?}", FrameFlags::from_bits(0)), "FrameFlags(0x00)");
    }
}
