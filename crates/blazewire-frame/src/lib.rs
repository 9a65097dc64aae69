//! Binary framing for the Pixelblaze wire protocol.
//!
//! Every binary WebSocket message starts with:
//! - A 1-byte type code (program list, preview image, expander config, ...)
//! - A 1-byte flag field marking the FIRST/MIDDLE/LAST segment of a message
//!
//! Long messages span several frames of the same type. This crate encodes,
//! decodes and fragments frames; reassembly lives in the client.

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, fragment, FrameConfig, FrameFlags, FrameHeader,
    DEFAULT_MAX_FRAGMENT, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{next_frame, peek_type, read_flags, read_header, read_type};
pub use types::{
    is_known, type_name, EXPANDER_CONFIG, GET_SOURCE, PREVIEW_FRAME, PREVIEW_IMAGE, PROGRAM_LIST,
    PUT_BYTECODE, PUT_PIXEL_MAP, PUT_SOURCE,
};
pub use writer::FrameWriter;
