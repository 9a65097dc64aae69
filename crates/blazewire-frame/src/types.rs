//! Binary frame type codes.
//!
//! Values are fixed by the controller firmware.

/// Upload pattern source.
pub const PUT_SOURCE: u8 = 1;

/// Upload compiled pattern bytecode.
pub const PUT_BYTECODE: u8 = 3;

/// Pattern preview image (id, 0xFF, JPEG).
pub const PREVIEW_IMAGE: u8 = 4;

/// Live preview pixel frame.
pub const PREVIEW_FRAME: u8 = 5;

/// Download pattern source.
pub const GET_SOURCE: u8 = 6;

/// Program list (`id\tname\n` records).
pub const PROGRAM_LIST: u8 = 7;

/// Upload pixel map.
pub const PUT_PIXEL_MAP: u8 = 8;

/// Output expander configuration.
pub const EXPANDER_CONFIG: u8 = 9;

/// Returns a human-readable name for a frame type.
pub fn type_name(code: u8) -> &'static str {
    match code {
        PUT_SOURCE => "PUT_SOURCE",
        PUT_BYTECODE => "PUT_BYTECODE",
        PREVIEW_IMAGE => "PREVIEW_IMAGE",
        PREVIEW_FRAME => "PREVIEW_FRAME",
        GET_SOURCE => "GET_SOURCE",
        PROGRAM_LIST => "PROGRAM_LIST",
        PUT_PIXEL_MAP => "PUT_PIXEL_MAP",
        EXPANDER_CONFIG => "EXPANDER_CONFIG",
        _ => "UNKNOWN",
    }
}

/// Returns true if the type code is one the firmware is known to emit or accept.
pub fn is_known(code: u8) -> bool {
    matches!(
        code,
        PUT_SOURCE
            | PUT_BYTECODE
            | PREVIEW_IMAGE
            | PREVIEW_FRAME
            | GET_SOURCE
            | PROGRAM_LIST
            | PUT_PIXEL_MAP
            | EXPANDER_CONFIG
    )
}
