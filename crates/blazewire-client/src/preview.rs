use blazewire_store::ReadStream;

/// Separator between the pattern id and the JPEG body of a preview image.
pub const PREVIEW_ID_TERMINATOR: u8 = 0xFF;

/// Read the pattern id that prefixes a preview image, leaving the stream at
/// the first JPEG byte.
///
/// Ids longer than `limit` are truncated and the rest skipped.
pub fn read_preview_id(stream: &mut dyn ReadStream, limit: usize) -> String {
    let mut id = Vec::new();
    while let Some(byte) = stream.read_byte() {
        if byte == PREVIEW_ID_TERMINATOR {
            break;
        }
        if id.len() < limit {
            id.push(byte);
        }
    }
    String::from_utf8_lossy(&id).into_owned()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use blazewire_store::{BufferStore, MemoryStore};

    use super::*;

    #[test]
    fn splits_id_from_image() {
        let mut store = MemoryStore::default();
        store
            .open_write("img", false)
            .unwrap()
            .write(&[b'a', b'b', 0xFF, 0xD8, 0xFF, 0xE0]);
        let mut stream = store.open_read("img").unwrap();

        assert_eq!(read_preview_id(&mut *stream, 128), "ab");
        let mut jpeg = Vec::new();
        stream.read_to_end(&mut jpeg).unwrap();
        assert_eq!(jpeg, vec![0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn long_id_is_truncated() {
        let mut store = MemoryStore::default();
        store
            .open_write("img", false)
            .unwrap()
            .write(&[b'1', b'2', b'3', b'4', 0xFF, 0xD8]);
        let mut stream = store.open_read("img").unwrap();

        assert_eq!(read_preview_id(&mut *stream, 2), "12");
        assert_eq!(stream.read_byte(), Some(0xD8));
    }
}
