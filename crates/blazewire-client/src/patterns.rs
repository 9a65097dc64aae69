use blazewire_store::ReadStream;
use serde::Serialize;
use tracing::warn;

/// One entry of the controller's pattern list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternEntry {
    pub id: String,
    pub name: String,
}

/// Iterates `id\tname\n` records from a reassembled program list.
///
/// Fields longer than the configured limit are truncated and the rest of the
/// field skipped. A record with no tab ends iteration.
pub struct PatternIter<'a> {
    stream: &'a mut dyn ReadStream,
    field_limit: usize,
    done: bool,
}

impl<'a> PatternIter<'a> {
    pub fn new(stream: &'a mut dyn ReadStream, field_limit: usize) -> Self {
        Self {
            stream,
            field_limit: field_limit.max(1),
            done: false,
        }
    }

    /// Read up to `stop`, keeping at most `field_limit` bytes. The flag is
    /// false if the stream ended before `stop`.
    fn read_field(&mut self, stop: u8) -> (Vec<u8>, bool) {
        let mut field = Vec::new();
        loop {
            match self.stream.read_byte() {
                Some(byte) if byte == stop => return (field, true),
                Some(byte) => {
                    if field.len() < self.field_limit {
                        field.push(byte);
                    }
                }
                None => return (field, false),
            }
        }
    }
}

impl Iterator for PatternIter<'_> {
    type Item = PatternEntry;

    fn next(&mut self) -> Option<PatternEntry> {
        if self.done {
            return None;
        }
        if self.stream.peek_byte().is_none() {
            self.done = true;
            return None;
        }

        let (id, found_tab) = self.read_field(b'\t');
        if !found_tab {
            warn!("malformed pattern list record");
            self.done = true;
            return None;
        }
        let (name, _) = self.read_field(b'\n');

        Some(PatternEntry {
            id: String::from_utf8_lossy(&id).into_owned(),
            name: String::from_utf8_lossy(&name).into_owned(),
        })
    }
}
