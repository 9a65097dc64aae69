use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::{BufferStore, ReadStream, WriteStream};

/// Decides whether a stored file may be removed by garbage collection.
pub type TrashPredicate = Box<dyn Fn(&Path, &Metadata) -> bool + Send>;

/// One file per buffer id under a root directory.
pub struct DirStore {
    root: PathBuf,
    is_trash: TrashPredicate,
}

impl DirStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>, is_trash: TrashPredicate) -> Self {
        Self {
            root: root.into(),
            is_trash,
        }
    }

    /// A store whose garbage collection removes every file.
    pub fn collect_all(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Box::new(|_, _| true))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let name: String = id
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        let name = if name.is_empty() || name.starts_with('.') {
            format!("_{name}")
        } else {
            name
        };
        self.root.join(name)
    }

    fn walk(&self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot garbage collect directory");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_dir() {
                removed += self.walk(&path);
            } else if (self.is_trash)(&path, &meta) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
                }
            }
        }
        removed
    }
}

impl std::fmt::Debug for DirStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirStore").field("root", &self.root).finish()
    }
}

fn map_open_error(id: &str, err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound { id: id.to_string() },
        ErrorKind::StorageFull => StoreError::Exhausted { id: id.to_string() },
        _ => StoreError::Io(err),
    }
}

impl BufferStore for DirStore {
    fn open_write(&mut self, id: &str, append: bool) -> Result<Box<dyn WriteStream + '_>> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(id);
        let file = OpenOptions::new()
            .create(!append)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|e| map_open_error(id, e))?;
        debug!(path = %path.display(), append, "opened buffer file for writing");
        Ok(Box::new(FileWriteStream { file, path }))
    }

    fn open_read(&mut self, id: &str) -> Result<Box<dyn ReadStream + '_>> {
        let file = File::open(self.path_for(id)).map_err(|e| map_open_error(id, e))?;
        Ok(Box::new(FileReadStream {
            inner: BufReader::new(file),
        }))
    }

    fn delete_result(&mut self, id: &str) {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete buffer file"),
        }
    }

    fn garbage_collect(&mut self) -> usize {
        let removed = self.walk(&self.root);
        debug!(root = %self.root.display(), removed, "garbage collected buffer files");
        removed
    }
}

struct FileWriteStream {
    file: File,
    path: PathBuf,
}

impl WriteStream for FileWriteStream {
    fn write(&mut self, bytes: &[u8]) -> usize {
        match self.file.write_all(bytes) {
            Ok(()) => bytes.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "buffer file write failed");
                0
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

struct FileReadStream {
    inner: BufReader<File>,
}

impl Read for FileReadStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ReadStream for FileReadStream {
    fn peek_byte(&mut self) -> Option<u8> {
        self.inner.fill_buf().ok().and_then(|b| b.first().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blazewire-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn write_append_read_delete() {
        let root = test_root("rw");
        let mut store = DirStore::collect_all(&root);

        assert_eq!(store.open_write("patterns.1", false).unwrap().write(b"ab"), 2);
        assert_eq!(store.open_write("patterns.1", true).unwrap().write(b"cd"), 2);

        let mut out = Vec::new();
        let mut r = store.open_read("patterns.1").unwrap();
        assert_eq!(r.peek_byte(), Some(b'a'));
        r.read_to_end(&mut out).unwrap();
        drop(r);
        assert_eq!(out, b"abcd");

        store.delete_result("patterns.1");
        assert!(matches!(
            store.open_read("patterns.1"),
            Err(StoreError::NotFound { .. })
        ));
        // Deleting twice is harmless.
        store.delete_result("patterns.1");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn append_to_missing_file_is_not_found() {
        let root = test_root("append");
        let mut store = DirStore::collect_all(&root);

        assert!(matches!(
            store.open_write("patterns.1", true),
            Err(StoreError::NotFound { .. })
        ));
        assert!(!store.path_for("patterns.1").exists());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn ids_cannot_escape_root() {
        let store = DirStore::collect_all("/tmp/root");
        assert_eq!(store.path_for("../x"), PathBuf::from("/tmp/root/_.._x"));
        assert_eq!(store.path_for("a/b"), PathBuf::from("/tmp/root/a_b"));
    }

    #[test]
    fn gc_removes_only_trash() {
        let root = test_root("gc");
        let mut store = DirStore::new(
            &root,
            Box::new(|path, _| path.extension().is_some_and(|e| e == "tmp")),
        );
        store.open_write("keep", false).unwrap().write(b"1");
        store.open_write("drop.tmp", false).unwrap().write(b"2");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested").join("old.tmp"), b"3").unwrap();

        assert_eq!(store.garbage_collect(), 2);
        assert!(store.open_read("keep").is_ok());
        assert!(store.open_read("drop.tmp").is_err());

        fs::remove_dir_all(&root).unwrap();
    }
}
