//! Ordered class search path.
//!
//! The [`crate::classpath::Classpath`] resolves internal class names
//! (`com/example/Foo`) to classfile bytes by probing an ordered list of entries:
//! plain directories of `.class` files and memory-mapped jar archives. The patch
//! pipeline inserts its scratch directory at the *front* of this list, which is the
//! entire trick that makes patched classes win over the pristine copies inside the
//! original jar.
//!
//! # Startup-ordering invariant
//!
//! Inserting an entry at the front only has an effect for classes that have not been
//! resolved yet. The classpath therefore records the moment the first class is read;
//! [`Classpath::insert_dir_front`] after that point is a fatal
//! [`crate::Error::StartupOrder`] rather than a silent no-op.
//!
//! # Concurrency
//!
//! Appending entries happens during single-threaded startup. After that the entry
//! list is read-only; jar archives carry an internal lock because the zip reader
//! needs exclusive access while inflating an entry.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use memmap2::Mmap;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::{Error, Result};

/// Cursor over a shared memory-mapped file, so the zip reader can seek without
/// owning the map exclusively.
struct MmapCursor {
    data: Arc<Mmap>,
    pos: u64,
}

impl Read for MmapCursor {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data: &[u8] = &self.data;
        let pos = usize::try_from(self.pos.min(data.len() as u64)).unwrap_or(data.len());
        let n = (data.len() - pos).min(buf.len());
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MmapCursor {
    fn seek(&mut self, from: SeekFrom) -> std::io::Result<u64> {
        let len = self.data.len() as i64;
        let new = match from {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => i64::try_from(self.pos).unwrap_or(i64::MAX) + delta,
        };
        if new < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of mapped archive",
            ));
        }
        self.pos = new as u64;
        Ok(self.pos)
    }
}

/// A memory-mapped jar archive on the search path.
pub struct JarArchive {
    path: PathBuf,
    archive: Mutex<ZipArchive<MmapCursor>>,
}

impl JarArchive {
    /// Open and memory-map the jar at `path`.
    ///
    /// # Errors
    /// [`Error::FileError`] if the file cannot be opened or mapped,
    /// [`Error::ZipError`] if it is not a readable archive.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and the jar is treated as immutable for
        // the process lifetime, matching the read-only input contract.
        let mmap = unsafe { Mmap::map(&file)? };
        let cursor = MmapCursor {
            data: Arc::new(mmap),
            pos: 0,
        };
        Ok(JarArchive {
            path: path.to_path_buf(),
            archive: Mutex::new(ZipArchive::new(cursor)?),
        })
    }

    /// Path this archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one entry by exact archive path, `Ok(None)` when absent.
    pub fn read_entry(&self, entry_name: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = lock_archive(&self.archive);
        // Bound to a local so the entry borrow ends before the guard drops
        let result = match archive.by_name(entry_name) {
            Ok(mut entry) => {
                let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        };
        result
    }

    /// Names of every entry in the archive, in archive order.
    #[must_use]
    pub fn entry_names(&self) -> Vec<String> {
        let archive = lock_archive(&self.archive);
        archive.file_names().map(str::to_string).collect()
    }
}

fn lock_archive(
    archive: &Mutex<ZipArchive<MmapCursor>>,
) -> std::sync::MutexGuard<'_, ZipArchive<MmapCursor>> {
    archive.lock().expect("Failed to acquire lock")
}

/// One entry on the class search path.
enum ClasspathEntry {
    Dir(PathBuf),
    Jar(Arc<JarArchive>),
}

/// The ordered class search path.
pub struct Classpath {
    entries: RwLock<Vec<ClasspathEntry>>,
    loads_begun: AtomicBool,
}

impl Classpath {
    /// An empty search path.
    #[must_use]
    pub fn new() -> Self {
        Classpath {
            entries: RwLock::new(Vec::new()),
            loads_begun: AtomicBool::new(false),
        }
    }

    /// Append a jar archive to the end of the search path.
    pub fn push_jar(&self, path: &Path) -> Result<Arc<JarArchive>> {
        let jar = Arc::new(JarArchive::open(path)?);
        write_lock!(self.entries).push(ClasspathEntry::Jar(jar.clone()));
        Ok(jar)
    }

    /// Append a directory of classfiles to the end of the search path.
    pub fn push_dir(&self, path: &Path) {
        write_lock!(self.entries).push(ClasspathEntry::Dir(path.to_path_buf()));
    }

    /// Insert a directory at the *front* of the search path, ahead of every
    /// existing entry.
    ///
    /// # Errors
    /// [`Error::StartupOrder`] if any class has already been resolved through this
    /// classpath; a front insertion at that point could never take effect for the
    /// classes already loaded and is a startup-ordering defect, not a runtime
    /// condition.
    pub fn insert_dir_front(&self, path: &Path) -> Result<()> {
        if self.loads_begun() {
            return Err(Error::StartupOrder(format!(
                "Cannot insert '{}' ahead of the search path: class loading has already begun",
                path.display()
            )));
        }
        write_lock!(self.entries).insert(0, ClasspathEntry::Dir(path.to_path_buf()));
        Ok(())
    }

    /// Resolve an internal class name (`com/example/Foo`) to classfile bytes,
    /// probing entries front to back.
    ///
    /// The first successful probe wins; later entries are never consulted. This is
    /// what gives the patched scratch directory precedence over the original jar.
    ///
    /// # Errors
    /// [`Error::ClassNotFound`] when no entry provides the class.
    pub fn read_class(&self, internal_name: &str) -> Result<Vec<u8>> {
        self.loads_begun.store(true, Ordering::SeqCst);

        let rel_path = format!("{internal_name}.class");
        let entries = read_lock!(self.entries);
        for entry in entries.iter() {
            match entry {
                ClasspathEntry::Dir(dir) => {
                    let candidate = dir.join(&rel_path);
                    if candidate.is_file() {
                        return Ok(std::fs::read(candidate)?);
                    }
                }
                ClasspathEntry::Jar(jar) => {
                    if let Some(bytes) = jar.read_entry(&rel_path)? {
                        return Ok(bytes);
                    }
                }
            }
        }
        Err(Error::ClassNotFound(internal_name.to_string()))
    }

    /// Whether any class has been resolved through this classpath yet.
    #[must_use]
    pub fn loads_begun(&self) -> bool {
        self.loads_begun.load(Ordering::SeqCst)
    }
}

impl Default for Classpath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_class_is_an_error() {
        let cp = Classpath::new();
        assert!(matches!(
            cp.read_class("does/not/Exist"),
            Err(Error::ClassNotFound(name)) if name == "does/not/Exist"
        ));
    }

    #[test]
    fn test_front_insertion_rejected_after_first_load() {
        let cp = Classpath::new();
        let _ = cp.read_class("any/Thing");
        assert!(matches!(
            cp.insert_dir_front(Path::new("/tmp/patched")),
            Err(Error::StartupOrder(_))
        ));
    }

    #[test]
    fn test_dir_resolution_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(first.path().join("a")).unwrap();
        std::fs::create_dir_all(second.path().join("a")).unwrap();
        std::fs::write(first.path().join("a/B.class"), b"first").unwrap();
        std::fs::write(second.path().join("a/B.class"), b"second").unwrap();

        let cp = Classpath::new();
        cp.push_dir(second.path());
        cp.insert_dir_front(first.path()).unwrap();

        assert_eq!(cp.read_class("a/B").unwrap(), b"first");
    }
}
