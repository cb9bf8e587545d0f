//! The extract / patch / register pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::classfile::ClassFile;
use crate::classpath::{Classpath, JarArchive};
use crate::mapping::MappingTable;
use crate::patch::PatchUnit;
use crate::{Error, Result};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A scratch directory holding the extracted (and later patched) classfiles.
///
/// Removed best-effort on drop; the directory must outlive every classpath that
/// references it, so the pipeline hands out shared handles.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh process-unique scratch directory under the system temp
    /// root, or at `override_path` when given.
    fn create(override_path: Option<&Path>) -> Result<ScratchDir> {
        let path = match override_path {
            Some(path) => path.to_path_buf(),
            None => std::env::temp_dir().join(format!(
                "classgate-{}-{}",
                std::process::id(),
                SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
            )),
        };
        fs::create_dir_all(&path).map_err(|source| Error::Extraction {
            path: path.display().to_string(),
            source,
        })?;
        Ok(ScratchDir { path })
    }

    /// Filesystem location of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        // Best effort; leaking a temp directory is not worth failing shutdown over
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Observable pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has happened yet; units may still be registered
    Unpatched,
    /// The jar is unpacked into the scratch directory
    Extracted,
    /// Every unit has been applied to the scratch copies
    Patched,
    /// The scratch directory is on the class search path
    Registered,
    /// A phase failed; the pipeline cannot make further progress
    Failed,
}

/// Rewrites target classfiles between jar extraction and first class load.
///
/// Phases run strictly forward: `extract` → `patch` → `register`. Taking a
/// phase out of order, repeating one, or continuing after a failure is
/// [`Error::StartupOrder`] - the pipeline exists precisely because patches
/// applied after a class has been loaded can never take effect, so sequencing
/// mistakes must be loud.
pub struct BytecodePatchPipeline {
    jar: PathBuf,
    mappings: Arc<MappingTable>,
    scratch_override: Option<PathBuf>,
    units: Vec<PatchUnit>,
    scratch: Option<Arc<ScratchDir>>,
    state: PipelineState,
}

impl BytecodePatchPipeline {
    /// A pipeline over the given target jar.
    #[must_use]
    pub fn new(jar: impl Into<PathBuf>, mappings: Arc<MappingTable>) -> Self {
        BytecodePatchPipeline {
            jar: jar.into(),
            mappings,
            scratch_override: None,
            units: Vec::new(),
            scratch: None,
            state: PipelineState::Unpatched,
        }
    }

    /// Use a fixed scratch directory instead of a generated temp location.
    #[must_use]
    pub fn with_scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_override = Some(path.into());
        self
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The scratch directory, once extraction has happened.
    #[must_use]
    pub fn scratch(&self) -> Option<&Arc<ScratchDir>> {
        self.scratch.as_ref()
    }

    /// Register a patch unit. Only possible before extraction.
    pub fn add_unit(&mut self, unit: PatchUnit) -> Result<()> {
        if self.state != PipelineState::Unpatched {
            return Err(Error::StartupOrder(
                "Patch units must be registered before extraction".to_string(),
            ));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Unpack every entry of the target jar into a fresh scratch directory,
    /// preserving the archive's directory structure.
    ///
    /// # Errors
    /// [`Error::StartupOrder`] out of phase; [`Error::Extraction`] on any I/O
    /// failure, after which the pipeline is poisoned ([`PipelineState::Failed`]).
    pub fn extract(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Unpatched, "extract")?;
        match self.extract_inner() {
            Ok(scratch) => {
                self.scratch = Some(Arc::new(scratch));
                self.state = PipelineState::Extracted;
                Ok(())
            }
            Err(err) => {
                self.state = PipelineState::Failed;
                Err(err)
            }
        }
    }

    fn extract_inner(&self) -> Result<ScratchDir> {
        let scratch = ScratchDir::create(self.scratch_override.as_deref())?;
        let archive = JarArchive::open(&self.jar)?;

        for entry_name in archive.entry_names() {
            let Some(dest) = sanitize_entry_path(scratch.path(), &entry_name) else {
                return Err(Error::Extraction {
                    path: entry_name,
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "archive entry escapes the extraction root",
                    ),
                });
            };
            let io_context = |source| Error::Extraction {
                path: entry_name.clone(),
                source,
            };

            if entry_name.ends_with('/') {
                fs::create_dir_all(&dest).map_err(io_context)?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(io_context)?;
            }
            let Some(bytes) = archive.read_entry(&entry_name)? else {
                continue;
            };
            fs::write(&dest, bytes).map_err(io_context)?;
        }
        Ok(scratch)
    }

    /// Apply every registered unit, in registration order, to the scratch
    /// copies of their target classes.
    ///
    /// # Errors
    /// [`Error::StartupOrder`] out of phase; [`Error::PatchTargetNotFound`] when
    /// a unit's class or member does not exist in the extracted jar. Any failure
    /// poisons the pipeline.
    pub fn patch(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Extracted, "patch")?;
        match self.patch_inner() {
            Ok(()) => {
                self.state = PipelineState::Patched;
                Ok(())
            }
            Err(err) => {
                self.state = PipelineState::Failed;
                Err(err)
            }
        }
    }

    fn patch_inner(&self) -> Result<()> {
        let Some(scratch) = self.scratch.as_ref() else {
            return Err(Error::StartupOrder(
                "Patch attempted with no extracted scratch directory".to_string(),
            ));
        };

        for unit in &self.units {
            let internal_name = unit.target().internal_name(&self.mappings)?;
            let class_path = scratch.path().join(format!("{internal_name}.class"));
            if !class_path.is_file() {
                return Err(Error::PatchTargetNotFound {
                    class: unit.target().display_name().to_string(),
                    member: "<classfile>".to_string(),
                });
            }

            let bytes = fs::read(&class_path)?;
            let mut classfile = ClassFile::parse(&bytes)?;
            unit.apply(&mut classfile, &self.mappings)?;
            fs::write(&class_path, classfile.to_bytes())?;
        }
        Ok(())
    }

    /// Put the scratch directory at the front of the class search path.
    ///
    /// # Errors
    /// [`Error::StartupOrder`] out of phase, or when any class has already been
    /// resolved through `classpath` - a patched class that is already loaded in
    /// its pristine form can never be swapped, so late registration is fatal.
    pub fn register(&mut self, classpath: &Classpath) -> Result<()> {
        self.expect_state(PipelineState::Patched, "register")?;
        let Some(scratch) = self.scratch.as_ref() else {
            return Err(Error::StartupOrder(
                "Register attempted with no scratch directory".to_string(),
            ));
        };
        classpath.insert_dir_front(scratch.path())?;
        self.state = PipelineState::Registered;
        Ok(())
    }

    fn expect_state(&self, expected: PipelineState, phase: &str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(Error::StartupOrder(format!(
            "Cannot {phase} while the pipeline is in the {:?} phase",
            self.state
        )))
    }
}

/// Resolve an archive entry name inside the extraction root, rejecting
/// absolute paths and parent-directory traversal.
fn sanitize_entry_path(root: &Path, entry_name: &str) -> Option<PathBuf> {
    use std::path::Component;

    let relative = Path::new(entry_name);
    let mut dest = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_entry_path_sanitization() {
        let root = Path::new("/scratch");
        assert_eq!(
            sanitize_entry_path(root, "com/example/Foo.class"),
            Some(PathBuf::from("/scratch/com/example/Foo.class"))
        );
        assert!(sanitize_entry_path(root, "../escape.class").is_none());
        assert!(sanitize_entry_path(root, "/absolute.class").is_none());
    }
}
