// Virtual File System (VFS)
// Where program images live before they are copied into machine memory.
// The host filesystem is only reached through `HostVfs`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use abi::{Memory, VmError};
use log::debug;
use thiserror::Error;

pub trait Vfs {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError>;
}

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Load(#[from] VmError),
}

impl VfsError {
    fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(path.to_string()),
            _ => VfsError::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }
}

/// Images held in a map; nothing touches the host.
#[derive(Debug, Default, Clone)]
pub struct MemoryVfs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Vfs for MemoryVfs {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// Host directory view. Paths are resolved under `root`.
#[derive(Debug, Clone)]
pub struct HostVfs {
    root: PathBuf,
}

impl HostVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path))
    }
}

impl Vfs for HostVfs {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        std::fs::read(self.resolve(path)).map_err(|e| VfsError::from_io(path, e))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VfsError::from_io(path, e))?;
        }
        std::fs::write(full, data).map_err(|e| VfsError::from_io(path, e))
    }
}

/// Reset `memory` and copy the image at `path` into it. Returns the image
/// length.
pub fn load_image<V: Vfs + ?Sized>(vfs: &V, path: &str, memory: &mut Memory) -> Result<usize, VfsError> {
    let image = vfs.read(path)?;
    memory.reset();
    memory.load(&image)?;
    debug!("loaded {} byte(s) from {path}", image.len());
    Ok(image.len())
}
