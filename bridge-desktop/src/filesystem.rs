//! File System Access Implementation using `std::fs`

use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Blocking file system implementation
///
/// Thumbnail writes happen inside remote image callbacks, which run outside
/// any async executor, so plain `std::fs` is used.
#[derive(Debug, Clone)]
pub struct StdFileSystem {
    temp_root: PathBuf,
}

impl StdFileSystem {
    /// Create a file system accessor rooted at the platform cache directory
    pub fn new() -> Self {
        let temp_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("spotbridge");

        Self { temp_root }
    }

    /// Create a file system accessor with a custom temp root
    pub fn with_temp_root(temp_root: PathBuf) -> Self {
        Self { temp_root }
    }

    /// Root under which the thumbnail category directories live.
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl Default for StdFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemAccess for StdFileSystem {
    fn exists(&self, path: &Path) -> Result<bool> {
        path.try_exists().map_err(Self::map_io_error)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    fn delete_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => {
                debug!(path = ?path, "Deleted directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<usize> {
        let mut file = fs::File::create(path).map_err(Self::map_io_error)?;

        let mut written = 0;
        while written < data.len() {
            match file.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(path = ?path, written, error = %e, "Write stopped early");
                    break;
                }
            }
        }

        debug!(path = ?path, size = written, "Wrote file");
        Ok(written)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = ?path, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }
}
