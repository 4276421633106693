//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for the thumbnail cache file I/O and for
//! secure credential storage.
//!
//! Both traits are synchronous: they are called from remote-service callbacks
//! that run outside any async executor, so implementations must stay fast and
//! must not block on network I/O.

use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// File system access trait
///
/// Abstracts the small set of file operations the thumbnail cache needs:
/// - Desktop: direct filesystem access
/// - Sandboxed hosts: app-private cache directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// fn cache_thumb(fs: &dyn FileSystemAccess, path: &Path, data: &[u8]) -> Result<()> {
///     let written = fs.write_file(path, data)?;
///     if written != data.len() {
///         fs.delete_file(path)?;
///     }
///     Ok(())
/// }
/// ```
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Create or truncate `path` and write `data` into it.
    ///
    /// Returns the number of bytes actually written. A value smaller than
    /// `data.len()` is a short write; the caller decides what to do with the
    /// partial file.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<usize>;

    /// Delete a file
    fn delete_file(&self, path: &Path) -> Result<()>;

    /// Remove a directory with everything in it and recreate it empty.
    fn wipe_dir(&self, path: &Path) -> Result<()> {
        if self.exists(path)? {
            self.delete_dir_all(path)?;
        }
        self.create_dir_all(path)
    }
}

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Windows: DPAPI
/// - Linux: Secret Service / libsecret
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Encrypt data at rest
/// - Use platform-provided secure storage when available
/// - Never log or expose sensitive data
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value.
    fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::MemoryFs;

    // Minimal in-memory filesystem to exercise the provided `wipe_dir`.
    mod memory {
        use super::*;
        use std::collections::BTreeSet;
        use std::path::PathBuf;
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct MemoryFs {
            pub dirs: Mutex<BTreeSet<PathBuf>>,
            pub deleted: Mutex<Vec<PathBuf>>,
        }

        impl FileSystemAccess for MemoryFs {
            fn exists(&self, path: &Path) -> Result<bool> {
                Ok(self.dirs.lock().unwrap().contains(path))
            }

            fn create_dir_all(&self, path: &Path) -> Result<()> {
                self.dirs.lock().unwrap().insert(path.to_path_buf());
                Ok(())
            }

            fn delete_dir_all(&self, path: &Path) -> Result<()> {
                self.dirs.lock().unwrap().remove(path);
                self.deleted.lock().unwrap().push(path.to_path_buf());
                Ok(())
            }

            fn read_file(&self, _path: &Path) -> Result<Bytes> {
                Ok(Bytes::new())
            }

            fn write_file(&self, _path: &Path, data: &[u8]) -> Result<usize> {
                Ok(data.len())
            }

            fn delete_file(&self, _path: &Path) -> Result<()> {
                Ok(())
            }
        }
    }

    #[test]
    fn test_wipe_dir_recreates_existing_directory() {
        let fs = MemoryFs::default();
        let dir = Path::new("/tmp/spotify/thumbs");
        fs.create_dir_all(dir).unwrap();

        fs.wipe_dir(dir).unwrap();

        assert!(fs.exists(dir).unwrap());
        assert_eq!(fs.deleted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_wipe_dir_creates_missing_directory() {
        let fs = MemoryFs::default();
        let dir = Path::new("/tmp/spotify/playlistthumbs");

        fs.wipe_dir(dir).unwrap();

        assert!(fs.exists(dir).unwrap());
        assert!(fs.deleted.lock().unwrap().is_empty());
    }
}
