//! Secure Storage Module
//!
//! Durable key/value storage for the client, one file per key. Values are
//! protected with DPAPI on Windows.

use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info};

/// Key the session token is persisted under
pub const TOKEN_KEY: &str = "token";

/// Root directory for everything the client writes to disk
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("CarRental")
}

/// Secure storage backed by the local app data directory.
///
/// The token is also kept in memory so the request path never touches the
/// disk; the copy follows every write and delete made through this handle.
#[derive(Debug)]
pub struct SecureStorage {
    storage_path: PathBuf,
    token: Mutex<Option<String>>,
}

impl SecureStorage {
    /// Create storage in the default app data directory
    pub fn new() -> Self {
        Self::with_dir(app_data_dir())
    }

    /// Create storage rooted at `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let storage_path = dir.into();

        // Ensure directory exists
        if let Err(e) = std::fs::create_dir_all(&storage_path) {
            error!("Failed to create storage directory: {}", e);
        }

        let storage = Self {
            storage_path,
            token: Mutex::new(None),
        };

        // Read the token once, up front
        storage.cache_token(storage.read_token());

        debug!("Secure storage initialized at: {:?}", storage.storage_path);
        storage
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Save a value under `key`
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec(data)?;
        let sealed = seal(&json)?;

        std::fs::write(self.file_for(key), sealed)?;
        info!("Saved data for key: {}", key);

        // Refresh the in-memory token from what actually landed on disk
        if key == TOKEN_KEY {
            self.cache_token(self.read_token());
        }
        Ok(())
    }

    /// Load the value under `key`, `None` when nothing was stored
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let sealed = match std::fs::read(self.file_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let json = unseal(&sealed)?;
        Ok(Some(serde_json::from_slice(&json)?))
    }

    /// Delete the value under `key`, a missing key is not an error
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.file_for(key)) {
            Ok(()) => info!("Deleted stored data for key: {}", key),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if key == TOKEN_KEY {
            self.cache_token(None);
        }
        Ok(())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.file_for(key).exists()
    }

    /// The persisted session token, if any, from memory
    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.save(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.delete(TOKEN_KEY)
    }

    /// Token as stored on disk; unreadable or corrupt entries read as absent
    fn read_token(&self) -> Option<String> {
        match self.load::<String>(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                error!("Failed to read stored token: {}", e);
                None
            }
        }
    }

    fn cache_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.dat", key))
    }
}

impl Default for SecureStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
fn seal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    dpapi::transform(data, dpapi::Direction::Protect)
        .ok_or_else(|| StorageError::Encryption("DPAPI encryption failed".into()))
}

#[cfg(windows)]
fn unseal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    dpapi::transform(data, dpapi::Direction::Unprotect)
        .ok_or_else(|| StorageError::Decryption("DPAPI decryption failed".into()))
}

// Plain files off Windows, development only
#[cfg(not(windows))]
fn seal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    Ok(data.to_vec())
}

#[cfg(not(windows))]
fn unseal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    Ok(data.to_vec())
}

#[cfg(windows)]
mod dpapi {
    use windows::Win32::Foundation::{LocalFree, HLOCAL};
    use windows::Win32::Security::Cryptography::{
        CryptProtectData, CryptUnprotectData, CRYPTPROTECT_UI_FORBIDDEN, CRYPT_INTEGER_BLOB,
    };

    #[derive(Clone, Copy)]
    pub(super) enum Direction {
        Protect,
        Unprotect,
    }

    /// Run `data` through DPAPI for the current user.
    pub(super) fn transform(data: &[u8], direction: Direction) -> Option<Vec<u8>> {
        let input = CRYPT_INTEGER_BLOB {
            cbData: u32::try_from(data.len()).ok()?,
            pbData: data.as_ptr().cast_mut(),
        };
        let mut output = CRYPT_INTEGER_BLOB::default();

        // SAFETY: `input` borrows `data` for the duration of the call; the
        // output buffer is allocated by DPAPI and released with LocalFree
        // once copied.
        unsafe {
            let result = match direction {
                Direction::Protect => CryptProtectData(
                    &input,
                    None,
                    None,
                    None,
                    None,
                    CRYPTPROTECT_UI_FORBIDDEN,
                    &mut output,
                ),
                Direction::Unprotect => CryptUnprotectData(
                    &input,
                    None,
                    None,
                    None,
                    None,
                    CRYPTPROTECT_UI_FORBIDDEN,
                    &mut output,
                ),
            };
            result.ok()?;

            let bytes =
                std::slice::from_raw_parts(output.pbData, output.cbData as usize).to_vec();
            let _ = LocalFree(HLOCAL(output.pbData.cast()));
            Some(bytes)
        }
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, SecureStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::with_dir(dir.path());
        (dir, storage)
    }

    #[test]
    fn token_round_trips_under_the_token_key() {
        let (_dir, storage) = storage();
        assert_eq!(storage.token(), None);

        storage.save_token("abc.def.ghi").unwrap();
        assert!(storage.exists(TOKEN_KEY));
        assert!(storage.path().join("token.dat").exists());
        assert_eq!(storage.token().as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn clearing_a_missing_token_is_fine() {
        let (_dir, storage) = storage();
        storage.clear_token().unwrap();

        storage.save_token("t").unwrap();
        storage.clear_token().unwrap();
        assert!(!storage.exists(TOKEN_KEY));
        assert_eq!(storage.token(), None);
    }

    #[test]
    fn corrupt_token_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token.dat"), b"not json").unwrap();

        let storage = SecureStorage::with_dir(dir.path());
        assert!(matches!(
            storage.load::<String>(TOKEN_KEY),
            Err(StorageError::Serialization(_))
        ));
        assert_eq!(storage.token(), None);
    }

    #[test]
    fn token_is_served_from_memory() {
        let (dir, storage) = storage();
        storage.save_token("cached").unwrap();

        // Gone from disk, still served from memory
        std::fs::remove_file(dir.path().join("token.dat")).unwrap();
        assert_eq!(storage.token().as_deref(), Some("cached"));

        // A fresh handle only sees the disk
        assert_eq!(SecureStorage::with_dir(dir.path()).token(), None);

        storage.save_token("again").unwrap();
        let reopened = SecureStorage::with_dir(dir.path());
        assert_eq!(reopened.token().as_deref(), Some("again"));
    }

    #[test]
    fn generic_writes_to_the_token_key_refresh_the_cache() {
        let (_dir, storage) = storage();
        storage.save(TOKEN_KEY, "via-save").unwrap();
        assert_eq!(storage.token().as_deref(), Some("via-save"));

        storage.delete(TOKEN_KEY).unwrap();
        assert_eq!(storage.token(), None);
    }

    #[test]
    fn stores_structured_values() {
        let (_dir, storage) = storage();
        storage.save("recent", &vec!["2025-01-01", "2025-01-04"]).unwrap();

        let loaded: Option<Vec<String>> = storage.load("recent").unwrap();
        assert_eq!(loaded, Some(vec!["2025-01-01".into(), "2025-01-04".into()]));
    }
}
