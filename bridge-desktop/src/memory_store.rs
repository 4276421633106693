//! In-process secret store for builds without keyring support.

use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Keeps secrets in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(BridgeError::InvalidInput("Secret key cannot be empty".to_string()));
        }
        self.secrets.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.secrets.lock().get(key).cloned())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        self.secrets.lock().remove(key);
        Ok(())
    }
}
