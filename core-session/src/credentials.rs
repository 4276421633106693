//! Login Credentials
//!
//! Username and password are kept in the host's [`SecureStore`]. When either
//! is missing the user is asked for it through the [`Presenter`], and the
//! answer is stored for the next login.
//!
//! Passwords are never logged.

use crate::error::ConnectError;
use bridge_traits::{Presenter, SecureStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub const USERNAME_KEY: &str = "session.username";
pub const PASSWORD_KEY: &str = "session.password";

/// A resolved username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Stored credentials with interactive fallback.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    presenter: Arc<dyn Presenter>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            secure_store,
            presenter,
        }
    }

    /// Return the stored credentials, prompting for whatever is missing.
    pub fn resolve(&self) -> Result<Credentials, ConnectError> {
        let username = match self.stored(USERNAME_KEY)? {
            Some(username) => username,
            None => {
                let username = self
                    .prompt("Spotify username", false)
                    .ok_or_else(|| ConnectError::Credentials("No username entered".to_string()))?;
                self.secure_store
                    .set_secret(USERNAME_KEY, username.as_bytes())?;
                username
            }
        };

        let password = match self.stored(PASSWORD_KEY)? {
            Some(password) => password,
            None => {
                let prompt = format!("Spotify password for user {}", username);
                let password = self
                    .prompt(&prompt, true)
                    .ok_or_else(|| ConnectError::Credentials("No password entered".to_string()))?;
                self.secure_store
                    .set_secret(PASSWORD_KEY, password.as_bytes())?;
                password
            }
        };

        debug!(username = %username, "Resolved login credentials");
        Ok(Credentials { username, password })
    }

    /// Forget both username and password.
    pub fn clear(&self) -> Result<(), ConnectError> {
        self.secure_store.delete_secret(USERNAME_KEY)?;
        self.secure_store.delete_secret(PASSWORD_KEY)?;
        debug!("Cleared stored credentials");
        Ok(())
    }

    fn stored(&self, key: &str) -> Result<Option<String>, ConnectError> {
        let Some(bytes) = self.secure_store.get_secret(key)? else {
            return Ok(None);
        };

        match String::from_utf8(bytes) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) => Ok(None),
            Err(_) => {
                warn!(key = key, "Stored credential is not valid UTF-8, discarding");
                self.secure_store.delete_secret(key)?;
                Ok(None)
            }
        }
    }

    fn prompt(&self, prompt: &str, secret: bool) -> Option<String> {
        self.presenter
            .request_text(prompt, secret)
            .filter(|value| !value.is_empty())
    }
}
