// ABOUTME: Credential persistence and token discovery
// ABOUTME: CLI flag → TASKSYNC_TOKEN env var → stored credential

use crate::storage::write_atomic;
use crate::{Credential, Error, Result};
use log::warn;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub const TOKEN_ENV: &str = "TASKSYNC_TOKEN";

/// Holds at most one access credential. Absence means "not authenticated".
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;

    /// `None` clears the stored value (logout).
    fn set(&self, credential: Option<Credential>);

    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Option<Credential>) -> Self {
        MemoryCredentialStore {
            credential: Mutex::new(credential),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.credential
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set(&self, credential: Option<Credential>) {
        *self.credential.lock().unwrap_or_else(|e| e.into_inner()) = credential;
    }
}

/// Token kept in a 0600 file inside the config directory.
pub struct FileCredentialStore {
    path: PathBuf,
    tmp_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf, tmp_dir: PathBuf) -> Self {
        FileCredentialStore { path, tmp_dir }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        let content = fs::read_to_string(&self.path).ok()?;
        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(Credential::new(token))
        }
    }

    fn set(&self, credential: Option<Credential>) {
        let result = match credential {
            Some(cred) => write_atomic(&self.path, cred.token().as_bytes(), &self.tmp_dir),
            None if self.path.exists() => fs::remove_file(&self.path).map_err(Error::from),
            None => Ok(()),
        };
        if let Err(e) = result {
            warn!("Failed to update credential at {}: {}", self.path.display(), e);
        }
    }
}

/// Token kept in the platform keychain.
#[cfg(feature = "keyring")]
pub struct KeyringCredentialStore {
    service: String,
    user: String,
}

#[cfg(feature = "keyring")]
impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        KeyringCredentialStore {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Option<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user)
            .map_err(|e| warn!("Failed to access keychain: {}", e))
            .ok()
    }
}

#[cfg(feature = "keyring")]
impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.entry()?.get_password().ok().map(Credential::new)
    }

    fn set(&self, credential: Option<Credential>) {
        let Some(entry) = self.entry() else {
            return;
        };
        let result = match credential {
            Some(cred) => entry.set_password(cred.token()),
            None => match entry.delete_password() {
                Err(keyring::Error::NoEntry) => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            warn!("Failed to update credential in keychain: {}", e);
        }
    }
}

pub fn resolve_token(cli_token: Option<String>, store: &dyn CredentialStore) -> Result<Credential> {
    // 1. CLI flag
    if let Some(token) = cli_token {
        return Ok(Credential::new(token));
    }

    // 2. Environment variable
    if let Ok(token) = env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(Credential::new(token.trim()));
        }
    }

    // 3. Stored credential
    store.get().ok_or_else(|| {
        Error::Auth(format!(
            "No access token found. Run `tasksync login <TOKEN>`, pass --token, or set {}",
            TOKEN_ENV
        ))
    })
}
