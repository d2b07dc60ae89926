// ABOUTME: Remote object-store contract and the credential-keyed handle cache
// ABOUTME: Builds a store handle once per credential and rebuilds it after login/logout

pub mod dropbox;
pub mod memory;

use crate::credentials::CredentialStore;
use crate::{Credential, Download, Error, RemoteEntry, Result, RevisionId, Uploaded, WriteMode};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub use dropbox::{DropboxClient, DropboxConnector};
pub use memory::MemoryStore;

/// Operations the sync core needs from the backing store.
pub trait RemoteStore: Send + Sync {
    fn download(&self, path: &str) -> Result<Download>;

    /// Returns the path the content was stored under, which differs from
    /// `path` when `autorename` resolved a conflict.
    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        mode: WriteMode,
        autorename: bool,
    ) -> Result<Uploaded>;

    fn get_metadata(&self, path: &str) -> Result<RevisionId>;

    /// `""` lists the top-level directory.
    fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>>;
}

/// Builds a store handle for a credential.
pub trait Connector: Send + Sync {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>>;
}

impl<F> Connector for F
where
    F: Fn(&Credential) -> Result<Arc<dyn RemoteStore>> + Send + Sync,
{
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>> {
        self(credential)
    }
}

struct CachedHandle {
    credential: Credential,
    store: Arc<dyn RemoteStore>,
}

pub struct RemoteClient {
    credentials: Arc<dyn CredentialStore>,
    connector: Box<dyn Connector>,
    cached: Mutex<Option<CachedHandle>>,
    stale: AtomicBool,
}

impl RemoteClient {
    pub fn new(credentials: Arc<dyn CredentialStore>, connector: impl Connector + 'static) -> Self {
        RemoteClient {
            credentials,
            connector: Box::new(connector),
            cached: Mutex::new(None),
            stale: AtomicBool::new(false),
        }
    }

    /// Reuses the cached handle unless it was invalidated or built for a
    /// different credential. Fails without network access when logged out.
    pub fn client(&self) -> Result<Arc<dyn RemoteStore>> {
        let credential = self.credentials.get().ok_or(Error::NotAuthenticated)?;
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        let stale = self.stale.load(Ordering::SeqCst);

        if let Some(handle) = cached.as_ref() {
            if !stale && handle.credential == credential {
                return Ok(Arc::clone(&handle.store));
            }
        }

        debug!("Building remote client");
        let store = self.connector.connect(&credential)?;
        *cached = Some(CachedHandle {
            credential,
            store: Arc::clone(&store),
        });
        // Only a successful rebuild clears the flag.
        self.stale.store(false, Ordering::SeqCst);
        Ok(store)
    }

    pub fn invalidate(&self) {
        // Taken so a rebuild in progress cannot clear a newer invalidation.
        let _cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn login(&self, credential: Credential) {
        self.credentials.set(Some(credential));
        self.invalidate();
    }

    pub fn logout(&self) {
        self.credentials.set(None);
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use std::sync::atomic::AtomicUsize;

    fn counting_client(
        credential: Option<Credential>,
    ) -> (RemoteClient, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let connector = move |_: &Credential| -> Result<Arc<dyn RemoteStore>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryStore::new()))
        };
        let store = Arc::new(MemoryCredentialStore::new(credential));
        (RemoteClient::new(store, connector), builds)
    }

    #[test]
    fn test_client_requires_credential() {
        let (remote, builds) = counting_client(None);
        assert!(matches!(remote.client(), Err(Error::NotAuthenticated)));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_client_is_cached() {
        let (remote, builds) = counting_client(Some(Credential::new("a")));
        remote.client().unwrap();
        remote.client().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_login_rebuilds_handle() {
        let (remote, builds) = counting_client(Some(Credential::new("a")));
        remote.client().unwrap();

        remote.login(Credential::new("b"));
        remote.client().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        remote.invalidate();
        remote.client().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failed_rebuild_keeps_invalidation() {
        let builds = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicBool::new(false));
        let (counter, fail) = (Arc::clone(&builds), Arc::clone(&failing));
        let connector = move |_: &Credential| -> Result<Arc<dyn RemoteStore>> {
            if fail.load(Ordering::SeqCst) {
                return Err(Error::Config("connector unavailable".into()));
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryStore::new()))
        };
        let store = Arc::new(MemoryCredentialStore::new(Some(Credential::new("a"))));
        let remote = RemoteClient::new(store, connector);

        remote.client().unwrap();
        remote.invalidate();

        failing.store(true, Ordering::SeqCst);
        assert!(remote.client().is_err());

        failing.store(false, Ordering::SeqCst);
        remote.client().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        remote.client().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_logout_blocks_client() {
        let (remote, _) = counting_client(Some(Credential::new("a")));
        assert!(remote.is_authenticated());
        remote.logout();
        assert!(!remote.is_authenticated());
        assert!(matches!(remote.client(), Err(Error::NotAuthenticated)));
    }
}
