// ABOUTME: Core sync operations against the remote store
// ABOUTME: Load, conditional save, archive append and raw cache reads/writes

use crate::conflict::{ConflictResolver, Renamed};
use crate::connectivity::ConnectivityProbe;
use crate::listing::DirectoryLister;
use crate::queue::BackgroundQueue;
use crate::remote::RemoteClient;
use crate::util::{split_lines, terminate_lines};
use crate::{Error, FileEntry, RemoteContents, Result, RevisionId, WriteMode};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// New baseline for the next save.
    pub revision: RevisionId,
    /// Where the content was actually stored.
    pub path: String,
    /// Set when `path` differs from the requested path.
    pub renamed: Option<Renamed>,
}

pub struct SyncEngine {
    remote: Arc<RemoteClient>,
    connectivity: Arc<dyn ConnectivityProbe>,
    lister: DirectoryLister,
    resolver: ConflictResolver,
    // Held for the whole of a save, so saves never overlap.
    baseline: Mutex<Option<RevisionId>>,
    writes: BackgroundQueue,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<RemoteClient>,
        connectivity: Arc<dyn ConnectivityProbe>,
        baseline: Option<RevisionId>,
    ) -> Result<Self> {
        Ok(SyncEngine {
            lister: DirectoryLister::new(Arc::clone(&remote)),
            remote,
            connectivity,
            resolver: ConflictResolver,
            baseline: Mutex::new(baseline),
            writes: BackgroundQueue::new("tasksync-writer")?,
        })
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Revision the next save will use as its precondition.
    pub fn baseline(&self) -> Option<RevisionId> {
        self.baseline
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Records the revision of freshly loaded content as the new baseline.
    pub fn adopt_baseline(&self, revision: RevisionId) {
        *self.baseline.lock().unwrap_or_else(|e| e.into_inner()) = Some(revision);
    }

    pub fn load_file(&self, path: &str) -> Result<RemoteContents> {
        info!("Loading file from remote: {}", path);
        let client = self.remote.client()?;
        let download = client.download(path)?;
        info!("The file's rev is: {}", download.revision);

        Ok(RemoteContents {
            revision: download.revision,
            lines: split_lines(&String::from_utf8_lossy(&download.bytes)),
        })
    }

    /// Writes `lines` conditionally on the current baseline, or creates the
    /// file when no baseline is known. A conflict the store resolved by
    /// renaming is reported in [`SaveOutcome::renamed`].
    pub fn save_file(&self, path: &str, lines: &[String], eol: &str) -> Result<SaveOutcome> {
        let mut baseline = self.baseline.lock().unwrap_or_else(|e| e.into_inner());
        info!("Saving {} lines to {}", lines.len(), path);

        debug!("save {}: authenticating", path);
        let client = self.remote.client()?;

        let mode = match baseline.as_ref() {
            Some(rev) => WriteMode::Update(rev.clone()),
            None => WriteMode::Add,
        };
        let bytes = terminate_lines(lines, eol).into_bytes();

        debug!("save {}: transferring ({:?})", path, mode);
        let uploaded = client.upload(path, bytes, mode, true)?;
        debug!("save {}: committed rev {}", path, uploaded.revision);
        *baseline = Some(uploaded.revision.clone());

        let renamed = self.resolver.resolve(path, &uploaded.path);
        if renamed.is_some() {
            debug!("save {}: renamed to {}", path, uploaded.path);
        }
        debug!("save {}: done", path);

        Ok(SaveOutcome {
            revision: uploaded.revision,
            path: uploaded.path,
            renamed,
        })
    }

    /// Read-modify-write append. Refused up front while offline; a lost
    /// race on the revision precondition fails the whole call.
    pub fn append_to_archive(&self, path: &str, lines: &[String], eol: &str) -> Result<()> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }

        debug!("append {}: authenticating", path);
        let client = self.remote.client()?;

        debug!("append {}: transferring", path);
        let (mut contents, mode) = match client.download(path) {
            Ok(download) => {
                info!("The file's rev is: {}", download.revision);
                (
                    split_lines(&String::from_utf8_lossy(&download.bytes)),
                    WriteMode::Update(download.revision),
                )
            }
            Err(e) if e.is_not_found() => {
                info!("Archive {} does not exist yet, creating it", path);
                (Vec::new(), WriteMode::Add)
            }
            Err(e) => return Err(e),
        };

        contents.extend(lines.iter().cloned());
        let bytes = terminate_lines(&contents, eol).into_bytes();
        let uploaded = client.upload(path, bytes, mode, false)?;
        info!(
            "Appended {} lines to {} (rev {})",
            lines.len(),
            path,
            uploaded.revision
        );
        Ok(())
    }

    /// Queues an unconditional overwrite. Logged out, this is a no-op.
    pub fn write_raw(&self, path: &str, content: &str) {
        if !self.remote.is_authenticated() {
            warn!("Not authenticated, file {} not written", path);
            return;
        }

        let remote = Arc::clone(&self.remote);
        let target = path.to_string();
        let bytes = content.as_bytes().to_vec();
        self.writes.push(format!("Write to file {}", path), move || {
            let result = remote
                .client()
                .and_then(|client| client.upload(&target, bytes, WriteMode::Overwrite, false));
            match result {
                Ok(uploaded) => debug!("Wrote {} (rev {})", target, uploaded.revision),
                Err(e) => warn!("Failed to write {}: {}", target, e),
            }
        });
    }

    /// Waits for queued [`SyncEngine::write_raw`] calls to finish.
    pub fn flush(&self) {
        self.writes.flush();
    }

    /// Full text with lines joined by `\n`, or `None` when logged out.
    pub fn read_raw(&self, path: &str) -> Result<Option<String>> {
        if !self.remote.is_authenticated() {
            return Ok(None);
        }

        let client = self.remote.client()?;
        let download = client.download(path)?;
        info!("The file's rev is: {}", download.revision);

        let lines = split_lines(&String::from_utf8_lossy(&download.bytes));
        Ok(Some(lines.join("\n")))
    }

    pub fn remote_revision(&self, path: &str) -> Result<RevisionId> {
        let client = self.remote.client()?;
        client.get_metadata(path)
    }

    pub fn list_files(&self, path: &str, text_only: bool) -> Result<Vec<FileEntry>> {
        self.lister.list(path, text_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::StaticProbe;
    use crate::credentials::MemoryCredentialStore;
    use crate::remote::{MemoryStore, RemoteStore};
    use crate::Credential;

    fn engine(store: &Arc<MemoryStore>, token: Option<&str>, online: bool) -> SyncEngine {
        let handle = Arc::clone(store);
        let remote = RemoteClient::new(
            Arc::new(MemoryCredentialStore::new(token.map(Credential::new))),
            move |_: &Credential| -> Result<Arc<dyn RemoteStore>> { Ok(handle.clone()) },
        );
        SyncEngine::new(Arc::new(remote), Arc::new(StaticProbe::new(online)), None).unwrap()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_save_without_baseline_creates_file() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, Some("t"), true);

        let outcome = engine.save_file("/todo.txt", &lines(&["a"]), "\n").unwrap();
        assert_eq!(outcome.path, "/todo.txt");
        assert!(outcome.renamed.is_none());
        assert_eq!(engine.baseline(), Some(outcome.revision));
        assert_eq!(store.contents("/todo.txt").as_deref(), Some("a\n"));
    }

    #[test]
    fn test_successive_saves_advance_baseline() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, Some("t"), true);

        let first = engine.save_file("/todo.txt", &lines(&["a"]), "\n").unwrap();
        let second = engine.save_file("/todo.txt", &lines(&["a", "b"]), "\n").unwrap();
        assert_ne!(first.revision, second.revision);
        assert!(second.renamed.is_none());
        assert_eq!(store.revision("/todo.txt"), Some(second.revision));
    }

    #[test]
    fn test_load_adopt_then_save() {
        let store = Arc::new(MemoryStore::new());
        store.insert("/todo.txt", "one\r\ntwo\r\n");
        let engine = engine(&store, Some("t"), true);

        let loaded = engine.load_file("/todo.txt").unwrap();
        assert_eq!(loaded.lines, lines(&["one", "two"]));
        assert_eq!(engine.baseline(), None);

        engine.adopt_baseline(loaded.revision);
        let outcome = engine
            .save_file("/todo.txt", &lines(&["one", "two", "three"]), "\r\n")
            .unwrap();
        assert!(outcome.renamed.is_none());
        assert_eq!(
            store.contents("/todo.txt").as_deref(),
            Some("one\r\ntwo\r\nthree\r\n")
        );
    }

    #[test]
    fn test_save_unauthenticated_keeps_baseline() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, None, true);
        engine.adopt_baseline(RevisionId::new("rev1"));

        let err = engine.save_file("/todo.txt", &lines(&["a"]), "\n").unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert_eq!(engine.baseline(), Some(RevisionId::new("rev1")));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_append_creates_missing_archive() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, Some("t"), true);

        engine
            .append_to_archive("/done.txt", &lines(&["x done"]), "\n")
            .unwrap();
        assert_eq!(store.contents("/done.txt").as_deref(), Some("x done\n"));
    }

    #[test]
    fn test_read_raw_joins_with_lf() {
        let store = Arc::new(MemoryStore::new());
        store.insert("/cache.txt", "a\r\nb\r\n");
        let engine = engine(&store, Some("t"), true);

        assert_eq!(engine.read_raw("/cache.txt").unwrap().as_deref(), Some("a\nb"));
    }

    #[test]
    fn test_remote_revision() {
        let store = Arc::new(MemoryStore::new());
        let rev = store.insert("/todo.txt", "a\n");
        let engine = engine(&store, Some("t"), true);

        assert_eq!(engine.remote_revision("/todo.txt").unwrap(), rev);
        assert!(engine.remote_revision("/missing.txt").unwrap_err().is_not_found());
    }
}
