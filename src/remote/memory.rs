// ABOUTME: In-process object store with real revision semantics
// ABOUTME: Conditional writes, autorename on conflict and call counting for tests

use super::RemoteStore;
use crate::{Download, EntryKind, Error, RemoteEntry, Result, RevisionId, Uploaded, WriteMode};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

struct StoredFile {
    bytes: Vec<u8>,
    revision: RevisionId,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    next_rev: u64,
}

impl State {
    fn fresh_revision(&mut self) -> RevisionId {
        self.next_rev += 1;
        RevisionId::new(format!("{:012x}", self.next_rev))
    }

    fn store(&mut self, path: &str, bytes: Vec<u8>) -> Uploaded {
        let revision = self.fresh_revision();
        self.files.insert(
            path.to_string(),
            StoredFile {
                bytes,
                revision: revision.clone(),
            },
        );
        Uploaded {
            path: path.to_string(),
            revision,
        }
    }

    /// First free `"<stem> (<label>)<ext>"` sibling of `path`; numbered
    /// `"<stem> (<n>)<ext>"` when there is no label.
    fn free_name(&self, path: &str, label: Option<&str>) -> String {
        let (dir, file) = match path.rfind('/') {
            Some(idx) => path.split_at(idx + 1),
            None => ("", path),
        };
        let (stem, ext) = match file.rfind('.') {
            Some(idx) if idx > 0 => file.split_at(idx),
            _ => (file, ""),
        };

        let mut n = 1;
        loop {
            let suffix = match label {
                Some(label) if n == 1 => label.to_string(),
                Some(label) => format!("{} {}", label, n),
                None => n.to_string(),
            };
            let candidate = format!("{}{} ({}){}", dir, stem, suffix, ext);
            if !self.files.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    calls: AtomicUsize,
    unreachable: AtomicBool,
}

fn conflict(endpoint: &str, summary: &str) -> Error {
    Error::Api {
        endpoint: endpoint.into(),
        status: 409,
        message: summary.into(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, endpoint: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Api {
                endpoint: endpoint.into(),
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }

    /// Seeds a file and returns its revision.
    pub fn insert(&self, path: &str, content: &str) -> RevisionId {
        self.state().store(path, content.as_bytes().to_vec()).revision
    }

    /// Seeds a file at a chosen revision.
    pub fn insert_at(&self, path: &str, content: &str, revision: RevisionId) {
        self.state().files.insert(
            path.to_string(),
            StoredFile {
                bytes: content.as_bytes().to_vec(),
                revision,
            },
        );
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.state()
            .files
            .get(path)
            .map(|f| String::from_utf8_lossy(&f.bytes).into_owned())
    }

    pub fn revision(&self, path: &str) -> Option<RevisionId> {
        self.state().files.get(path).map(|f| f.revision.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    /// Number of remote operations attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent operation fail as a transport error would.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

impl RemoteStore for MemoryStore {
    fn download(&self, path: &str) -> Result<Download> {
        let endpoint = "/2/files/download";
        self.begin(endpoint)?;
        let state = self.state();
        let file = state
            .files
            .get(path)
            .ok_or_else(|| conflict(endpoint, "path/not_found/"))?;
        Ok(Download {
            revision: file.revision.clone(),
            bytes: file.bytes.clone(),
        })
    }

    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        mode: WriteMode,
        autorename: bool,
    ) -> Result<Uploaded> {
        let endpoint = "/2/files/upload";
        self.begin(endpoint)?;
        let mut state = self.state();
        let current = state.files.get(path).map(|f| f.revision.clone());

        let target = match (&mode, current) {
            (WriteMode::Overwrite, _) | (WriteMode::Add, None) => path.to_string(),
            (WriteMode::Update(expected), Some(actual)) if *expected == actual => path.to_string(),
            (WriteMode::Add, Some(_)) if autorename => state.free_name(path, None),
            (WriteMode::Update(_), _) if autorename => state.free_name(path, Some("conflicted copy")),
            _ => return Err(conflict(endpoint, "path/conflict/file/")),
        };

        Ok(state.store(&target, bytes))
    }

    fn get_metadata(&self, path: &str) -> Result<RevisionId> {
        let endpoint = "/2/files/get_metadata";
        self.begin(endpoint)?;
        self.state()
            .files
            .get(path)
            .map(|f| f.revision.clone())
            .ok_or_else(|| conflict(endpoint, "path/not_found/"))
    }

    fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.begin("/2/files/list_folder")?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let state = self.state();
        let mut entries: Vec<RemoteEntry> = Vec::new();

        for key in state.files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((folder, _)) => RemoteEntry {
                    name: folder.to_string(),
                    kind: EntryKind::Folder,
                },
                None => RemoteEntry {
                    name: rest.to_string(),
                    kind: EntryKind::File,
                },
            };
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_requires_matching_revision() {
        let store = MemoryStore::new();
        let rev = store.insert("/todo.txt", "a\n");

        let stale = RevisionId::new("stale");
        let err = store
            .upload("/todo.txt", b"b\n".to_vec(), WriteMode::Update(stale), false)
            .unwrap_err();
        assert!(err.is_conflict());

        let ok = store
            .upload("/todo.txt", b"b\n".to_vec(), WriteMode::Update(rev.clone()), false)
            .unwrap();
        assert_eq!(ok.path, "/todo.txt");
        assert_ne!(ok.revision, rev);
        assert_eq!(store.contents("/todo.txt").as_deref(), Some("b\n"));
    }

    #[test]
    fn test_update_conflict_autorenames() {
        let store = MemoryStore::new();
        store.insert("/todo/todo.txt", "a\n");

        let stale = RevisionId::new("stale");
        let first = store
            .upload("/todo/todo.txt", b"x".to_vec(), WriteMode::Update(stale.clone()), true)
            .unwrap();
        assert_eq!(first.path, "/todo/todo (conflicted copy).txt");

        let second = store
            .upload("/todo/todo.txt", b"y".to_vec(), WriteMode::Update(stale), true)
            .unwrap();
        assert_eq!(second.path, "/todo/todo (conflicted copy 2).txt");
        assert_eq!(store.contents("/todo/todo.txt").as_deref(), Some("a\n"));
    }

    #[test]
    fn test_add_never_overwrites() {
        let store = MemoryStore::new();
        store.insert("/todo.txt", "old");

        let renamed = store
            .upload("/todo.txt", b"new".to_vec(), WriteMode::Add, true)
            .unwrap();
        assert_eq!(renamed.path, "/todo (1).txt");

        let err = store
            .upload("/todo.txt", b"new".to_vec(), WriteMode::Add, false)
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.contents("/todo.txt").as_deref(), Some("old"));
    }

    #[test]
    fn test_list_folder_children() {
        let store = MemoryStore::new();
        store.insert("/todo.txt", "");
        store.insert("/archive/2024.txt", "");
        store.insert("/archive/2025.txt", "");
        store.insert("/notes.md", "");

        let root = store.list_folder("").unwrap();
        let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["archive", "notes.md", "todo.txt"]);
        assert_eq!(root[0].kind, EntryKind::Folder);

        let archive = store.list_folder("/archive").unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_unreachable_fails_and_counts() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let err = store.download("/todo.txt").unwrap_err();
        assert!(err.is_remote_io());
        assert_eq!(store.calls(), 1);
    }
}
