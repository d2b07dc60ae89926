// ABOUTME: Remote directory listing for the file picker
// ABOUTME: Folders always shown, files optionally limited to .txt

use crate::remote::RemoteClient;
use crate::util::has_txt_extension;
use crate::{api_path, EntryKind, FileEntry, RemoteEntry, Result};
use std::sync::Arc;

pub struct DirectoryLister {
    remote: Arc<RemoteClient>,
}

impl DirectoryLister {
    pub fn new(remote: Arc<RemoteClient>) -> Self {
        DirectoryLister { remote }
    }

    /// Lists `path` in the store's own order; no sorting is applied.
    pub fn list(&self, path: &str, text_only: bool) -> Result<Vec<FileEntry>> {
        let client = self.remote.client()?;
        let entries = client.list_folder(api_path(path))?;
        Ok(filter_entries(entries, text_only))
    }
}

pub fn filter_entries(entries: Vec<RemoteEntry>, text_only: bool) -> Vec<FileEntry> {
    entries
        .into_iter()
        .filter_map(|entry| match entry.kind {
            EntryKind::Folder => Some(FileEntry::folder(entry.name)),
            EntryKind::File if !text_only || has_txt_extension(&entry.name) => {
                Some(FileEntry::file(entry.name))
            }
            EntryKind::File => None,
        })
        .collect()
}
