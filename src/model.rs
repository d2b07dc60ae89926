// ABOUTME: Data models shared by the sync engine and the remote API
// ABOUTME: Revision tags, remote contents, listing entries and Dropbox wire types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distinguished path for the top-level directory of the store.
pub const ROOT_DIR: &str = "/";

/// Translates [`ROOT_DIR`] to the empty path the remote API expects for its root.
pub fn api_path(path: &str) -> &str {
    if path == ROOT_DIR {
        ""
    } else {
        path
    }
}

/// Opaque access token. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Server-side revision tag. The client only ever hands it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(rev: impl Into<String>) -> Self {
        RevisionId(rev.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of reading a remote text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContents {
    pub revision: RevisionId,
    pub lines: Vec<String>,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_folder: bool,
}

impl FileEntry {
    pub fn file(name: impl Into<String>) -> Self {
        FileEntry {
            name: name.into(),
            is_folder: false,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        FileEntry {
            name: name.into(),
            is_folder: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// How an upload treats an existing remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file; never replace an existing one.
    Add,
    /// Replace whatever is there.
    Overwrite,
    /// Replace only if the remote file is still at this revision.
    Update(RevisionId),
}

/// Bytes and revision tag returned by a download.
#[derive(Debug, Clone)]
pub struct Download {
    pub revision: RevisionId,
    pub bytes: Vec<u8>,
}

/// Where an upload actually landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub path: String,
    pub revision: RevisionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// File metadata as returned by Dropbox upload, download and get_metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
    pub rev: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Tagged listing entry from `list_folder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum ListEntry {
    File {
        name: String,
        #[serde(default)]
        rev: Option<String>,
    },
    Folder {
        name: String,
    },
    Deleted {
        name: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFolderPage {
    pub entries: Vec<ListEntry>,
    pub cursor: String,
    pub has_more: bool,
}
