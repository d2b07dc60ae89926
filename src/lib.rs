// ABOUTME: Public library API for tasksync remote file synchronization
// ABOUTME: Re-exports core modules for external use

pub mod cli;
pub mod conflict;
pub mod connectivity;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod listing;
pub mod logger;
pub mod model;
pub mod queue;
pub mod remote;
pub mod storage;
pub mod util;

pub use conflict::{ConflictResolver, Renamed};
pub use engine::{SaveOutcome, SyncEngine};
pub use error::{Error, Result};
pub use model::{
    api_path, Credential, Download, EntryKind, FileEntry, FileMetadata, LineEnding, ListEntry,
    ListFolderPage, RemoteContents, RemoteEntry, RevisionId, Uploaded, WriteMode, ROOT_DIR,
};
