// ABOUTME: Blocking HTTP client for the Dropbox v2 files API
// ABOUTME: Download, conditional upload, metadata and paginated folder listing

use super::{Connector, RemoteStore};
use crate::util::{ascii_json, truncate_str};
use crate::{
    Credential, Download, EntryKind, Error, FileMetadata, ListEntry, ListFolderPage, RemoteEntry,
    Result, RevisionId, Uploaded, WriteMode,
};
use log::{debug, error};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const API_RESULT_HEADER: &str = "Dropbox-API-Result";

pub struct DropboxClient {
    client: Client,
    api_base: String,
    content_base: String,
    token: String,
}

impl DropboxClient {
    pub fn new(
        credential: &Credential,
        api_base: Option<String>,
        content_base: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(DropboxClient {
            client,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            content_base: content_base.unwrap_or_else(|| DEFAULT_CONTENT_BASE.into()),
            token: credential.token().to_string(),
        })
    }

    fn authorized(&self, url: String) -> RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "tasksync/0.1 (Rust)")
    }

    fn check(&self, endpoint: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().unwrap_or_default();
        let preview = truncate_str(&message, 100);
        if status.as_u16() == 401 {
            return Err(Error::Auth(format!("Access token rejected: {}", preview)));
        }

        // Conflict and not-found bodies carry an `error_summary` such as
        // "path/conflict/file/.." which callers match on.
        let message = serde_json::from_str::<serde_json::Value>(&message)
            .ok()
            .and_then(|v| v.get("error_summary")?.as_str().map(String::from))
            .unwrap_or(preview);
        Err(Error::Api {
            endpoint: endpoint.into(),
            status: status.as_u16(),
            message,
        })
    }

    fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        let response = self
            .authorized(url)
            .header("Accept", "application/json")
            .json(&body)
            .send()?;
        let response = self.check(endpoint, response)?;

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            debug!("Response body (first 500 chars): {}", truncate_str(&body, 500));
            Error::Parse(e)
        })
    }
}

fn mode_arg(mode: &WriteMode) -> serde_json::Value {
    match mode {
        WriteMode::Add => json!("add"),
        WriteMode::Overwrite => json!("overwrite"),
        WriteMode::Update(rev) => json!({ ".tag": "update", "update": rev.as_str() }),
    }
}

impl RemoteStore for DropboxClient {
    fn download(&self, path: &str) -> Result<Download> {
        let endpoint = "/2/files/download";
        let url = format!("{}{}", self.content_base, endpoint);
        let response = self
            .authorized(url)
            .header(API_ARG_HEADER, ascii_json(&json!({ "path": path })))
            .send()?;
        let response = self.check(endpoint, response)?;

        let meta: FileMetadata = match response.headers().get(API_RESULT_HEADER) {
            Some(value) => {
                let raw = value.to_str().map_err(|_| Error::Api {
                    endpoint: endpoint.into(),
                    status: 200,
                    message: format!("{} header is not valid text", API_RESULT_HEADER),
                })?;
                serde_json::from_str(raw)?
            }
            None => {
                return Err(Error::Api {
                    endpoint: endpoint.into(),
                    status: 200,
                    message: format!("missing {} header", API_RESULT_HEADER),
                })
            }
        };

        let bytes = response.bytes()?.to_vec();
        Ok(Download {
            revision: RevisionId::new(meta.rev),
            bytes,
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
        let url = format!("{}{}", self.content_base, endpoint);
        let arg = json!({
            "path": path,
            "mode": mode_arg(&mode),
            "autorename": autorename,
            "mute": false,
        });
        let response = self
            .authorized(url)
            .header(API_ARG_HEADER, ascii_json(&arg))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()?;
        let response = self.check(endpoint, response)?;

        let meta: FileMetadata = serde_json::from_str(&response.text()?)?;
        Ok(Uploaded {
            path: meta.path_display.unwrap_or_else(|| path.to_string()),
            revision: RevisionId::new(meta.rev),
        })
    }

    fn get_metadata(&self, path: &str) -> Result<RevisionId> {
        let meta: FileMetadata = self.rpc("/2/files/get_metadata", json!({ "path": path }))?;
        Ok(RevisionId::new(meta.rev))
    }

    fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut page: ListFolderPage = self.rpc("/2/files/list_folder", json!({ "path": path }))?;
        let mut entries = Vec::new();

        loop {
            entries.extend(page.entries.into_iter().filter_map(|entry| match entry {
                ListEntry::File { name, .. } => Some(RemoteEntry {
                    name,
                    kind: EntryKind::File,
                }),
                ListEntry::Folder { name } => Some(RemoteEntry {
                    name,
                    kind: EntryKind::Folder,
                }),
                ListEntry::Deleted { .. } => None,
            }));

            if !page.has_more {
                break;
            }
            page = self.rpc(
                "/2/files/list_folder/continue",
                json!({ "cursor": page.cursor }),
            )?;
        }

        Ok(entries)
    }
}

/// Builds [`DropboxClient`] handles against configurable endpoints.
#[derive(Debug, Clone, Default)]
pub struct DropboxConnector {
    pub api_base: Option<String>,
    pub content_base: Option<String>,
}

impl Connector for DropboxConnector {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>> {
        let client = DropboxClient::new(
            credential,
            self.api_base.clone(),
            self.content_base.clone(),
        )?;
        Ok(Arc::new(client))
    }
}
