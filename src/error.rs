// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Separates not-authenticated, offline and remote I/O failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not authenticated: log in first")]
    NotAuthenticated,

    #[error("Device is offline")]
    Offline,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status} on {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotAuthenticated => 2,
            Error::Auth(_) => 2,
            Error::Offline => 3,
            Error::Network(_) => 4,
            Error::Api { .. } => 5,
            Error::Parse(_) => 6,
            Error::Filesystem(_) => 7,
            Error::Config(_) => 8,
        }
    }

    /// Transport or remote API failure, including unresolved write conflicts.
    pub fn is_remote_io(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Api { .. } | Error::Parse(_))
    }

    /// A conditional write lost against a newer remote revision.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api { status: 409, message, .. } if message.contains("conflict"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 409, message, .. } if message.contains("not_found"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
