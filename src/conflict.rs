// ABOUTME: Rename detection for writes the store saved under another name
// ABOUTME: Produces a typed notice the caller uses to repoint its working file

use log::info;
use std::fmt;

/// A successful write that landed at `to` instead of the requested `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub from: String,
    pub to: String,
}

impl fmt::Display for Renamed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filename was changed remotely. New name is: {}", self.to)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    /// Paths are compared exactly. `Some` means the caller must adopt
    /// `to` as its working file.
    pub fn resolve(&self, requested: &str, actual: &str) -> Option<Renamed> {
        if requested == actual {
            return None;
        }
        let renamed = Renamed {
            from: requested.to_string(),
            to: actual.to_string(),
        };
        info!("{}", renamed);
        Some(renamed)
    }
}
