// ABOUTME: XDG-compliant config storage with atomic writes
// ABOUTME: Handles paths, permissions and the persisted sync settings

use crate::{Error, LineEnding, Result, RevisionId};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub struct Paths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub credential_file: PathBuf,
    pub tmp_dir: PathBuf,
}

impl Paths {
    pub fn new(config_dir_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = if let Some(dir) = config_dir_override {
            dir
        } else {
            ProjectDirs::from("", "", "tasksync")
                .ok_or_else(|| {
                    Error::Filesystem(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "Could not determine config directory",
                    ))
                })?
                .config_dir()
                .to_path_buf()
        };

        Ok(Paths {
            settings_file: config_dir.join("settings.yaml"),
            credential_file: config_dir.join("credential"),
            tmp_dir: config_dir.join("tmp"),
            config_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in &[&self.config_dir, &self.tmp_dir] {
            fs::create_dir_all(dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(dir, perms)?;
            }
        }
        Ok(())
    }
}

pub fn write_atomic(path: &Path, content: &[u8], tmp_dir: &Path) -> Result<()> {
    use rand::Rng;

    fs::create_dir_all(tmp_dir)?;
    let random: u32 = rand::thread_rng().gen();
    let tmp_path = tmp_dir.join(format!("{:x}.part", random));

    fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp_path, perms)?;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Sync settings persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Working task file; falls back to [`Settings::default_path`].
    #[serde(default)]
    pub todo_file: Option<String>,
    #[serde(default)]
    pub done_file: Option<String>,
    /// Unrestricted store access rather than an app-private folder.
    #[serde(default)]
    pub full_access: bool,
    #[serde(default)]
    pub line_ending: LineEnding,
    /// Revision of the working file as of the last load or save.
    #[serde(default)]
    pub last_seen_revision: Option<RevisionId>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;
        write_atomic(&paths.settings_file, yaml.as_bytes(), &paths.tmp_dir)
    }

    pub fn default_path(&self) -> &'static str {
        if self.full_access {
            "/todo/todo.txt"
        } else {
            "/todo.txt"
        }
    }

    pub fn todo_path(&self) -> String {
        self.todo_file
            .clone()
            .unwrap_or_else(|| self.default_path().to_string())
    }

    /// Archive file; `done.txt` next to the working file unless configured.
    pub fn done_path(&self) -> String {
        if let Some(done) = &self.done_file {
            return done.clone();
        }
        let todo = self.todo_path();
        match todo.rfind('/') {
            Some(idx) => format!("{}/done.txt", &todo[..idx]),
            None => "/done.txt".to_string(),
        }
    }

    /// Points the working file somewhere else. The old baseline belongs to
    /// the old file, so it is dropped.
    pub fn switch_todo_file(&mut self, path: &str) {
        if self.todo_file.as_deref() != Some(path) {
            self.todo_file = Some(path.to_string());
            self.last_seen_revision = None;
        }
    }
}
