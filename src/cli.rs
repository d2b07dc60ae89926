// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags

use crate::remote::dropbox::{DEFAULT_API_BASE, DEFAULT_CONTENT_BASE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tasksync")]
#[command(about = "Sync a todo.txt task list and its archive with Dropbox", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Access token (overrides env/stored credential)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// RPC API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Content (upload/download) API base URL
    #[arg(long, global = true, default_value = DEFAULT_CONTENT_BASE)]
    pub content_base: String,

    /// Override config directory
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log sync activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show authentication, connectivity and working file (default)
    Status,

    /// Store an access token
    Login {
        #[arg(value_name = "TOKEN")]
        access_token: String,
    },

    /// Forget the stored access token
    Logout,

    /// Download the working file
    Pull {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a local file as the new working file contents
    Push {
        file: PathBuf,
    },

    /// Append completed tasks to the archive file
    Archive {
        /// Lines to append; read from stdin when omitted
        file: Option<PathBuf>,
    },

    /// List a remote directory
    Ls {
        #[arg(default_value = crate::ROOT_DIR)]
        path: String,

        /// Include non-.txt files
        #[arg(short, long)]
        all: bool,
    },

    /// Print a remote file
    Cat {
        path: String,
    },

    /// Overwrite a remote file unconditionally
    Put {
        path: String,
        file: PathBuf,
    },

    /// Show the current remote revision of a file
    Rev {
        /// Defaults to the working file
        path: Option<String>,
    },

    /// Switch the working file
    Use {
        path: String,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_status() {
        let cli = Cli::parse_from(["tasksync"]);
        assert!(matches!(cli.command(), Commands::Status));
        assert_eq!(cli.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::parse_from(["tasksync", "ls"]);
        match cli.command() {
            Commands::Ls { path, all } => {
                assert_eq!(path, "/");
                assert!(!all);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tasksync", "push", "todo.txt", "--token", "abc", "-v"]);
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert!(cli.verbose);
        assert!(matches!(cli.command(), Commands::Push { .. }));
    }

    #[test]
    fn test_login_token_is_positional() {
        let cli = Cli::parse_from(["tasksync", "login", "sl.abc"]);
        assert!(cli.token.is_none());
        assert!(matches!(cli.command(), Commands::Login { access_token } if access_token == "sl.abc"));
    }
}
