// ABOUTME: CLI entrypoint for tasksync command
// ABOUTME: Wires credentials, connectivity and the sync engine, maps errors to exit codes

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tasksync::{
    cli::{Cli, Commands},
    connectivity::TcpProbe,
    credentials::{resolve_token, CredentialStore, MemoryCredentialStore},
    logger::init_logger,
    remote::{DropboxConnector, RemoteClient},
    storage::{Paths, Settings},
    util::{split_lines, terminate_lines},
    Credential, Error, SyncEngine,
};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        let code = e.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1);
        eprintln!("tasksync: [E{}] {:#}", code, e);
        std::process::exit(code);
    }
}

#[cfg(feature = "keyring")]
fn credential_store(_paths: &Paths) -> Arc<dyn CredentialStore> {
    Arc::new(tasksync::credentials::KeyringCredentialStore::new(
        "tasksync", "dropbox",
    ))
}

#[cfg(not(feature = "keyring"))]
fn credential_store(paths: &Paths) -> Arc<dyn CredentialStore> {
    Arc::new(tasksync::credentials::FileCredentialStore::new(
        paths.credential_file.clone(),
        paths.tmp_dir.clone(),
    ))
}

fn read_local(file: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(split_lines(&text))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new(cli.config_dir.clone())?;
    paths.ensure_dirs()?;
    let mut settings = Settings::load(&paths.settings_file)?;
    let stored = credential_store(&paths);

    // Flag and env tokens apply to this run only; the stored one is untouched.
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(MemoryCredentialStore::new(resolve_token(cli.token.clone(), stored.as_ref()).ok()));
    let remote = RemoteClient::new(
        credentials,
        DropboxConnector {
            api_base: Some(cli.api_base.clone()),
            content_base: Some(cli.content_base.clone()),
        },
    );
    let probe = TcpProbe::for_url(&cli.api_base)?;
    let engine = SyncEngine::new(
        Arc::new(remote),
        Arc::new(probe),
        settings.last_seen_revision.clone(),
    )?;
    let eol = settings.line_ending.as_str();

    match cli.command() {
        Commands::Status => {
            let authenticated = engine.remote().is_authenticated();
            println!("authenticated: {}", if authenticated { "yes" } else { "no" });
            println!("online:        {}", if engine.is_online() { "yes" } else { "no" });
            println!("todo file:     {}", settings.todo_path());
            println!("done file:     {}", settings.done_path());
            match &settings.last_seen_revision {
                Some(rev) => println!("last revision: {}", rev),
                None => println!("last revision: (none)"),
            }
            if let Some(at) = settings.last_sync {
                println!("last sync:     {}", at.to_rfc3339());
            }
        }
        Commands::Login { access_token } => {
            stored.set(Some(Credential::new(access_token)));
            println!("Logged in");
        }
        Commands::Logout => {
            stored.set(None);
            println!("Logged out");
        }
        Commands::Pull { output } => {
            let path = settings.todo_path();
            let contents = engine.load_file(&path)?;

            match output {
                Some(file) => fs::write(&file, terminate_lines(&contents.lines, eol))
                    .with_context(|| format!("Failed to write {}", file.display()))?,
                None => {
                    for line in &contents.lines {
                        println!("{}", line);
                    }
                }
            }

            settings.last_seen_revision = Some(contents.revision);
            settings.last_sync = Some(Utc::now());
            settings.save(&paths)?;
        }
        Commands::Push { file } => {
            let lines = read_local(&file)?;
            let path = settings.todo_path();
            let outcome = engine.save_file(&path, &lines, eol)?;

            if let Some(renamed) = &outcome.renamed {
                println!("{}", renamed);
                settings.switch_todo_file(&renamed.to);
            }
            settings.last_seen_revision = Some(outcome.revision.clone());
            settings.last_sync = Some(Utc::now());
            settings.save(&paths)?;
            println!(
                "Saved {} tasks to {} (rev {})",
                lines.len(),
                outcome.path,
                outcome.revision
            );
        }
        Commands::Archive { file } => {
            let lines = match file {
                Some(file) => read_local(&file)?,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read stdin")?;
                    split_lines(&text)
                }
            };
            let lines: Vec<String> = lines
                .into_iter()
                .filter(|line| !line.trim().is_empty())
                .collect();

            let path = settings.done_path();
            engine.append_to_archive(&path, &lines, eol)?;
            println!("Archived {} tasks to {}", lines.len(), path);
        }
        Commands::Ls { path, all } => {
            for entry in engine.list_files(&path, !all)? {
                if entry.is_folder {
                    println!("{}/", entry.name);
                } else {
                    println!("{}", entry.name);
                }
            }
        }
        Commands::Cat { path } => match engine.read_raw(&path)? {
            Some(text) => println!("{}", text),
            None => return Err(Error::NotAuthenticated.into()),
        },
        Commands::Put { path, file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if !engine.remote().is_authenticated() {
                return Err(Error::NotAuthenticated.into());
            }
            engine.write_raw(&path, &content);
            engine.flush();
        }
        Commands::Rev { path } => {
            let path = path.unwrap_or_else(|| settings.todo_path());
            println!("{}", engine.remote_revision(&path)?);
        }
        Commands::Use { path } => {
            settings.switch_todo_file(&path);
            settings.save(&paths)?;
            println!("Working file is now {}", path);
        }
    }

    Ok(())
}
