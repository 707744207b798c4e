//! Command-line front end for the note store.
//!
//! # Responsibility
//! - Build the configured repository from the environment (and `.env`).
//! - Run one note operation per invocation and print JSON results.

use clap::{Parser, Subcommand};
use log::{error, warn};
use notestore_core::{
    init_logging, NoteDraft, NoteService, OpContext, StoreConfig, SystemClock,
};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "notestore", version, about = "Notes on a bare key/blob store")]
struct Cli {
    /// Abandon the operation after this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core linkage information.
    Ping,
    /// Creates or overwrites a note. Generates an id when none is given.
    Save {
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        data: String,
    },
    /// Prints one note.
    Get { id: String },
    /// Deletes one note.
    Delete { id: String },
    /// Prints every note projection in insertion order.
    List,
    /// Rebuilds the index document from stored note blobs.
    RebuildIndex,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Command::Ping = cli.command {
        println!("notestore_core ping={}", notestore_core::ping());
        println!("notestore_core version={}", notestore_core::core_version());
        return Ok(());
    }

    dotenv::dotenv().ok();
    let config = StoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }
    if !config.backend.is_persistent() {
        warn!("event=cli_run module=cli status=ephemeral_backend backend=memory");
        eprintln!(
            "warning: NOTESTORE_BACKEND is memory; notes are discarded when this command exits \
             (set NOTESTORE_BACKEND=fs|sqlite|s3 to keep them)"
        );
    }

    let ctx = match cli.timeout_ms {
        Some(ms) => OpContext::background().with_timeout(Duration::from_millis(ms)),
        None => OpContext::background(),
    };
    let repo = config.open_repository().map_err(|err| err.to_string())?;

    if let Command::RebuildIndex = cli.command {
        let count = repo.rebuild_index(&ctx).map_err(|err| err.to_string())?;
        return print_json(&serde_json::json!({ "indexed": count }));
    }

    let service = NoteService::with_index_key(repo, SystemClock, config.index_key.clone());
    match cli.command {
        Command::Save { id, title, data } => {
            let draft = match id {
                Some(id) => NoteDraft::with_id(id, title, data),
                None => NoteDraft::new(title, data),
            };
            let note = service.create(&ctx, draft).map_err(|err| err.to_string())?;
            print_json(&note)
        }
        Command::Get { id } => {
            let note = service.get(&ctx, &id).map_err(|err| err.to_string())?;
            print_json(&note)
        }
        Command::Delete { id } => service.delete(&ctx, &id).map_err(|err| err.to_string()),
        Command::List => {
            let notes = service.list(&ctx, 0, 0).map_err(|err| err.to_string())?;
            print_json(&serde_json::json!({ "notes": notes }))
        }
        Command::Ping | Command::RebuildIndex => Ok(()),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}
