//! CacheTable CLI
//!
//! Runs one store operation against a whole-table snapshot file.
//!
//! The snapshot is loaded (if present), the command executed, and the table
//! written back when the command changed it.

use std::path::PathBuf;

use cachetable::command::Command;
use cachetable::{CacheStore, Config, Result, Value};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CacheTable CLI
#[derive(Parser, Debug)]
#[command(name = "cachetable-cli")]
#[command(about = "CLI for the CacheTable namespaced key-value store")]
#[command(version)]
struct Args {
    /// Snapshot file holding the table between runs
    #[arg(short, long, default_value = "./cachetable.ctab")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get { namespace: String, key: String },

    /// Set a key-value pair
    Set {
        namespace: String,
        key: String,
        value: String,
    },

    /// Delete a key
    Del { namespace: String, key: String },

    /// Delete a key and print its value
    Take { namespace: String, key: String },

    /// Check whether a key exists
    Exists { namespace: String, key: String },

    /// List the keys of a namespace
    Keys { namespace: String },

    /// Count the entries of a namespace
    Size { namespace: String },

    /// Delete every entry of a namespace
    Clear { namespace: String },

    /// Increment a counter
    Incr {
        namespace: String,
        key: String,

        /// Amount to add
        #[arg(long, default_value = "1")]
        by: String,

        /// Starting value for an absent counter
        #[arg(long, default_value = "0")]
        initial: String,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        let lit = |text: String| Value::parse_literal(&text);
        match command {
            Commands::Get { namespace, key } => Command::Get {
                namespace,
                key: lit(key),
            },
            Commands::Set {
                namespace,
                key,
                value,
            } => Command::Set {
                namespace,
                key: lit(key),
                value: lit(value),
            },
            Commands::Del { namespace, key } => Command::Delete {
                namespace,
                key: lit(key),
            },
            Commands::Take { namespace, key } => Command::Take {
                namespace,
                key: lit(key),
            },
            Commands::Exists { namespace, key } => Command::Exists {
                namespace,
                key: lit(key),
            },
            Commands::Keys { namespace } => Command::Keys { namespace },
            Commands::Size { namespace } => Command::Size { namespace },
            Commands::Clear { namespace } => Command::Clear { namespace },
            Commands::Incr {
                namespace,
                key,
                by,
                initial,
            } => Command::Increment {
                namespace,
                key: lit(key),
                count: lit(by),
                initial: lit(initial),
            },
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,cachetable=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        // Usage errors are the caller's fault; keep them apart from I/O failures
        std::process::exit(if e.is_usage() { 2 } else { 1 });
    }
}

fn run(args: Args) -> Result<()> {
    let store = CacheStore::open(Config::default())?;

    if args.file.exists() {
        store.load_all(&args.file)?;
    }

    let command = Command::from(args.command);
    let mutates = command.is_mutation();

    let reply = store.execute(command)?;
    println!("{}", reply);

    if mutates {
        store.persist_all(&args.file)?;
    }

    Ok(())
}
