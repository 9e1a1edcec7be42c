// SPDX-License-Identifier: Apache-2.0
//! Command-line parsing and command execution.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use comfy_table::Table;
use relay_records::{MemoryRecordSource, MutableRecordSource, RecordLookup, RecordSource};
use relay_records_fs::FsSnapshotStore;
use relay_records_persist::{PersistConfig, SnapshotService};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Top-level arguments.
#[derive(Parser)]
#[command(name = "records")]
#[command(about = "Inspect, check and edit relay-records snapshot files")]
#[command(version)]
pub struct Cli {
    /// Optional path to a persistence config (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Snapshot commands. Every `file` is a `<key>.json` snapshot.
#[derive(Subcommand)]
pub enum Commands {
    /// Count tracked, existent and tombstoned ids, with a per-type table
    Stats {
        /// Snapshot file
        file: PathBuf,
    },
    /// Print tracked ids, one per line, sorted
    Ids {
        /// Snapshot file
        file: PathBuf,
    },
    /// Print one record as JSON (`null` for a tombstone)
    Get {
        /// Snapshot file
        file: PathBuf,
        /// Data id to look up
        id: String,
    },
    /// Print UNKNOWN, NONEXISTENT or EXISTENT for one id
    Status {
        /// Snapshot file
        file: PathBuf,
        /// Data id to look up
        id: String,
    },
    /// Validate every entry; fails on the first malformed one
    Check {
        /// Snapshot file
        file: PathBuf,
    },
    /// Print the hex BLAKE3 digest of the canonical snapshot
    Digest {
        /// Snapshot file
        file: PathBuf,
    },
    /// Tombstone one id and rewrite the file
    Delete {
        /// Snapshot file
        file: PathBuf,
        /// Data id to tombstone
        id: String,
    },
    /// Forget one id entirely and rewrite the file
    Remove {
        /// Snapshot file
        file: PathBuf,
        /// Data id to forget
        id: String,
    },
    /// Rewrite the file canonically (sorted keys)
    Fmt {
        /// Snapshot file
        file: PathBuf,
    },
    /// List snapshot keys in the configured store directory
    List,
}

/// Parse arguments from the process environment and run.
pub fn entrypoint() -> Result<()> {
    run(Cli::parse())
}

/// Run an already-parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);
    let config = match &cli.config {
        Some(path) => PersistConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PersistConfig::default(),
    };
    debug!(?config, "resolved persistence config");

    match cli.command {
        Commands::Stats { file } => {
            let source = load(&file, &config, config.strict)?;
            print_stats(&source);
        }
        Commands::Ids { file } => {
            let source = load(&file, &config, config.strict)?;
            for id in source.record_ids() {
                println!("{id}");
            }
        }
        Commands::Get { file, id } => {
            let source = load(&file, &config, config.strict)?;
            match source.get(&id) {
                RecordLookup::Existent(record) => {
                    println!("{}", serde_json::to_string_pretty(&record.to_json())?);
                }
                RecordLookup::Nonexistent => println!("null"),
                RecordLookup::Unknown => bail!("record `{id}` is unknown"),
            }
        }
        Commands::Status { file, id } => {
            let source = load(&file, &config, config.strict)?;
            println!("{}", source.status(&id));
        }
        Commands::Check { file } => {
            let source = load(&file, &config, true)?;
            let tombstones = source
                .iter()
                .filter(|(_, lookup)| lookup.is_nonexistent())
                .count();
            println!(
                "ok: {} tracked ({} existent, {tombstones} nonexistent)",
                source.len(),
                source.len() - tombstones
            );
        }
        Commands::Digest { file } => {
            let source = load(&file, &config, config.strict)?;
            println!("{}", source.snapshot_digest());
        }
        Commands::Delete { file, id } => {
            let (service, key) = open(&file, &config, true)?;
            let mut source = load_from(&service, &key, &file)?;
            source.delete(id.as_str().into());
            save_to(&service, &key, &file, &source)?;
            println!("{id}: {}", source.status(&id));
        }
        Commands::Remove { file, id } => {
            let (service, key) = open(&file, &config, true)?;
            let mut source = load_from(&service, &key, &file)?;
            source.remove(&id);
            save_to(&service, &key, &file, &source)?;
            println!("{id}: {}", source.status(&id));
        }
        Commands::Fmt { file } => {
            let (service, key) = open(&file, &config, true)?;
            let source = load_from(&service, &key, &file)?;
            save_to(&service, &key, &file, &source)?;
        }
        Commands::List => {
            let store = FsSnapshotStore::from_config(&config)
                .context("failed to open snapshot directory")?;
            let service = SnapshotService::with_config(store, config);
            for key in service.keys()? {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when `run` is called twice in one
    // process (tests); keep the first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build a service over the directory containing `file`, keyed by its stem.
fn open(
    file: &Path,
    config: &PersistConfig,
    strict: bool,
) -> Result<(SnapshotService<FsSnapshotStore>, String)> {
    if file.extension().and_then(OsStr::to_str) != Some("json") {
        bail!("snapshot files must end in .json: {}", file.display());
    }
    let key = file
        .file_stem()
        .and_then(OsStr::to_str)
        .with_context(|| format!("file name is not valid UTF-8: {}", file.display()))?
        .to_owned();
    let base = file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let store = FsSnapshotStore::with_base(base)
        .with_context(|| format!("failed to open {}", base.display()))?;
    let config = PersistConfig {
        strict,
        base_dir: Some(base.to_path_buf()),
        ..config.clone()
    };
    Ok((SnapshotService::with_config(store, config), key))
}

fn load(file: &Path, config: &PersistConfig, strict: bool) -> Result<MemoryRecordSource> {
    let (service, key) = open(file, config, strict)?;
    load_from(&service, &key, file)
}

fn load_from(
    service: &SnapshotService<FsSnapshotStore>,
    key: &str,
    file: &Path,
) -> Result<MemoryRecordSource> {
    service
        .load(key)
        .with_context(|| format!("failed to read snapshot {}", file.display()))?
        .with_context(|| format!("no snapshot at {}", file.display()))
}

fn save_to(
    service: &SnapshotService<FsSnapshotStore>,
    key: &str,
    file: &Path,
    source: &MemoryRecordSource,
) -> Result<()> {
    service
        .save(key, source)
        .with_context(|| format!("failed to write snapshot {}", file.display()))
}

fn print_stats(source: &MemoryRecordSource) {
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut nonexistent = 0_usize;
    for (_, lookup) in source.iter() {
        match lookup {
            RecordLookup::Existent(record) => {
                *by_type
                    .entry(record.typename().unwrap_or("(untyped)"))
                    .or_default() += 1;
            }
            RecordLookup::Nonexistent => nonexistent += 1,
            RecordLookup::Unknown => {}
        }
    }
    println!("tracked: {}", source.len());
    println!("existent: {}", source.len() - nonexistent);
    println!("nonexistent: {nonexistent}");

    let mut table = Table::new();
    table.set_header(vec!["__typename", "records"]);
    for (typename, count) in by_type {
        table.add_row(vec![typename.to_owned(), count.to_string()]);
    }
    println!("{table}");
}
