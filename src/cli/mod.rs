//! CLI argument parsing for keylock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// keylock: named locks shared between processes through a lock directory.
///
/// A lock is a file in the store's `locks/` directory, created exclusively.
/// Only the owner that acquired a lock may release it; expired locks are
/// reported but never taken over, and must be cleared with --force.
#[derive(Parser, Debug)]
#[command(name = "keylock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store directory (default: $KEYLOCK_DIR, then ./.keylock).
    #[arg(long, global = true, value_name = "PATH")]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for keylock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a lock store.
    ///
    /// Creates the locks and events directories and a default config.yaml.
    /// Safe to run on an existing store.
    Init,

    /// Acquire a lock.
    ///
    /// Fails immediately if the key is held; never waits.
    Acquire(AcquireArgs),

    /// Release a lock held by the given owner.
    Release(ReleaseArgs),

    /// Show the state of one lock.
    Status(StatusArgs),

    /// List all locks with their age and expiry.
    List,

    /// Remove one lock regardless of owner.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(ClearArgs),

    /// Remove every lock regardless of owner or expiry.
    ///
    /// Intended for bootstrap only. Requires --force.
    ClearAll(ClearAllArgs),
}

/// Arguments for the `acquire` command.
#[derive(Parser, Debug)]
pub struct AcquireArgs {
    /// Lock key (resource name).
    pub key: String,

    /// Validity in seconds (default from config, normally 3600).
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Owner name recorded on the lock (default from config, normally "None").
    #[arg(short, long)]
    pub owner: Option<String>,
}

/// Arguments for the `release` command.
#[derive(Parser, Debug)]
pub struct ReleaseArgs {
    /// Lock key (resource name).
    pub key: String,

    /// Owner releasing the lock; must match the recorded owner.
    #[arg(short, long)]
    pub owner: Option<String>,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Lock key (resource name).
    pub key: String,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Lock key to clear.
    pub key: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `clear-all` command.
#[derive(Parser, Debug)]
pub struct ClearAllArgs {
    /// Force clearing every lock (required for safety).
    #[arg(long)]
    pub force: bool,
}
