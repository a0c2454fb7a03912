//! Command implementations for keylock.
//!
//! This module routes CLI commands to their handlers. Every handler takes
//! the resolved [`StoreContext`], so the store location is decided once in
//! [`dispatch`].


use crate::cli::{AcquireArgs, ClearAllArgs, ClearArgs, Cli, Command, ReleaseArgs, StatusArgs};
use keylock::config::Config;
use keylock::context::StoreContext;
use keylock::error::{LockError, Result};
use keylock::events::{Event, EventAction, append_event};
use keylock::fs::atomic_write_file;
use keylock::locks::{LockInfo, LockManager};
use serde_json::json;
use std::sync::Arc;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = StoreContext::resolve(cli.store_dir.as_deref())?;

    match cli.command {
        Command::Init => cmd_init(&ctx),
        Command::Acquire(args) => cmd_acquire(&ctx, args),
        Command::Release(args) => cmd_release(&ctx, args),
        Command::Status(args) => cmd_status(&ctx, args),
        Command::List => cmd_list(&ctx),
        Command::Clear(args) => cmd_clear(&ctx, args),
        Command::ClearAll(args) => cmd_clear_all(&ctx, args),
    }
}

/// Open the manager for an initialized store, along with its config.
fn open_manager(ctx: &StoreContext) -> Result<(LockManager, Config)> {
    ctx.ensure_initialized()?;
    let config = ctx.load_config()?;
    let manager = LockManager::new(Arc::new(ctx.open_store()?));
    Ok((manager, config))
}

/// Append an audit event if enabled.
///
/// Best-effort: the lock operation has already happened, so a failed append
/// only prints a warning.
fn record_event(ctx: &StoreContext, config: &Config, event: Event) {
    if !config.audit_events {
        return;
    }
    if let Err(e) = append_event(ctx, &event) {
        eprintln!("Warning: failed to log {} event: {}", event.action, e);
    }
}

fn print_lock(info: &LockInfo) {
    let record = &info.record;
    println!("  Owner:      {}", record.owner);
    if let Some(pid) = record.pid {
        println!("  PID:        {}", pid);
    }
    println!("  Created:    {}", record.creation_time.format(TIME_FORMAT));
    println!("  Age:        {}", info.age_string());
    println!("  Timeout:    {}s", record.timeout);
    if info.is_expired {
        println!("  Status:     EXPIRED");
    }
    println!("  Token:      {}", record.token);
}

/// Initialize the store layout. Idempotent.
pub(crate) fn cmd_init(ctx: &StoreContext) -> Result<()> {
    let store = ctx.open_store()?;

    let config_path = ctx.config_path();
    let config_created = !config_path.exists();
    let config = if config_created {
        let config = Config::default();
        atomic_write_file(&config_path, &config.to_yaml()?)?;
        config
    } else {
        Config::load(&config_path)?
    };

    record_event(
        ctx,
        &config,
        Event::new(EventAction::Init).with_details(json!({
            "store_dir": ctx.root.display().to_string(),
            "config_created": config_created,
        })),
    );

    println!("Initialized keylock store: {}", ctx.root.display());
    println!("  Locks:      {}", store.dir().display());
    println!(
        "  Config:     {}{}",
        config_path.display(),
        if config_created { " (created)" } else { "" }
    );
    Ok(())
}

pub(crate) fn cmd_acquire(ctx: &StoreContext, args: AcquireArgs) -> Result<()> {
    let (manager, config) = open_manager(ctx)?;
    let timeout = args.timeout.unwrap_or(config.default_timeout_secs);
    let owner = args.owner.unwrap_or_else(|| config.default_owner.clone());

    let lock = manager.acquire(&args.key, timeout, &owner)?;

    record_event(
        ctx,
        &config,
        Event::new(EventAction::Acquire)
            .with_key(lock.key())
            .with_details(json!({
                "owner": lock.owner(),
                "timeout": lock.timeout(),
                "token": lock.token().to_string(),
            })),
    );

    println!("Acquired lock: {}", lock.key());
    println!("  Owner:      {}", lock.owner());
    println!("  Timeout:    {}s", lock.timeout());
    println!("  Token:      {}", lock.token());
    Ok(())
}

pub(crate) fn cmd_release(ctx: &StoreContext, args: ReleaseArgs) -> Result<()> {
    let (manager, config) = open_manager(ctx)?;
    let owner = args.owner.unwrap_or_else(|| config.default_owner.clone());

    let lock = manager.attach(&args.key)?;
    lock.release(&owner)?;

    record_event(
        ctx,
        &config,
        Event::new(EventAction::Release)
            .with_key(lock.key())
            .with_details(json!({
                "owner": owner,
                "token": lock.token().to_string(),
            })),
    );

    println!("Released lock: {}", lock.key());
    Ok(())
}

pub(crate) fn cmd_status(ctx: &StoreContext, args: StatusArgs) -> Result<()> {
    let (manager, _config) = open_manager(ctx)?;

    let info = manager
        .inspect(&args.key)?
        .ok_or_else(|| LockError::AlreadyAbsent {
            key: args.key.clone(),
        })?;

    println!("Lock: {}", info.record.key);
    print_lock(&info);
    Ok(())
}

pub(crate) fn cmd_list(ctx: &StoreContext) -> Result<()> {
    let (manager, _config) = open_manager(ctx)?;

    let locks = manager.admin().list()?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();
    for info in &locks {
        println!("{}:", info.record.key);
        print_lock(info);
        println!();
    }

    let expired = locks.iter().filter(|l| l.is_expired).count();
    if expired > 0 {
        println!(
            "Note: {} lock(s) are expired. Use `keylock clear <key> --force` to clear.",
            expired
        );
    }
    Ok(())
}

pub(crate) fn cmd_clear(ctx: &StoreContext, args: ClearArgs) -> Result<()> {
    if !args.force {
        return Err(LockError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets another process acquire it while the holder may still be running.\n\
             Only clear locks if you are certain the holder has crashed.\n\n\
             To clear the lock, run:\n  keylock clear {} --force",
            args.key
        )));
    }

    let (manager, config) = open_manager(ctx)?;
    let cleared = manager.admin().clear(&args.key)?;

    record_event(
        ctx,
        &config,
        Event::new(EventAction::LockClear)
            .with_key(&cleared.record.key)
            .with_details(json!({
                "owner": cleared.record.owner,
                "age_secs": cleared.record.age(cleared.observed_at).num_seconds(),
                "was_expired": cleared.is_expired,
                "token": cleared.record.token.to_string(),
            })),
    );

    println!("Cleared lock: {}", cleared.record.key);
    println!();
    println!("Lock details:");
    print_lock(&cleared);
    Ok(())
}

pub(crate) fn cmd_clear_all(ctx: &StoreContext, args: ClearAllArgs) -> Result<()> {
    if !args.force {
        return Err(LockError::UserError(
            "refusing to clear all locks without --force flag.\n\n\
             This removes every lock regardless of owner and is meant for bootstrap only.\n\n\
             To clear all locks, run:\n  keylock clear-all --force"
                .to_string(),
        ));
    }

    let (manager, config) = open_manager(ctx)?;
    let removed = manager.admin().clear_all()?;

    record_event(
        ctx,
        &config,
        Event::new(EventAction::ClearAll).with_details(json!({ "removed": removed })),
    );

    println!("Cleared {} lock(s).", removed);
    Ok(())
}
