//! Sync subcommands: two-way sync, one-way transfers, and status.

use super::CommandResult;
use clap::Subcommand;
use taskpool_core::{SyncConfigStore, SyncReport, SyncState};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Two-way sync with the remote gist
    Now,
    /// Download remote tasks, replacing the local list
    Download,
    /// Upload the local list without merging
    Upload,
    /// Show connection status and last sync time
    Status,
}

pub fn run(action: SyncAction) -> CommandResult {
    match action {
        SyncAction::Now => sync_now(),
        SyncAction::Download => download(),
        SyncAction::Upload => upload(),
        SyncAction::Status => status(),
    }
}

fn sync_now() -> CommandResult {
    let engine = super::build_engine()?;
    let tasks = super::load_tasks()?;
    let config = super::config_store()?;
    config.update_status(SyncState::Syncing, "")?;

    let report = super::runtime()?.block_on(engine.sync(&tasks));
    finish(&config, report, true)
}

fn download() -> CommandResult {
    let engine = super::build_engine()?;
    let config = super::config_store()?;
    config.update_status(SyncState::Syncing, "")?;

    let report = super::runtime()?.block_on(engine.download_only());
    finish(&config, report, true)
}

fn upload() -> CommandResult {
    let engine = super::build_engine()?;
    let tasks = super::load_tasks()?;
    let config = super::config_store()?;
    config.update_status(SyncState::Syncing, "")?;

    let report = super::runtime()?.block_on(engine.upload_only(&tasks));
    finish(&config, report, false)
}

/// Record the outcome, optionally write the returned task list back to
/// disk, and surface failures as command errors.
fn finish(config: &SyncConfigStore, report: SyncReport, save_tasks: bool) -> CommandResult {
    if report.success {
        config.update_status(SyncState::Synced, "")?;
        if save_tasks {
            if let Some(tasks) = &report.tasks {
                super::save_tasks(tasks)?;
            }
        }
        println!("{}", report.message);
        if let Some(count) = report.synced_tasks {
            println!("tasks: {count}");
        }
        if report.conflict_resolved {
            println!("conflicts resolved");
        }
        if report.retries > 0 {
            println!("retries: {}", report.retries);
        }
        Ok(())
    } else {
        config.update_status(SyncState::Error, &report.message)?;
        let kind = report
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Err(format!(
            "{} (kind: {kind}, retries: {})",
            report.message, report.retries
        )
        .into())
    }
}

fn status() -> CommandResult {
    let config = super::config_store()?;
    let settings = config.load();

    let state = serde_json::to_value(settings.status)?;
    println!("status: {}", state.as_str().unwrap_or("unknown"));

    match config.last_sync() {
        Some(at) => println!("last sync: {}", at.to_rfc3339()),
        None => println!("last sync: never"),
    }

    if settings.auto_sync {
        println!("mode: auto every {} min", settings.sync_interval_minutes);
    } else {
        println!("mode: manual");
    }

    println!("local tasks: {}", super::load_tasks()?.len());

    if !settings.last_error.is_empty() {
        println!("last error: {}", settings.last_error);
    }
    Ok(())
}
