//! Connection settings subcommands.

use super::CommandResult;
use clap::Subcommand;
use taskpool_core::{GistStore, RemoteStore, SyncConfigStore, SyncState};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set connection settings
    Set {
        /// Personal access token with gist scope
        #[arg(long)]
        token: Option<String>,
        /// Id of the gist holding the data file
        #[arg(long)]
        gist_id: Option<String>,
        /// Enable or disable automatic syncing
        #[arg(long)]
        auto_sync: Option<bool>,
        /// Sync interval in minutes
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Print current settings (token masked)
    Show,
    /// Check the stored credentials against the gist API
    Test,
    /// Remove stored settings and sync state
    Clear,
}

pub fn run(action: ConfigAction) -> CommandResult {
    match action {
        ConfigAction::Set {
            token,
            gist_id,
            auto_sync,
            interval,
        } => set(token, gist_id, auto_sync, interval),
        ConfigAction::Show => show(),
        ConfigAction::Test => test(),
        ConfigAction::Clear => clear(),
    }
}

fn set(
    token: Option<String>,
    gist_id: Option<String>,
    auto_sync: Option<bool>,
    interval: Option<u32>,
) -> CommandResult {
    let config = super::config_store()?;
    let mut settings = config.load();

    if let Some(token) = token {
        settings.token = token;
    }
    if let Some(gist_id) = gist_id {
        settings.gist_id = gist_id;
    }
    if let Some(auto_sync) = auto_sync {
        settings.auto_sync = auto_sync;
    }
    if let Some(interval) = interval {
        settings.sync_interval_minutes = interval;
    }

    let problems = SyncConfigStore::validate(&settings);
    if !problems.is_empty() {
        return Err(problems.join(", ").into());
    }

    settings.status = SyncState::Configured;
    config.save(&settings)?;
    println!("ok");
    Ok(())
}

fn show() -> CommandResult {
    let config = super::config_store()?;
    let mut settings = config.load();
    settings.token = mask(&settings.token);
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn test() -> CommandResult {
    let config = super::config_store()?;
    let settings = config.load();
    let problems = SyncConfigStore::validate(&settings);
    if !problems.is_empty() {
        return Err(format!("sync is not configured: {}", problems.join(", ")).into());
    }

    let store = GistStore::new(settings.token, settings.gist_id);
    let check = super::runtime()?.block_on(store.validate_credentials());
    println!("{}", check.message);
    if !check.valid {
        return Err("credential check failed".into());
    }
    Ok(())
}

fn clear() -> CommandResult {
    let config = super::config_store()?;
    config.clear()?;
    println!("sync configuration cleared");
    Ok(())
}

fn mask(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}
