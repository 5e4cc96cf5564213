pub mod config;
pub mod sync;
pub mod task;

use std::path::PathBuf;
use std::sync::Arc;
use taskpool_core::storage::{data_dir, JsonFileStore, SyncConfigStore};
use taskpool_core::sync::device_id::get_or_create_device_id;
use taskpool_core::sync::sanitize;
use taskpool_core::{GistStore, SyncEngine, Task, TaskSource};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn kv_store() -> Result<Arc<JsonFileStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(JsonFileStore::open_default()?))
}

pub fn config_store() -> Result<SyncConfigStore, Box<dyn std::error::Error>> {
    Ok(SyncConfigStore::new(kv_store()?))
}

/// Build a gist-backed engine from stored settings; fails with a clear
/// message when the connection has not been configured yet.
pub fn build_engine() -> Result<SyncEngine<GistStore>, Box<dyn std::error::Error>> {
    let kv = kv_store()?;
    let config = SyncConfigStore::new(kv.clone());
    let settings = config.load();
    let problems = SyncConfigStore::validate(&settings);
    if !problems.is_empty() {
        return Err(format!("sync is not configured: {}", problems.join(", ")).into());
    }

    let device = get_or_create_device_id().unwrap_or_else(|_| "taskpool".to_string());
    let store =
        GistStore::new(settings.token, settings.gist_id).with_device_name(device.clone());
    Ok(SyncEngine::new(store, kv).with_device_name(device))
}

pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn tasks_file() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(data_dir()?.join("tasks.json"))
}

/// Load the local task list. Missing file means an empty list; foreign
/// records are normalized rather than rejected.
pub fn load_tasks() -> Result<Vec<Task>, Box<dyn std::error::Error>> {
    let path = tasks_file()?;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    let raw: serde_json::Value = serde_json::from_str(&content)?;
    let Some(items) = raw.as_array() else {
        return Err("tasks file must contain an array".into());
    };
    Ok(items
        .iter()
        .map(|t| sanitize::sanitize_task(t, TaskSource::Local))
        .collect())
}

pub fn save_tasks(tasks: &[Task]) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(tasks_file()?, serde_json::to_string_pretty(tasks)?)?;
    Ok(())
}
