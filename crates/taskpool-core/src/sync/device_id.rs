// Stable per-installation identity, stamped into uploaded documents
// as deviceInfo.name. Format: "taskpool-<uuid>".

use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const DEVICE_ID_FILE: &str = "device_id.txt";
const DEVICE_ID_PREFIX: &str = "taskpool-";

#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid device ID format: {0}")]
    InvalidFormat(String),
}

/// Read the device ID stored under `path`, creating one on first use.
pub fn get_or_create_device_id_at(path: &Path) -> Result<String, DeviceIdError> {
    let device_id_path = path.join(DEVICE_ID_FILE);

    if device_id_path.exists() {
        let content = fs::read_to_string(&device_id_path)?;
        let device_id = content.trim().to_string();
        if device_id.starts_with(DEVICE_ID_PREFIX) {
            return Ok(device_id);
        }
        return Err(DeviceIdError::InvalidFormat(device_id));
    }

    let device_id = format!("{}{}", DEVICE_ID_PREFIX, Uuid::new_v4());

    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    let mut file = fs::File::create(&device_id_path)?;
    writeln!(file, "{}", device_id)?;

    Ok(device_id)
}

/// Device ID under the default data directory.
pub fn get_or_create_device_id() -> Result<String, DeviceIdError> {
    let dir = crate::storage::data_dir()
        .map_err(|e| DeviceIdError::Io(std::io::Error::other(e.to_string())))?;
    get_or_create_device_id_at(&dir)
}
