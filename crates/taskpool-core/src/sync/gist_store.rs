//! GitHub Gist-backed remote document store.
//!
//! The whole task pool lives in a single `taskpool-data.json` file inside
//! one gist: GET reads the gist, PATCH replaces the file's content.

use crate::sync::remote::RemoteStore;
use crate::sync::sanitize;
use crate::sync::types::{CredentialCheck, Snapshot, SyncError};
use crate::task::TaskSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Name of the data file inside the gist.
pub const DATA_FILE: &str = "taskpool-data.json";

const GITHUB_API: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "taskpool";

pub struct GistStore {
    client: Client,
    token: String,
    gist_id: String,
    api_base: String,
    device_name: String,
}

impl GistStore {
    pub fn new(token: impl Into<String>, gist_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            gist_id: gist_id.into(),
            api_base: GITHUB_API.to_string(),
            device_name: USER_AGENT.to_string(),
        }
    }

    /// Override the API base URL. Tests point this at a local mock server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Name stamped into the uploaded document's `deviceInfo`.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_base, self.gist_id)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
    }

    async fn get_gist(&self) -> Result<Value, SyncError> {
        let response = self.authed(self.client.get(self.gist_url())).send().await?;
        let response = check_status(response)?;
        Ok(response.json::<Value>().await?)
    }

    /// PATCH the data file's content with a serialized document.
    async fn patch_file(&self, document: &Value) -> Result<(), SyncError> {
        let mut files = serde_json::Map::new();
        files.insert(
            DATA_FILE.to_string(),
            json!({ "content": serde_json::to_string_pretty(document)? }),
        );
        let body = json!({ "files": files });

        let response = self
            .authed(self.client.patch(self.gist_url()))
            .json(&body)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn write_initial(&self) -> Result<(), SyncError> {
        let initial = json!({
            "tasks": [],
            "lastSync": Utc::now().to_rfc3339(),
            "version": "1.0",
        });
        self.patch_file(&initial).await?;
        info!(file = DATA_FILE, "seeded empty data file");
        Ok(())
    }

    fn file_content<'a>(gist: &'a Value) -> Option<&'a str> {
        gist["files"][DATA_FILE]["content"].as_str()
    }
}

#[async_trait]
impl RemoteStore for GistStore {
    async fn fetch(&self) -> Result<Snapshot, SyncError> {
        let gist = self.get_gist().await?;
        let Some(content) = Self::file_content(&gist) else {
            // Gist exists but holds no data file yet; seed one.
            self.write_initial().await?;
            return Ok(Snapshot::initial());
        };

        let raw: Value = serde_json::from_str(content)
            .map_err(|e| SyncError::DataFormat(format!("stored document is not valid JSON: {e}")))?;
        let snapshot = sanitize::snapshot_from_value(&raw, TaskSource::Remote)?;
        debug!(tasks = snapshot.tasks.len(), "fetched remote snapshot");
        Ok(snapshot)
    }

    async fn create_if_absent(&self) -> Result<(), SyncError> {
        let gist = self.get_gist().await?;
        if Self::file_content(&gist).is_some() {
            return Ok(());
        }
        self.write_initial().await
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<DateTime<Utc>, SyncError> {
        let uploaded_at = Utc::now();
        let mut document = serde_json::to_value(snapshot)?;
        document["lastSync"] = json!(uploaded_at.to_rfc3339());
        document["deviceInfo"] = json!({
            "name": self.device_name,
            "syncTime": uploaded_at.to_rfc3339(),
        });

        self.patch_file(&document).await?;
        info!(tasks = snapshot.tasks.len(), "uploaded snapshot");
        Ok(uploaded_at)
    }

    async fn validate_credentials(&self) -> CredentialCheck {
        match self.get_gist().await {
            Ok(gist) => {
                if Self::file_content(&gist).is_some() {
                    CredentialCheck {
                        valid: true,
                        message: "credentials ok".to_string(),
                    }
                } else {
                    CredentialCheck {
                        valid: false,
                        message: format!("gist has no {DATA_FILE} file"),
                    }
                }
            }
            Err(err) => CredentialCheck {
                valid: false,
                message: err.to_string(),
            },
        }
    }
}

fn check_status(response: Response) -> Result<Response, SyncError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(SyncError::Unauthorized(
            "token is invalid or expired".to_string(),
        )),
        StatusCode::FORBIDDEN => Err(SyncError::Forbidden(
            "token lacks gist access".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(SyncError::NotFound(
            "gist does not exist or is not accessible".to_string(),
        )),
        status if !status.is_success() => Err(SyncError::Other(format!(
            "unexpected status {status} from gist api"
        ))),
        _ => Ok(response),
    }
}
