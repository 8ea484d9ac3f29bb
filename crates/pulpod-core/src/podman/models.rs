//! Libpod API types.
//!
//! Only the fields pulpod reads are modelled; everything else in the daemon's
//! replies is ignored. See: <https://docs.podman.io/en/latest/_static/api.html>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error body returned by libpod for non-2xx responses.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Root cause, e.g. "no such container".
    #[serde(default)]
    pub cause: String,
    /// Full error message.
    #[serde(default)]
    pub message: String,
    /// HTTP status echoed by the daemon.
    #[serde(default)]
    pub response: u16,
}

/// Response of `GET /libpod/version`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionResponse {
    /// Server version.
    pub version: String,
    /// API version.
    #[serde(default)]
    pub api_version: String,
}

/// Response of `POST /libpod/containers/create`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateResponse {
    /// Container ID.
    pub id: String,
    /// Warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Entry of `GET /libpod/containers/json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListContainer {
    /// Container ID.
    pub id: String,
    /// Container names.
    #[serde(default)]
    pub names: Vec<String>,
    /// Labels.
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    /// State.
    #[serde(default)]
    pub state: String,
}

impl ListContainer {
    /// Primary name, without the leading slash docker-style APIs add.
    pub fn name(&self) -> Option<&str> {
        self.names.first().map(|n| n.trim_start_matches('/'))
    }
}

/// Response of `GET /libpod/containers/{id}/json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectContainer {
    /// Container ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Image reference the container was created from.
    #[serde(default)]
    pub image_name: String,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// Container state.
    pub state: InspectState,
    /// Container config.
    #[serde(default)]
    pub config: Option<InspectConfig>,
}

/// State section of an inspect response.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectState {
    /// Status (configured, created, running, paused, stopped, exited, removing).
    #[serde(default)]
    pub status: String,
    /// Running.
    #[serde(default)]
    pub running: bool,
}

/// Config section of an inspect response.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectConfig {
    /// Labels.
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Entry of the `DELETE /libpod/containers/{id}` report.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveReport {
    /// Removed container ID.
    #[serde(default)]
    pub id: String,
    /// Per-container error, if any.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

impl RemoveReport {
    /// Error message carried by this report, if it is a non-empty string.
    pub fn error(&self) -> Option<&str> {
        self.err
            .as_ref()
            .and_then(|e| e.as_str())
            .filter(|e| !e.is_empty())
    }
}

/// One object of the `POST /libpod/images/pull` progress stream.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PullReport {
    /// Progress text (empty when `quiet=true`).
    #[serde(default)]
    pub stream: Option<String>,
    /// Set when the pull failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Pulled image IDs, in the final report.
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// ID of the pulled image, in the final report.
    #[serde(default)]
    pub id: Option<String>,
}
