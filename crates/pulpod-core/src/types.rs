//! Domain types shared by every container backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label key attached to every container created by pulpod.
pub const OWNERSHIP_LABEL_KEY: &str = "pulpodControlled";

/// Value of the ownership label.
pub const OWNERSHIP_LABEL_VALUE: &str = "true";

/// Command every managed container runs, keeping it alive as an idle placeholder.
pub const IDLE_COMMAND: [&str; 2] = ["sleep", "infinity"];

/// Daemon-assigned container identifier.
///
/// Opaque to pulpod: it is whatever the backend returned from a create call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Create a container ID from a string.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> String {
        id.0
    }
}

/// Creation request for a managed container.
///
/// Serializes to the field names of podman's `SpecGenerator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    /// Image reference to run.
    pub image: String,
    /// Caller-assigned name, unique within the daemon.
    pub name: String,
    /// Labels; always contains the ownership label.
    pub labels: BTreeMap<String, String>,
    /// Entrypoint command.
    pub command: Vec<String>,
}

impl ContainerSpec {
    /// Build the spec for a pulpod-owned idle container.
    pub fn owned(image: impl Into<String>, name: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            OWNERSHIP_LABEL_KEY.to_string(),
            OWNERSHIP_LABEL_VALUE.to_string(),
        );

        Self {
            image: image.into(),
            name: name.into(),
            labels,
            command: IDLE_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Check whether a label set marks a container as pulpod-owned.
pub fn is_owned<'a, I>(labels: I) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    labels
        .into_iter()
        .any(|(k, v)| k == OWNERSHIP_LABEL_KEY && v == OWNERSHIP_LABEL_VALUE)
}

/// The `key=value` form of the ownership label used in daemon-side filters.
pub fn ownership_filter() -> String {
    format!("{}={}", OWNERSHIP_LABEL_KEY, OWNERSHIP_LABEL_VALUE)
}

/// Lifecycle state of a container as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// Created but never started
    Created,
    /// Running
    Running,
    /// Paused
    Paused,
    /// Exited or stopped
    Stopped,
    /// Any state pulpod does not model (e.g. "removing", "dead")
    Other(String),
}

impl ContainerState {
    /// Map a daemon status string onto a state.
    pub fn from_status(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "created" | "configured" | "initialized" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "exited" | "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Paused => write!(f, "paused"),
            ContainerState::Stopped => write!(f, "stopped"),
            ContainerState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Result of inspecting a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Daemon-assigned id
    pub id: ContainerId,
    /// Container name
    pub name: String,
    /// Image the container was created from
    pub image: String,
    /// Current state
    pub state: ContainerState,
    /// Labels attached at creation
    pub labels: BTreeMap<String, String>,
    /// Creation time, when the daemon reports one
    pub created: Option<DateTime<Utc>>,
}

impl ContainerInfo {
    /// Check if the container is running.
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }

    /// Check if the container carries the ownership label.
    pub fn is_owned(&self) -> bool {
        is_owned(&self.labels)
    }
}
