//! Backend selection.

use crate::config::BackendConfig;
use crate::error::{CoreError, Result};
use crate::manager::ContainerManager;
use crate::podman::PodmanManager;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported backend flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Podman service over its libpod API
    Podman,
}

impl Flavor {
    /// Configuration name of this flavor.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Podman => "podman",
        }
    }
}

impl FromStr for Flavor {
    type Err = CoreError;

    /// Parse a flavor name (case-insensitive).
    ///
    /// # Errors
    /// Returns [`CoreError::UnsupportedBackend`] for anything but a known flavor.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "podman" => Ok(Flavor::Podman),
            _ => Err(CoreError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the container manager selected by `config.flavor`.
///
/// The flavor is checked before the socket is touched, so an unsupported
/// flavor is reported even when the socket is also wrong.
///
/// # Errors
/// [`CoreError::UnsupportedBackend`] for an unknown flavor, otherwise whatever
/// the backend's connect step returns. No manager is produced on error.
pub async fn select(config: &BackendConfig) -> Result<Arc<dyn ContainerManager>> {
    let flavor: Flavor = config.flavor.parse().map_err(|e| {
        tracing::error!(flavor = %config.flavor, "Unsupported container manager flavor");
        e
    })?;
    tracing::debug!(%flavor, socket = %config.socket, "Selecting container manager");

    match flavor {
        Flavor::Podman => Ok(Arc::new(PodmanManager::connect(config).await?)),
    }
}
