//! Container manager trait.

use crate::config::PullPolicy;
use crate::error::{CoreError, Result};
use crate::types::{ContainerId, ContainerInfo};
use async_trait::async_trait;

/// Capability set for driving containers through a backend daemon.
///
/// This abstraction allows different backends (podman, the in-memory test
/// backend) to be swapped without changing callers. Every operation is one
/// round trip to the daemon and returns the daemon's verdict unchanged: no
/// retries, no state reconciliation.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    /// Short name of the backend flavor.
    fn flavor(&self) -> &'static str;

    /// Pull policy applied before each create.
    fn pull_policy(&self) -> PullPolicy;

    /// Create an idle container owned by pulpod.
    ///
    /// # Arguments
    /// * `image` - Image reference to run
    /// * `name` - Container name, unique within the daemon
    ///
    /// # Returns
    /// The daemon-assigned container ID.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] if the image cannot be resolved,
    /// [`CoreError::Backend`] for any other rejection (e.g. duplicate name).
    async fn create_container(&self, image: &str, name: &str) -> Result<ContainerId>;

    /// Start a created or stopped container.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] for an unknown id; [`CoreError::Backend`] if the
    /// daemon refuses, including when the container is already running.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Stop a running container.
    ///
    /// # Errors
    /// Same as [`ContainerManager::start_container`]; stopping a container
    /// that is not running is an error.
    async fn stop_container(&self, id: &str) -> Result<()>;

    /// Force-remove a container and everything depending on it.
    ///
    /// After success the id is gone; further operations on it fail with
    /// [`CoreError::NotFound`].
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Pull an image into the daemon's local store.
    ///
    /// # Errors
    /// [`CoreError::Backend`] wrapping any registry or daemon failure.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Check whether an image is present in the daemon's local store.
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Inspect a container by id or name.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] for an unknown id.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo>;

    /// List the names of pulpod-owned containers, running or not.
    ///
    /// Containers without the ownership label are never returned.
    async fn list(&self) -> Result<Vec<String>>;

    /// Version string reported by the daemon.
    async fn version(&self) -> Result<String>;

    /// Make `image` available according to the manager's pull policy.
    ///
    /// Backends call this at the start of [`ContainerManager::create_container`].
    ///
    /// # Errors
    /// With [`PullPolicy::Always`] a failed pull is returned as is. With
    /// [`PullPolicy::IfMissing`] a missing image that cannot be pulled is
    /// reported as [`CoreError::NotFound`].
    async fn prepare_image(&self, image: &str) -> Result<()> {
        match self.pull_policy() {
            PullPolicy::Never => Ok(()),
            PullPolicy::Always => self.pull_image(image).await,
            PullPolicy::IfMissing => {
                if self.image_exists(image).await? {
                    tracing::debug!(image, "Image present locally, skipping pull");
                    return Ok(());
                }

                self.pull_image(image).await.map_err(|e| match e {
                    CoreError::Backend(msg) => {
                        CoreError::NotFound(format!("image {image} is not available: {msg}"))
                    }
                    other => other,
                })
            }
        }
    }
}
