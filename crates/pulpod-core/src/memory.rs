//! In-memory container backend.
//!
//! Implements [`ContainerManager`] over a simulated daemon that enforces the
//! same lifecycle rules podman does: duplicate names are rejected, starting a
//! running container or stopping a stopped one fails, removed ids are gone.
//! Useful for testing callers without a container daemon.

use crate::config::PullPolicy;
use crate::error::{CoreError, Result};
use crate::manager::ContainerManager;
use crate::types::{is_owned, ContainerId, ContainerInfo, ContainerSpec, ContainerState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Record {
    id: ContainerId,
    name: String,
    image: String,
    labels: BTreeMap<String, String>,
    state: ContainerState,
    created: DateTime<Utc>,
}

impl Record {
    fn info(&self) -> ContainerInfo {
        ContainerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            state: self.state.clone(),
            labels: self.labels.clone(),
            created: Some(self.created),
        }
    }
}

#[derive(Debug, Default)]
struct Daemon {
    containers: Vec<Record>,
    local_images: HashSet<String>,
    registry: HashSet<String>,
    pulls: usize,
}

impl Daemon {
    fn find_mut(&mut self, key: &str) -> Result<&mut Record> {
        self.containers
            .iter_mut()
            .find(|c| c.id.as_str() == key || c.name == key)
            .ok_or_else(|| no_such_container(key))
    }

    fn insert(&mut self, spec: ContainerSpec) -> Result<ContainerId> {
        if self.containers.iter().any(|c| c.name == spec.name) {
            return Err(CoreError::Backend(format!(
                "the container name {:?} is already in use",
                spec.name
            )));
        }

        let id = ContainerId::from_string(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ));
        self.containers.push(Record {
            id: id.clone(),
            name: spec.name,
            image: spec.image,
            labels: spec.labels,
            state: ContainerState::Created,
            created: Utc::now(),
        });
        Ok(id)
    }
}

fn no_such_container(key: &str) -> CoreError {
    CoreError::NotFound(format!("no container with name or ID {key:?} found"))
}

/// [`ContainerManager`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryManager {
    daemon: Mutex<Daemon>,
    pull_policy: PullPolicy,
}

impl InMemoryManager {
    /// Create an empty backend: no images, no containers, nothing pullable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an image into the local store.
    pub fn with_local_image(mut self, image: impl Into<String>) -> Self {
        self.daemon.get_mut().local_images.insert(image.into());
        self
    }

    /// Make an image pullable.
    pub fn with_registry_image(mut self, image: impl Into<String>) -> Self {
        self.daemon.get_mut().registry.insert(image.into());
        self
    }

    /// Set the pull policy.
    pub fn with_pull_policy(mut self, policy: PullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    /// Add a container that pulpod did not create (no ownership label).
    pub async fn insert_foreign_container(
        &self,
        image: &str,
        name: &str,
    ) -> Result<ContainerId> {
        let spec = ContainerSpec {
            image: image.to_string(),
            name: name.to_string(),
            labels: BTreeMap::new(),
            command: vec!["/bin/sh".to_string()],
        };
        self.daemon.lock().await.insert(spec)
    }

    /// Number of pulls issued so far.
    pub async fn pull_count(&self) -> usize {
        self.daemon.lock().await.pulls
    }
}

#[async_trait]
impl ContainerManager for InMemoryManager {
    fn flavor(&self) -> &'static str {
        "memory"
    }

    fn pull_policy(&self) -> PullPolicy {
        self.pull_policy
    }

    async fn create_container(&self, image: &str, name: &str) -> Result<ContainerId> {
        self.prepare_image(image).await?;

        let mut daemon = self.daemon.lock().await;
        if !daemon.local_images.contains(image) {
            return Err(CoreError::NotFound(format!("{image}: image not known")));
        }

        let id = daemon.insert(ContainerSpec::owned(image, name))?;
        tracing::info!(%id, name, "Container created");
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let mut daemon = self.daemon.lock().await;
        let record = daemon.find_mut(id)?;
        if record.state == ContainerState::Running {
            return Err(CoreError::Backend(format!(
                "container {id} is already running"
            )));
        }
        record.state = ContainerState::Running;
        tracing::info!(id, "Container started");
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let mut daemon = self.daemon.lock().await;
        let record = daemon.find_mut(id)?;
        if record.state != ContainerState::Running {
            return Err(CoreError::Backend(format!(
                "container {id} is not running (state: {})",
                record.state
            )));
        }
        record.state = ContainerState::Stopped;
        tracing::info!(id, "Container stopped");
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let mut daemon = self.daemon.lock().await;
        let before = daemon.containers.len();
        daemon
            .containers
            .retain(|c| c.id.as_str() != id && c.name != id);
        if daemon.containers.len() == before {
            return Err(no_such_container(id));
        }
        tracing::info!(id, "Container removed");
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let mut daemon = self.daemon.lock().await;
        daemon.pulls += 1;
        if !daemon.registry.contains(image) {
            return Err(CoreError::Backend(format!(
                "pull image {image}: manifest unknown"
            )));
        }
        daemon.local_images.insert(image.to_string());
        tracing::info!(image, "Image pulled");
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        Ok(self.daemon.lock().await.local_images.contains(image))
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo> {
        let mut daemon = self.daemon.lock().await;
        Ok(daemon.find_mut(id)?.info())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let daemon = self.daemon.lock().await;
        Ok(daemon
            .containers
            .iter()
            .filter(|c| is_owned(&c.labels))
            .map(|c| c.name.clone())
            .collect())
    }

    async fn version(&self) -> Result<String> {
        Ok(format!("memory-{}", env!("CARGO_PKG_VERSION")))
    }
}
