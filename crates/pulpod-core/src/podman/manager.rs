use super::client::LibpodClient;
use crate::config::{BackendConfig, PullPolicy};
use crate::connection::Connection;
use crate::error::Result;
use crate::manager::ContainerManager;
use crate::types::{is_owned, ContainerId, ContainerInfo, ContainerSpec, ContainerState};
use async_trait::async_trait;

/// [`ContainerManager`] backed by a podman service socket.
#[derive(Debug, Clone)]
pub struct PodmanManager {
    client: LibpodClient,
    pull_policy: PullPolicy,
}

impl PodmanManager {
    /// Validate the configured socket and connect to the podman service.
    ///
    /// # Errors
    /// Returns a Config error for a malformed socket, and a Connection error if
    /// the socket path is missing or the daemon does not answer the handshake.
    pub async fn connect(config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        let uri = config.socket_uri()?;

        let connection = Connection::open(&uri, config.timeout())
            .await
            .map_err(|e| {
                tracing::error!(socket = %uri, error = %e, "Failed to connect to podman");
                e
            })?;

        Ok(Self {
            client: LibpodClient::new(connection, config.pull_timeout()),
            pull_policy: config.pull_policy,
        })
    }
}

#[async_trait]
impl ContainerManager for PodmanManager {
    fn flavor(&self) -> &'static str {
        "podman"
    }

    fn pull_policy(&self) -> PullPolicy {
        self.pull_policy
    }

    async fn create_container(&self, image: &str, name: &str) -> Result<ContainerId> {
        tracing::info!(image, name, "Creating podman container");
        self.prepare_image(image).await?;

        let spec = ContainerSpec::owned(image, name);
        let created = self.client.create(&spec).await.map_err(|e| {
            tracing::error!(name, error = %e, "Failed to create podman container");
            e
        })?;

        tracing::info!(id = %created.id, name, "Podman container created");
        Ok(ContainerId::from_string(created.id))
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        tracing::info!(id, "Starting podman container");
        self.client.start(id).await?;
        tracing::info!(id, "Podman container started");
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        tracing::info!(id, "Stopping podman container");
        self.client.stop(id).await?;
        tracing::info!(id, "Podman container stopped");
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        tracing::info!(id, "Removing podman container");
        let removed = self.client.remove(id).await?;
        tracing::info!(id, removed = removed.len(), "Podman container removed");
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        tracing::info!(image, "Pulling image");
        let images = self.client.pull(image).await?;
        tracing::info!(image, ?images, "Image pulled");
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        self.client.image_exists(image).await
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo> {
        let inspect = self.client.inspect(id).await?;
        let labels = inspect
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default();

        let state = match ContainerState::from_status(&inspect.state.status) {
            ContainerState::Other(_) if inspect.state.running => ContainerState::Running,
            state => state,
        };

        Ok(ContainerInfo {
            id: ContainerId::from_string(inspect.id),
            name: inspect.name,
            image: inspect.image_name,
            state,
            labels,
            created: inspect.created,
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let containers = self.client.list_owned().await?;
        let total = containers.len();

        // Re-apply the ownership filter on top of the daemon's.
        let names: Vec<String> = containers
            .iter()
            .filter(|c| c.labels.as_ref().is_some_and(|labels| is_owned(labels)))
            .filter_map(|c| c.name().map(str::to_string))
            .collect();

        tracing::debug!(total, owned = names.len(), "Listed podman containers");
        Ok(names)
    }

    async fn version(&self) -> Result<String> {
        self.client.version().await
    }
}
