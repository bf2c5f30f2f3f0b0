use std::sync::Arc;

use chrono::DateTime;
use shared::utilities::errors::AppError;
use tracing::{debug, info};

use crate::features::models::{
    ContainerSpec, ManagedContainer, RegistryCredentials, RuntimeContainer,
    subdomain_from_container_name,
};
use crate::services::runtime::ContainerRuntime;

/// Container lifecycle operations keyed by the deterministic
/// `container-<subdomain>` name.
#[derive(Clone)]
pub struct ContainerService {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Fails fast with a remediation hint when the runtime is unreachable.
    pub async fn ensure_reachable(&self) -> Result<(), AppError> {
        self.runtime.ping().await
    }

    /// Stops and removes `name` if it exists. Returns whether anything was torn down.
    pub async fn ensure_absent(&self, name: &str) -> Result<bool, AppError> {
        let Some(existing) = self.runtime.inspect_container(name).await? else {
            debug!(container = %name, "No existing container");
            return Ok(false);
        };

        self.teardown(name, existing.running).await?;
        Ok(true)
    }

    /// Stops and removes `name`. A missing container is an error here.
    pub async fn remove(&self, name: &str) -> Result<(), AppError> {
        let existing = self
            .runtime
            .inspect_container(name)
            .await?
            .ok_or_else(|| AppError::NotFoundError(format!("Container {} not found", name)))?;

        self.teardown(name, existing.running).await
    }

    async fn teardown(&self, name: &str, running: bool) -> Result<(), AppError> {
        if running {
            self.runtime.stop_container(name).await?;
            info!(container = %name, "Stopped container");
        }

        self.runtime.remove_container(name).await?;
        info!(container = %name, "Removed container");

        Ok(())
    }

    pub async fn pull_image(
        &self,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), AppError> {
        info!(
            image = %image,
            authenticated = credentials.is_some(),
            "Pulling image"
        );
        self.runtime.pull_image(image, credentials).await?;
        info!(image = %image, "Pulled image");
        Ok(())
    }

    /// Creates the container described by `spec`, starts it and returns its id.
    pub async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, AppError> {
        let id = self.runtime.create_container(spec).await?;

        self.runtime.start_container(&id).await?;

        info!(
            container = %spec.name,
            id = %id,
            host_port = spec.host_port,
            internal_port = spec.internal_port,
            "Started container"
        );

        Ok(id)
    }

    /// Every container following the managed naming convention.
    pub async fn list(&self) -> Result<Vec<ManagedContainer>, AppError> {
        let containers = self.runtime.list_containers().await?;

        let mut managed: Vec<ManagedContainer> =
            containers.into_iter().filter_map(to_managed).collect();
        managed.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));

        Ok(managed)
    }
}

fn to_managed(container: RuntimeContainer) -> Option<ManagedContainer> {
    let (name, subdomain) = container.names.iter().find_map(|name| {
        subdomain_from_container_name(name)
            .map(|subdomain| (name.trim_start_matches('/').to_string(), subdomain.to_string()))
    })?;

    Some(ManagedContainer {
        id: container.id,
        name,
        subdomain,
        image: container.image,
        state: container.state,
        status: container.status,
        host_port: container.host_ports.first().copied(),
        created_at: container
            .created
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    })
}
