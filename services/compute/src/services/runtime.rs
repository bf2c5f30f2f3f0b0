use async_trait::async_trait;
use shared::utilities::errors::AppError;

use crate::features::models::{
    ContainerSpec, InspectedContainer, RegistryCredentials, RuntimeContainer,
};

/// Operations the orchestrator needs from a container runtime endpoint.
///
/// Implementations report a missing container from `inspect_container` as
/// `Ok(None)`; `stop_container` and `remove_container` report it as
/// `AppError::NotFoundError`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lightweight liveness probe. Fails with `AppError::DockerUnavailableError`.
    async fn ping(&self) -> Result<(), AppError>;

    /// All containers, running and stopped.
    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, AppError>;

    async fn inspect_container(&self, name: &str) -> Result<Option<InspectedContainer>, AppError>;

    async fn stop_container(&self, name: &str) -> Result<(), AppError>;

    async fn remove_container(&self, name: &str) -> Result<(), AppError>;

    /// Streams the pull to completion.
    async fn pull_image(
        &self,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), AppError>;

    /// Returns the runtime-assigned container id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, AppError>;

    async fn start_container(&self, id: &str) -> Result<(), AppError>;
}
