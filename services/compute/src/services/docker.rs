use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use futures::StreamExt;
use shared::utilities::errors::AppError;
use tracing::{debug, info};

use crate::features::implementations::split_image_reference;
use crate::features::models::{
    ContainerSpec, InspectedContainer, RegistryCredentials, RuntimeContainer,
};
use crate::services::runtime::ContainerRuntime;

/// Seconds the runtime waits for a graceful stop before killing.
const STOP_TIMEOUT_SECS: i64 = 10;

/// Remediation hint for an unreachable daemon, matching the platform's
/// default transport.
pub fn platform_hint() -> &'static str {
    if cfg!(windows) {
        "make sure Docker Desktop is running and the named pipe //./pipe/docker_engine is available"
    } else {
        "make sure the Docker daemon is running and /var/run/docker.sock is accessible \
         (start it with `sudo systemctl start docker` and add this user to the docker group), \
         or point DOCKER_HOST at a reachable endpoint"
    }
}

#[derive(Clone)]
pub struct DockerRuntime {
    pub client: Docker,
}

impl DockerRuntime {
    /// Builds a client from the local defaults, honouring `DOCKER_HOST`.
    /// No request is made until the first operation.
    pub fn new() -> Result<Self, AppError> {
        let client = Docker::connect_with_local_defaults().map_err(|e| {
            AppError::DockerUnavailableError {
                hint: format!("{}; {}", e, platform_hint()),
            }
        })?;

        Ok(Self { client })
    }
}

fn status_code(error: &BollardError) -> Option<u16> {
    match error {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn runtime_error(operation: &str, target: &str, error: BollardError) -> AppError {
    match status_code(&error) {
        Some(404) => AppError::NotFoundError(format!("Container {} not found", target)),
        _ => AppError::container_operation(operation, target, error),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), AppError> {
        self.client
            .ping()
            .await
            .map_err(|e| AppError::DockerUnavailableError {
                hint: format!("{}; {}", e, platform_hint()),
            })?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, AppError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| AppError::container_operation("list", "containers", e))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let mut host_ports: Vec<u16> = c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|p| p.public_port)
                    .collect();
                // IPv4 and IPv6 bindings are reported separately.
                host_ports.sort_unstable();
                host_ports.dedup();

                RuntimeContainer {
                    id: c.id.unwrap_or_default(),
                    names: c.names.unwrap_or_default(),
                    image: c.image.unwrap_or_default(),
                    state: c.state.unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    host_ports,
                    created: c.created,
                }
            })
            .collect())
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<InspectedContainer>, AppError> {
        match self
            .client
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => Ok(Some(InspectedContainer {
                id: response.id.unwrap_or_default(),
                running: response
                    .state
                    .and_then(|state| state.running)
                    .unwrap_or(false),
            })),
            Err(e) if status_code(&e) == Some(404) => Ok(None),
            Err(e) => Err(AppError::container_operation("inspect", name, e)),
        }
    }

    async fn stop_container(&self, name: &str) -> Result<(), AppError> {
        let options = StopContainerOptions {
            t: STOP_TIMEOUT_SECS,
        };

        match self.client.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(e) if status_code(&e) == Some(304) => {
                debug!(container = %name, "Container was already stopped");
                Ok(())
            }
            Err(e) => Err(runtime_error("stop", name, e)),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<(), AppError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.client
            .remove_container(name, Some(options))
            .await
            .map_err(|e| runtime_error("remove", name, e))
    }

    async fn pull_image(
        &self,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), AppError> {
        let (repository, tag) = split_image_reference(image);

        let options = CreateImageOptions {
            from_image: repository,
            tag,
            ..Default::default()
        };

        let credentials = credentials.map(|c| DockerCredentials {
            username: Some(c.username.clone()),
            password: Some(c.password.clone()),
            serveraddress: c.server_address.clone(),
            ..Default::default()
        });

        let mut stream = self.client.create_image(Some(options), None, credentials);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!(image = %image, status = %status, "Pull progress");
                    }
                }
                Err(e) => return Err(AppError::image_pull(image, e)),
            }
        }

        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, AppError> {
        let port_key = format!("{}/tcp", spec.internal_port);

        let exposed_ports: HashMap<String, HashMap<(), ()>> =
            HashMap::from([(port_key.clone(), HashMap::new())]);

        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::from([(
            port_key,
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(spec.host_port.to_string()),
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            memory: Some(spec.limits.memory_bytes),
            memory_swap: Some(spec.limits.memory_swap_bytes),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                maximum_retry_count: None,
            }),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .client
            .create_container(Some(options), config)
            .await
            .map_err(|e| AppError::container_operation("create", &spec.name, e))?;

        info!(
            container = %spec.name,
            id = %response.id,
            "Created container"
        );

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), AppError> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| AppError::container_operation("start", id, e))
    }
}
