use std::collections::HashSet;
use std::sync::Arc;

use shared::utilities::{config::Config, errors::AppError};
use tracing::{debug, error, info, warn};

use crate::features::implementations::{validate_image, validate_port, validate_subdomain};
use crate::features::models::{
    ContainerSpec, DeploymentState, ProxyRoute, RegistryCredentials, ResourceLimits,
    container_name,
};
use crate::features::schemas::{
    DeploymentResponse, DeploymentSummary, HealthResponse, RemoveDeploymentResponse,
};
use crate::services::containers::ContainerService;
use crate::services::locks::SubdomainLocks;
use crate::services::nginx::ProxyConfigWriter;
use crate::services::ports::PortAllocator;
use crate::services::runtime::ContainerRuntime;

#[derive(Clone, Debug)]
pub struct DeploySettings {
    pub public_url_scheme: String,
    pub port_range_min: u16,
    pub port_range_max: u16,
    pub memory_limit_mb: u64,
    pub credentials: Option<RegistryCredentials>,
}

impl DeploySettings {
    pub fn from_config(config: &Config) -> Self {
        // Both halves are required for an authenticated pull.
        let credentials = match (&config.registry_username, &config.registry_password) {
            (Some(username), Some(password)) => Some(RegistryCredentials {
                username: username.clone(),
                password: password.clone(),
                server_address: config.registry_server.clone(),
            }),
            _ => None,
        };

        Self {
            public_url_scheme: config.public_url_scheme.clone(),
            port_range_min: config.port_range_min,
            port_range_max: config.port_range_max,
            memory_limit_mb: config.container_memory_limit_mb,
            credentials,
        }
    }
}

/// Deploys, replaces and removes subdomain workloads.
///
/// Holds no deployment state: every call re-reads the container runtime and
/// the proxy config directory.
#[derive(Clone)]
pub struct DeploymentService {
    containers: ContainerService,
    ports: PortAllocator,
    proxy: ProxyConfigWriter,
    settings: DeploySettings,
    locks: SubdomainLocks,
}

impl DeploymentService {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        proxy: ProxyConfigWriter,
        settings: DeploySettings,
    ) -> Self {
        Self {
            containers: ContainerService::new(runtime.clone()),
            ports: PortAllocator::new(runtime),
            proxy,
            settings,
            locks: SubdomainLocks::new(),
        }
    }

    pub fn from_config(runtime: Arc<dyn ContainerRuntime>, config: &Config) -> Self {
        Self::new(
            runtime,
            ProxyConfigWriter::from_config(config),
            DeploySettings::from_config(config),
        )
    }

    pub fn url(&self, subdomain: &str) -> String {
        format!(
            "{}://{}",
            self.settings.public_url_scheme,
            self.proxy.host_name(subdomain)
        )
    }

    /// Replaces whatever runs under `subdomain` with a fresh container of
    /// `image` and routes the subdomain to it.
    ///
    /// The route is written only after the container has started. If that
    /// write fails the container keeps running unrouted until the next
    /// `deploy` or `remove` for the same subdomain.
    pub async fn deploy(
        &self,
        image: &str,
        subdomain: &str,
        internal_port: u16,
    ) -> Result<DeploymentResponse, AppError> {
        validate_subdomain(subdomain)?;
        validate_image(image)?;
        validate_port(internal_port)?;

        let _guard = self.locks.acquire(subdomain).await;
        let name = container_name(subdomain);

        self.containers.ensure_reachable().await?;

        // 1. Replace, never add
        match self.containers.ensure_absent(&name).await {
            Ok(true) => info!(subdomain = %subdomain, container = %name, "Replacing existing deployment"),
            Ok(false) => {}
            Err(e) => warn!(
                subdomain = %subdomain,
                container = %name,
                error = %e,
                "Could not tear down existing container, continuing with create"
            ),
        }

        // 2. Pull
        log_state(subdomain, DeploymentState::Pulling);
        self.containers
            .pull_image(image, self.settings.credentials.as_ref())
            .await?;

        // 3. Host port
        let host_port = self
            .ports
            .allocate(self.settings.port_range_min, self.settings.port_range_max)
            .await?;

        // 4. Create and start
        log_state(subdomain, DeploymentState::Starting);
        let spec = ContainerSpec {
            name: name.clone(),
            image: image.to_string(),
            internal_port,
            host_port,
            limits: ResourceLimits::from_memory_mb(self.settings.memory_limit_mb),
        };
        let container_id = self.containers.create_and_start(&spec).await?;

        // 5. Route
        let outcome = self.proxy.write(subdomain, host_port).await.inspect_err(|e| {
            error!(
                subdomain = %subdomain,
                container = %name,
                error = %e,
                "Container is running without a route until the next deploy or remove"
            )
        })?;
        log_state(subdomain, DeploymentState::Routed);

        info!(
            subdomain = %subdomain,
            container = %name,
            host_port,
            reloaded = outcome.reloaded,
            "✅ Deployment is live"
        );

        Ok(DeploymentResponse {
            container_id,
            container_name: name,
            subdomain: subdomain.to_string(),
            host_port,
            url: self.url(subdomain),
            state: DeploymentState::Routed,
            reloaded: outcome.reloaded,
        })
    }

    /// Tears down the container and the route for `subdomain`, whichever
    /// exist. Fails with not-found only when neither does.
    pub async fn remove(&self, subdomain: &str) -> Result<RemoveDeploymentResponse, AppError> {
        validate_subdomain(subdomain)?;

        let _guard = self.locks.acquire(subdomain).await;
        let name = container_name(subdomain);

        self.containers.ensure_reachable().await?;

        let container_removed = match self.containers.remove(&name).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };

        let route_removed = match self.proxy.remove(subdomain).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };

        if !container_removed && !route_removed {
            return Err(AppError::NotFoundError(format!(
                "Deployment {} not found",
                subdomain
            )));
        }

        if container_removed != route_removed {
            warn!(
                subdomain = %subdomain,
                container_removed,
                route_removed,
                "Removed a partially deployed subdomain"
            );
        }
        log_state(subdomain, DeploymentState::Absent);

        Ok(RemoveDeploymentResponse {
            subdomain: subdomain.to_string(),
            url: self.url(subdomain),
        })
    }

    /// Managed containers joined with the routes currently on disk.
    pub async fn list(&self) -> Result<Vec<DeploymentSummary>, AppError> {
        self.containers.ensure_reachable().await?;

        let containers = self.containers.list().await?;
        let routes = self.proxy.list().await?;

        let routed: HashSet<(&str, u16)> = routes
            .iter()
            .map(|route| (route.subdomain.as_str(), route.port))
            .collect();

        Ok(containers
            .into_iter()
            .map(|c| {
                let is_routed = c
                    .host_port
                    .is_some_and(|port| routed.contains(&(c.subdomain.as_str(), port)));

                DeploymentSummary {
                    container_id: c.id,
                    routed: is_routed,
                    subdomain: c.subdomain,
                    image: c.image,
                    status: c.status,
                    state: c.state,
                    host_port: c.host_port,
                    created_at: c.created_at,
                }
            })
            .collect())
    }

    pub async fn routes(&self) -> Result<Vec<ProxyRoute>, AppError> {
        self.proxy.list().await
    }

    pub async fn health(&self) -> Result<HealthResponse, AppError> {
        self.containers.ensure_reachable().await?;
        let routes = self.proxy.list().await?;

        Ok(HealthResponse {
            runtime: "reachable".to_string(),
            routes: routes.len(),
        })
    }
}

fn log_state(subdomain: &str, state: DeploymentState) {
    debug!(subdomain = %subdomain, state = %state, "Deployment state");
}
