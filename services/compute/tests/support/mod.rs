#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use compute::features::models::{
    ContainerSpec, InspectedContainer, RegistryCredentials, RuntimeContainer,
};
use compute::services::deployment::{DeploySettings, DeploymentService};
use compute::services::nginx::ProxyConfigWriter;
use compute::services::runtime::ContainerRuntime;
use shared::utilities::errors::AppError;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub image: String,
    pub running: bool,
    pub host_ports: Vec<u16>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub unreachable: bool,
    pub list: bool,
    pub pull: bool,
    pub start: bool,
    pub stop: bool,
    pub remove: bool,
}

/// In-memory container runtime keyed by container name.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<BTreeMap<String, FakeContainer>>,
    failures: Mutex<Failures>,
    specs: Mutex<Vec<ContainerSpec>>,
    pulls: Mutex<Vec<(String, bool)>>,
    calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, name: &str, host_port: u16, running: bool) {
        let id = format!("seed-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers.lock().unwrap().insert(
            name.to_string(),
            FakeContainer {
                id,
                image: "seed/image:latest".to_string(),
                running,
                host_ports: vec![host_port],
            },
        );
    }

    pub fn fail(&self, update: impl FnOnce(&mut Failures)) {
        update(&mut self.failures.lock().unwrap());
    }

    pub fn containers(&self) -> BTreeMap<String, FakeContainer> {
        self.containers.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// `(image, authenticated)` for every pull.
    pub fn pulls(&self) -> Vec<(String, bool)> {
        self.pulls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Failures {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.failures.lock().unwrap()
    }

    fn not_found(name: &str) -> AppError {
        AppError::NotFoundError(format!("Container {} not found", name))
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), AppError> {
        if self.record_call().unreachable {
            return Err(AppError::DockerUnavailableError {
                hint: "make sure the Docker daemon is running".to_string(),
            });
        }
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, AppError> {
        if self.record_call().list {
            return Err(AppError::container_operation("list", "containers", "timeout"));
        }

        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .map(|(name, c)| RuntimeContainer {
                id: c.id.clone(),
                names: vec![format!("/{}", name)],
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                status: if c.running { "Up 1 second" } else { "Exited (0)" }.to_string(),
                host_ports: c.host_ports.clone(),
                created: Some(1_700_000_000),
            })
            .collect())
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<InspectedContainer>, AppError> {
        self.record_call();
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(name)
            .map(|c| InspectedContainer {
                id: c.id.clone(),
                running: c.running,
            }))
    }

    async fn stop_container(&self, name: &str) -> Result<(), AppError> {
        if self.record_call().stop {
            return Err(AppError::container_operation("stop", name, "timeout"));
        }
        let mut containers = self.containers.lock().unwrap();
        let container = containers.get_mut(name).ok_or_else(|| Self::not_found(name))?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), AppError> {
        if self.record_call().remove {
            return Err(AppError::container_operation(
                "remove",
                name,
                "removal already in progress",
            ));
        }
        self.containers
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn pull_image(
        &self,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), AppError> {
        if self.record_call().pull {
            return Err(AppError::image_pull(image, "pull access denied"));
        }
        self.pulls
            .lock()
            .unwrap()
            .push((image.to_string(), credentials.is_some()));
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, AppError> {
        self.record_call();
        let mut containers = self.containers.lock().unwrap();

        // Docker answers 409 for a name that is still taken.
        if containers.contains_key(&spec.name) {
            return Err(AppError::container_operation(
                "create",
                &spec.name,
                "name already in use",
            ));
        }

        let id = format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        containers.insert(
            spec.name.clone(),
            FakeContainer {
                id: id.clone(),
                image: spec.image.clone(),
                running: false,
                host_ports: vec![spec.host_port],
            },
        );
        self.specs.lock().unwrap().push(spec.clone());

        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), AppError> {
        if self.record_call().start {
            return Err(AppError::container_operation("start", id, "exec format error"));
        }

        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .values_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        container.running = true;
        Ok(())
    }
}

pub fn settings(min: u16, max: u16) -> DeploySettings {
    DeploySettings {
        public_url_scheme: "http".to_string(),
        port_range_min: min,
        port_range_max: max,
        memory_limit_mb: 512,
        credentials: None,
    }
}

/// Reload command that always succeeds on Unix hosts.
pub fn reload_ok() -> Vec<String> {
    vec!["true".to_string()]
}

pub fn reload_missing() -> Vec<String> {
    vec![
        "/nonexistent/bin/nginx".to_string(),
        "-s".to_string(),
        "reload".to_string(),
    ]
}

pub fn service(
    runtime: &Arc<FakeRuntime>,
    config_dir: &Path,
    reload: Vec<String>,
    settings: DeploySettings,
) -> DeploymentService {
    let proxy = ProxyConfigWriter::new(config_dir, "apps.test", reload);
    DeploymentService::new(runtime.clone(), proxy, settings)
}
