use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every container this service manages.
pub const CONTAINER_PREFIX: &str = "container-";

pub fn container_name(subdomain: &str) -> String {
    format!("{}{}", CONTAINER_PREFIX, subdomain)
}

/// Recovers the subdomain from a runtime-reported container name.
/// Docker reports names with a leading `/`.
pub fn subdomain_from_container_name(name: &str) -> Option<&str> {
    name.trim_start_matches('/')
        .strip_prefix(CONTAINER_PREFIX)
        .filter(|subdomain| !subdomain.is_empty())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Absent,
    Pulling,
    Starting,
    Routed,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Absent => "absent",
            Self::Pulling => "pulling",
            Self::Starting => "starting",
            Self::Routed => "routed",
        };
        f.write_str(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub memory_bytes: i64,
    pub memory_swap_bytes: i64,
}

impl ResourceLimits {
    /// Memory ceiling in MB with swap at twice the ceiling.
    pub fn from_memory_mb(memory_limit_mb: u64) -> Self {
        let memory_bytes = (memory_limit_mb as i64).saturating_mul(1024 * 1024);
        Self {
            memory_bytes,
            memory_swap_bytes: memory_bytes.saturating_mul(2),
        }
    }
}

/// Everything the runtime needs to create one deployment container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub internal_port: u16,
    pub host_port: u16,
    pub limits: ResourceLimits,
}

/// A container as reported by the runtime's list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContainer {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
    pub host_ports: Vec<u16>,
    pub created: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedContainer {
    pub id: String,
    pub running: bool,
}

#[derive(Clone, Default)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub server_address: Option<String>,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("server_address", &self.server_address)
            .finish()
    }
}

/// A container that follows the `container-<subdomain>` naming convention.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedContainer {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub host_port: Option<u16>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A persisted reverse-proxy route read back from the config directory.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRoute {
    pub subdomain: String,
    pub port: u16,
    pub path: PathBuf,
}
