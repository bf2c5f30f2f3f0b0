use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use shared::utilities::errors::AppError;
use tracing::{debug, warn};

use crate::services::runtime::ContainerRuntime;

/// Random draws attempted before falling back to a linear scan.
pub const PROBE_ATTEMPTS: usize = 100;

/// Picks host ports that no existing container has bound.
///
/// The set of used ports is re-derived from the runtime on every call, so a
/// port is free again as soon as its container is removed. Two concurrent
/// allocations can still pick the same port between the check and the
/// container create.
#[derive(Clone)]
pub struct PortAllocator {
    runtime: Arc<dyn ContainerRuntime>,
}

impl PortAllocator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn allocate(&self, min: u16, max: u16) -> Result<u16, AppError> {
        validate_range(min, max)?;

        let used = match self.ports_in_use(min, max).await {
            Ok(used) => used,
            Err(e) => {
                // Could not check: hand out an unchecked candidate instead of failing.
                let port = rand::rng().random_range(min..=max);
                warn!(
                    error = %e,
                    port,
                    "Could not list container port bindings, allocating without collision check"
                );
                return Ok(port);
            }
        };

        let port = pick_free(&used, min, max, &mut rand::rng())?;
        debug!(port, in_use = used.len(), "Allocated host port");
        Ok(port)
    }

    /// Host ports in `[min, max]` bound by any container, running or stopped.
    pub async fn ports_in_use(&self, min: u16, max: u16) -> Result<HashSet<u16>, AppError> {
        let containers = self.runtime.list_containers().await?;

        Ok(containers
            .iter()
            .flat_map(|c| c.host_ports.iter().copied())
            .filter(|port| (min..=max).contains(port))
            .collect())
    }
}

fn validate_range(min: u16, max: u16) -> Result<(), AppError> {
    if min == 0 || min > max {
        return Err(AppError::ValidationError(format!(
            "Invalid port range {}-{}",
            min, max
        )));
    }
    Ok(())
}

/// Random probing first, then a linear scan from `min`.
pub fn pick_free<R: Rng + ?Sized>(
    used: &HashSet<u16>,
    min: u16,
    max: u16,
    rng: &mut R,
) -> Result<u16, AppError> {
    for _ in 0..PROBE_ATTEMPTS {
        let candidate = rng.random_range(min..=max);
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }

    (min..=max)
        .find(|port| !used.contains(port))
        .ok_or(AppError::PortExhaustedError { min, max })
}
