use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process serialization of deploy/remove calls for one subdomain.
/// Calls for different subdomains never wait on each other.
#[derive(Clone, Default)]
pub struct SubdomainLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SubdomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, subdomain: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            // Idle entries are only referenced by the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(subdomain.to_string()).or_default().clone()
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
