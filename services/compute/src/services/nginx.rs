use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use shared::utilities::{config::Config, errors::AppError};
use tokio::{fs, process::Command};
use tracing::{debug, info, warn};

use crate::features::implementations::{validate_port, validate_subdomain};
use crate::features::models::ProxyRoute;

static PROXY_PASS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"proxy_pass\s+http://localhost:(\d+)").expect("proxy_pass pattern is a valid regex")
});

const CONFIG_EXTENSION: &str = "conf";

/// Result of persisting a route. The file is authoritative even when the
/// reload did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub reloaded: bool,
}

/// Persists one nginx virtual host per subdomain and signals nginx to reload.
#[derive(Clone, Debug)]
pub struct ProxyConfigWriter {
    config_dir: PathBuf,
    base_domain: String,
    reload_command: Vec<String>,
}

impl ProxyConfigWriter {
    pub fn new(
        config_dir: impl Into<PathBuf>,
        base_domain: impl Into<String>,
        reload_command: Vec<String>,
    ) -> Self {
        Self {
            config_dir: config_dir.into(),
            base_domain: base_domain.into(),
            reload_command,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.nginx_config_dir.clone(),
            config.base_domain.clone(),
            config.nginx_reload_command.clone(),
        )
    }

    pub fn host_name(&self, subdomain: &str) -> String {
        format!("{}.{}", subdomain, self.base_domain)
    }

    pub fn config_path(&self, subdomain: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}.{}", subdomain, CONFIG_EXTENSION))
    }

    /// Plain HTTP virtual host with upgrade headers passed through so
    /// websockets and other long-lived streams work. TLS, if any, terminates
    /// in front of nginx.
    pub fn render(&self, subdomain: &str, port: u16) -> String {
        format!(
            r#"server {{
    listen 80;
    listen [::]:80;
    server_name {host};

    location / {{
        proxy_pass http://localhost:{port};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection "upgrade";
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_cache_bypass $http_upgrade;
        proxy_read_timeout 86400;
    }}
}}
"#,
            host = self.host_name(subdomain),
            port = port,
        )
    }

    /// Persists the route for `subdomain`, then reloads. A failed reload is
    /// reported through `WriteOutcome::reloaded`, never as an error.
    pub async fn write(&self, subdomain: &str, port: u16) -> Result<WriteOutcome, AppError> {
        validate_subdomain(subdomain)?;
        validate_port(port)?;

        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| AppError::proxy_config(subdomain, format!("create {}: {}", self.config_dir.display(), e)))?;

        let path = self.config_path(subdomain);
        let staging = path.with_extension("conf.tmp");

        fs::write(&staging, self.render(subdomain, port))
            .await
            .map_err(|e| AppError::proxy_config(subdomain, format!("write {}: {}", staging.display(), e)))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| AppError::proxy_config(subdomain, format!("rename {}: {}", path.display(), e)))?;

        info!(subdomain = %subdomain, port, path = %path.display(), "Wrote proxy config");

        let reloaded = self.reload().await;

        Ok(WriteOutcome { path, reloaded })
    }

    /// Deletes the route for `subdomain` and reloads. Returns whether the
    /// reload went through.
    pub async fn remove(&self, subdomain: &str) -> Result<bool, AppError> {
        validate_subdomain(subdomain)?;

        let path = self.config_path(subdomain);

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFoundError(format!(
                    "Proxy config for {} not found",
                    subdomain
                )));
            }
            Err(e) => {
                return Err(AppError::proxy_config(
                    subdomain,
                    format!("remove {}: {}", path.display(), e),
                ));
            }
        }

        info!(subdomain = %subdomain, path = %path.display(), "Removed proxy config");

        Ok(self.reload().await)
    }

    /// Reads every route back from disk. A missing directory means no routes.
    pub async fn list(&self) -> Result<Vec<ProxyRoute>, AppError> {
        let mut entries = match fs::read_dir(&self.config_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut routes = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(CONFIG_EXTENSION) {
                continue;
            }

            let Some(subdomain) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_subdomain(subdomain).is_err() {
                continue;
            }

            let content = fs::read_to_string(&path).await?;

            match parse_port(&content) {
                Some(port) => routes.push(ProxyRoute {
                    subdomain: subdomain.to_string(),
                    port,
                    path: path.clone(),
                }),
                None => warn!(path = %path.display(), "Proxy config has no proxy_pass directive"),
            }
        }

        routes.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));

        Ok(routes)
    }

    /// Runs the reload command. Failures are logged and reported as `false`.
    pub async fn reload(&self) -> bool {
        let Some((program, args)) = self.reload_command.split_first() else {
            warn!("No nginx reload command configured, reload manually");
            return false;
        };

        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                debug!(command = %self.reload_command.join(" "), "Reloaded nginx");
                true
            }
            Ok(output) => {
                warn!(
                    command = %self.reload_command.join(" "),
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Nginx reload failed, config is persisted; reload manually"
                );
                false
            }
            Err(e) => {
                warn!(
                    command = %self.reload_command.join(" "),
                    error = %e,
                    "Could not run nginx reload, config is persisted; reload manually"
                );
                false
            }
        }
    }
}

pub fn parse_port(content: &str) -> Option<u16> {
    PROXY_PASS_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .and_then(|port| port.as_str().parse().ok())
}
