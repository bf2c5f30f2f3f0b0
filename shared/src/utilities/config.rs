use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use tokio::fs;
use tracing::Level;

use crate::utilities::errors::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_address: String,

    pub base_domain: String,
    pub public_url_scheme: String,

    pub tracing_level: Level,

    // NGINX
    pub nginx_config_dir: PathBuf,
    pub nginx_reload_command: Vec<String>,

    // CONTAINERS
    pub port_range_min: u16,
    pub port_range_max: u16,
    pub container_memory_limit_mb: u64,

    // REGISTRY
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub registry_server: Option<String>,
}

impl Config {
    pub async fn init() -> Result<Self, AppError> {
        let server_address = get_config_value(
            "SERVER_ADDRESS",
            Some("SERVER_ADDRESS"),
            None,
            Some("0.0.0.0:8001".to_string()),
        )
        .await?
        .ok_or_else(|| AppError::EnvironmentVariableNotSetError("SERVER_ADDRESS".to_string()))?;

        let base_domain = get_config_value(
            "BASE_DOMAIN",
            Some("BASE_DOMAIN"),
            None,
            Some("localhost".to_string()),
        )
        .await?
        .ok_or_else(|| AppError::EnvironmentVariableNotSetError("BASE_DOMAIN".to_string()))?;

        let public_url_scheme = get_config_value(
            "PUBLIC_URL_SCHEME",
            Some("PUBLIC_URL_SCHEME"),
            None,
            Some("http".to_string()),
        )
        .await?
        .ok_or_else(|| {
            AppError::EnvironmentVariableNotSetError("PUBLIC_URL_SCHEME".to_string())
        })?;

        let tracing_level = get_config_value(
            "TRACING_LEVEL",
            Some("TRACING_LEVEL"),
            None,
            Some(Level::DEBUG),
        )
        .await?
        .ok_or_else(|| AppError::EnvironmentVariableNotSetError("TRACING_LEVEL".to_string()))?;

        let nginx_config_dir = get_config_value(
            "NGINX_CONFIG_DIR",
            Some("NGINX_CONFIG_DIR"),
            None,
            Some(PathBuf::from("/etc/nginx/conf.d")),
        )
        .await?
        .ok_or_else(|| {
            AppError::EnvironmentVariableNotSetError("NGINX_CONFIG_DIR".to_string())
        })?;

        let nginx_reload_command = get_config_value(
            "NGINX_RELOAD_COMMAND",
            Some("NGINX_RELOAD_COMMAND"),
            None,
            Some("nginx -s reload".to_string()),
        )
        .await?
        .ok_or_else(|| {
            AppError::EnvironmentVariableNotSetError("NGINX_RELOAD_COMMAND".to_string())
        })?;
        let nginx_reload_command = parse_command(&nginx_reload_command)?;

        let port_range_min = get_config_value("PORT_RANGE_MIN", Some("PORT_RANGE_MIN"), None, Some(3003))
            .await?
            .ok_or_else(|| AppError::EnvironmentVariableNotSetError("PORT_RANGE_MIN".to_string()))?;
        let port_range_max = get_config_value("PORT_RANGE_MAX", Some("PORT_RANGE_MAX"), None, Some(4000))
            .await?
            .ok_or_else(|| AppError::EnvironmentVariableNotSetError("PORT_RANGE_MAX".to_string()))?;

        let container_memory_limit_mb = get_config_value(
            "CONTAINER_MEMORY_LIMIT_MB",
            Some("CONTAINER_MEMORY_LIMIT_MB"),
            None,
            Some(512),
        )
        .await?
        .ok_or_else(|| {
            AppError::EnvironmentVariableNotSetError("CONTAINER_MEMORY_LIMIT_MB".to_string())
        })?;

        // Registry credentials: Docker secrets → env var
        let registry_username =
            get_config_value("registry_username", Some("REGISTRY_USERNAME"), None, None).await?;
        let registry_password =
            get_config_value("registry_password", Some("REGISTRY_PASSWORD"), None, None).await?;
        let registry_server =
            get_config_value("registry_server", Some("REGISTRY_SERVER"), None, None).await?;

        let config = Config {
            server_address,
            base_domain,
            public_url_scheme,
            tracing_level,
            nginx_config_dir,
            nginx_reload_command,
            port_range_min,
            port_range_max,
            container_memory_limit_mb,
            registry_username,
            registry_password,
            registry_server,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.port_range_min == 0 || self.port_range_min > self.port_range_max {
            return Err(AppError::InvalidConfigError {
                key: "PORT_RANGE_MIN".to_string(),
                reason: format!(
                    "range {}-{} must be non-empty and start above 0",
                    self.port_range_min, self.port_range_max
                ),
            });
        }

        if self.container_memory_limit_mb == 0 {
            return Err(AppError::InvalidConfigError {
                key: "CONTAINER_MEMORY_LIMIT_MB".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Splits a reload command line into program and arguments.
pub fn parse_command(line: &str) -> Result<Vec<String>, AppError> {
    let parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(AppError::InvalidConfigError {
            key: "NGINX_RELOAD_COMMAND".to_string(),
            reason: "command must not be empty".to_string(),
        });
    }
    Ok(parts)
}

/// Try to resolve config value from Docker secrets, env var, or file path.
/// - `secret_name` → filename inside `/run/secrets/`
/// - `env_name` → optional environment variable key
/// - `fallback_path` → fallback file path (checked if exists)
///
/// Returns the first value found, or `fallback` when no source is set. A
/// source that is set but does not parse as `T` is an error.
pub async fn get_config_value<T>(
    secret_name: &str,
    env_name: Option<&str>,
    fallback_path: Option<&PathBuf>,
    fallback: Option<T>,
) -> Result<Option<T>, AppError>
where
    T: FromStr,
{
    // 1. Docker secrets
    let docker_secret = Path::new("/run/secrets").join(secret_name);
    if docker_secret.exists() {
        match fs::read_to_string(&docker_secret).await {
            Ok(content) => return parse_value(secret_name, &content).map(Some),
            Err(e) => {
                return Err(AppError::FileReadError(format!(
                    "Failed to read docker secret at {0}, {e}",
                    docker_secret.display()
                )));
            }
        }
    }

    // 2. Env var
    if let Some(env_key) = env_name
        && let Ok(val) = std::env::var(env_key)
    {
        return parse_value(env_key, &val).map(Some);
    }

    // 3. Fallback file path
    if let Some(path) = fallback_path
        && path.exists()
    {
        match fs::read_to_string(path).await {
            Ok(content) => return parse_value(&path.display().to_string(), &content).map(Some),
            Err(e) => {
                return Err(AppError::FileReadError(format!(
                    "Failed to read fallback file at {}, {}",
                    path.display(),
                    e
                )));
            }
        }
    }

    // 4. Final fallback
    Ok(fallback)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    T::from_str(raw.trim()).map_err(|_| AppError::InvalidConfigError {
        key: key.to_string(),
        reason: format!("cannot parse '{}'", raw.trim()),
    })
}
