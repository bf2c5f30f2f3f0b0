use std::fmt::Display;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Environment variable not set error, {0}")]
    EnvironmentVariableNotSetError(String),
    #[error("Invalid config value for {key}, {reason}")]
    InvalidConfigError { key: String, reason: String },
    #[error("File read error, {0}")]
    FileReadError(String),
    #[error("Validation error, {0}")]
    ValidationError(String),
    #[error("Validation errors, {0}")]
    ValidatorValidationErrors(#[from] validator::ValidationErrors),
    #[error("{0}")]
    NotFoundError(String),
    #[error("Container runtime is unreachable, {hint}")]
    DockerUnavailableError { hint: String },
    #[error("Failed to {operation} {target}, {reason}")]
    ContainerOperationError {
        operation: String,
        target: String,
        reason: String,
    },
    #[error("Failed to pull image {image}, {reason}")]
    ImagePullError { image: String, reason: String },
    #[error("No free host port in range {min}-{max}")]
    PortExhaustedError { min: u16, max: u16 },
    #[error("Proxy config error for {subdomain}, {reason}")]
    ProxyConfigError { subdomain: String, reason: String },
    #[error("IO error, {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Wraps a runtime failure with the operation and the container it targeted.
    pub fn container_operation(operation: &str, target: &str, reason: impl Display) -> Self {
        Self::ContainerOperationError {
            operation: operation.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn image_pull(image: &str, reason: impl Display) -> Self {
        Self::ImagePullError {
            image: image.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn proxy_config(subdomain: &str, reason: impl Display) -> Self {
        Self::ProxyConfigError {
            subdomain: subdomain.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFoundError(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::EnvironmentVariableNotSetError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Environment variable not set error, {}", e),
            ),
            Self::InvalidConfigError { key, reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid config value for {key}, {reason}"),
            ),
            Self::FileReadError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
            Self::ValidationError(e) => (StatusCode::UNPROCESSABLE_ENTITY, e),
            Self::ValidatorValidationErrors(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            Self::NotFoundError(e) => (StatusCode::NOT_FOUND, e),
            Self::DockerUnavailableError { hint } => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Container runtime is unreachable, {}", hint),
            ),
            Self::ContainerOperationError {
                operation,
                target,
                reason,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {operation} {target}, {reason}"),
            ),
            Self::ImagePullError { image, reason } => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to pull image {image}, {reason}"),
            ),
            Self::PortExhaustedError { min, max } => (
                StatusCode::CONFLICT,
                format!("No free host port in range {min}-{max}"),
            ),
            Self::ProxyConfigError { subdomain, reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Proxy config error for {subdomain}, {reason}"),
            ),
            Self::IoError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({"error": error_message}));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (
                AppError::ValidationError("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::NotFoundError("gone".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::DockerUnavailableError {
                    hint: "start docker".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::PortExhaustedError {
                    min: 3003,
                    max: 3004,
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::image_pull("acme/app:latest", "denied"),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn container_operation_names_target() {
        let error = AppError::container_operation("start", "container-acme", "exit 125");
        assert_eq!(
            error.to_string(),
            "Failed to start container-acme, exit 125"
        );
    }
}
