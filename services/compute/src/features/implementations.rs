use std::sync::LazyLock;

use regex::Regex;
use shared::utilities::errors::AppError;
use validator::{Validate, ValidationError};

use crate::features::schemas::CreateDeploymentRequest;

static SUBDOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]+$").expect("subdomain pattern is a valid regex")
});

/// DNS label length limit.
const MAX_SUBDOMAIN_LENGTH: usize = 63;

pub fn validate_subdomain(subdomain: &str) -> Result<(), AppError> {
    if subdomain.is_empty() || subdomain.len() > MAX_SUBDOMAIN_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Subdomain must be between 1 and {} characters",
            MAX_SUBDOMAIN_LENGTH
        )));
    }

    if !SUBDOMAIN_PATTERN.is_match(subdomain) {
        return Err(AppError::ValidationError(format!(
            "Invalid subdomain '{}', only lowercase letters, digits and hyphens are allowed",
            subdomain
        )));
    }

    Ok(())
}

pub fn validate_port(port: u16) -> Result<(), AppError> {
    if port == 0 {
        return Err(AppError::ValidationError(
            "Port must be between 1 and 65535".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_image(image: &str) -> Result<(), AppError> {
    if image.trim().is_empty() || image.chars().any(char::is_whitespace) {
        return Err(AppError::ValidationError(format!(
            "Invalid image reference '{}'",
            image
        )));
    }
    Ok(())
}

/// Adapter so request schemas can reuse the subdomain rule through `validator`.
pub fn subdomain_rule(subdomain: &str) -> Result<(), ValidationError> {
    validate_subdomain(subdomain).map_err(|_| {
        let mut error = ValidationError::new("subdomain");
        error.message = Some("Only lowercase letters, digits and hyphens are allowed".into());
        error
    })
}

/// Splits an image reference into the repository and tag the runtime pulls.
/// A reference without a tag resolves to `latest`; digests are passed whole.
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }

    let last_segment_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[last_segment_start..].rfind(':') {
        Some(i) => {
            let split = last_segment_start + i;
            (&image[..split], &image[split + 1..])
        }
        None => (image, "latest"),
    }
}

impl CreateDeploymentRequest {
    /// Validates the payload and narrows the port to the runtime's type.
    pub fn verify(&self) -> Result<u16, AppError> {
        self.validate()?;
        validate_image(&self.image)?;
        validate_subdomain(&self.subdomain)?;

        let port = u16::try_from(self.port).map_err(|_| {
            AppError::ValidationError("Port must be between 1 and 65535".to_string())
        })?;
        validate_port(port)?;

        Ok(port)
    }
}
