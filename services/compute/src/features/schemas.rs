use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::features::models::DeploymentState;

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,
    #[validate(custom(function = "crate::features::implementations::subdomain_rule"))]
    pub subdomain: String,
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: i64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub container_id: String,
    pub container_name: String,
    pub subdomain: String,
    pub host_port: u16,
    pub url: String,
    pub state: DeploymentState,
    /// `false` when the route was persisted but the proxy reload failed.
    pub reloaded: bool,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDeploymentResponse {
    pub subdomain: String,
    pub url: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub container_id: String,
    pub subdomain: String,
    pub image: String,
    pub status: String,
    pub state: String,
    pub host_port: Option<u16>,
    pub routed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub runtime: String,
    pub routes: usize,
}
