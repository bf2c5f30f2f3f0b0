use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use shared::{schemas::ListResponse, utilities::errors::AppError};
use tracing::debug;

use crate::{
    features::schemas::CreateDeploymentRequest, services::deployment::DeploymentService,
};

// ============================================
// DEPLOYMENT HANDLERS
// ============================================

pub async fn get_deployments(
    State(deployments): State<DeploymentService>,
) -> Result<impl IntoResponse, AppError> {
    let response = deployments.list().await?;

    Ok(Json(ListResponse::from(response)))
}

pub async fn create_deployment(
    State(deployments): State<DeploymentService>,
    Json(req): Json<CreateDeploymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let port = req.verify()?;

    debug!(subdomain = %req.subdomain, image = %req.image, port, "Deploy requested");

    let deployment = deployments.deploy(&req.image, &req.subdomain, port).await?;

    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn delete_deployment(
    Path(subdomain): Path<String>,
    State(deployments): State<DeploymentService>,
) -> Result<impl IntoResponse, AppError> {
    let removed = deployments.remove(&subdomain).await?;

    Ok((StatusCode::OK, Json(removed)))
}

// ============================================
// ROUTE HANDLERS
// ============================================

pub async fn get_routes(
    State(deployments): State<DeploymentService>,
) -> Result<impl IntoResponse, AppError> {
    let routes = deployments.routes().await?;

    Ok(Json(ListResponse::from(routes)))
}

pub async fn health(
    State(deployments): State<DeploymentService>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(deployments.health().await?))
}
