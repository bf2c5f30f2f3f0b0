use axum::extract::FromRef;

use crate::services::deployment::DeploymentService;

#[derive(Clone)]
pub struct AppState {
    pub deployments: DeploymentService,
}

impl FromRef<AppState> for DeploymentService {
    fn from_ref(state: &AppState) -> Self {
        state.deployments.clone()
    }
}
