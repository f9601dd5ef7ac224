//! Service binding endpoints.

use super::EmptyResponse;
use crate::engine::BindingCredentials;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Bind request body. The identifiers are routing information for the
/// platform; the broker derives everything from the path parameters.
#[derive(Debug, Default, Deserialize)]
pub struct BindRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
}

/// Bind response.
#[derive(Debug, Serialize)]
pub struct BindResponse {
    pub credentials: BindingCredentials,
}

/// PUT /v2/service_instances/{instance_id}/service_bindings/{binding_id}
pub async fn create_binding(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Json(_request): Json<BindRequest>,
) -> ApiResult<(StatusCode, Json<BindResponse>)> {
    let credentials = state.broker.bind(&instance_id, &binding_id).await?;
    Ok((StatusCode::CREATED, Json(BindResponse { credentials })))
}

/// DELETE /v2/service_instances/{instance_id}/service_bindings/{binding_id}
pub async fn remove_binding(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> ApiResult<Json<EmptyResponse>> {
    state.broker.unbind(&instance_id, &binding_id).await?;
    Ok(Json(EmptyResponse {}))
}
