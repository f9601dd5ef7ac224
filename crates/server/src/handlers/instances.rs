//! Service instance endpoints.

use super::EmptyResponse;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Provision request body.
#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    pub organization_guid: String,
    pub space_guid: String,
}

/// PUT /v2/service_instances/{instance_id}
pub async fn provision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Json(request): Json<ProvisionRequest>,
) -> ApiResult<(StatusCode, Json<EmptyResponse>)> {
    state
        .broker
        .provision(
            &instance_id,
            &request.organization_guid,
            &request.space_guid,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(EmptyResponse {})))
}

/// DELETE /v2/service_instances/{instance_id}
pub async fn deprovision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> ApiResult<Json<EmptyResponse>> {
    state.broker.deprovision(&instance_id).await?;
    Ok(Json(EmptyResponse {}))
}

/// PATCH /v2/service_instances/{instance_id}
///
/// Updates only apply with multiple plans; this broker offers one.
pub async fn update_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Json<EmptyResponse> {
    state.broker.update(&instance_id).await;
    Json(EmptyResponse {})
}

/// Last-operation response.
#[derive(Debug, Default, Serialize)]
pub struct LastOperationResponse {
    pub state: String,
}

/// GET /v2/service_instances/{instance_id}/last_operation
///
/// Only meaningful for asynchronous provisioning, which this broker does
/// not do.
pub async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Json<LastOperationResponse> {
    state.broker.last_operation(&instance_id).await;
    Json(LastOperationResponse::default())
}
