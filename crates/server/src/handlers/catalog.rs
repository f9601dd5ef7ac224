//! Catalog endpoint.

use crate::catalog::Service;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Catalog response.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub services: Vec<Service>,
}

/// GET /v2/catalog
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        services: state.broker.services(),
    })
}
