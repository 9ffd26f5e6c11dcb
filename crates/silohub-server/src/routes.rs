//! HTTP handlers for the tenant control plane.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use silohub_core::{TenantRecord, TenantStatus};

use crate::api::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "tenantName")]
    pub tenant_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Silohub",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// POST /tenants
///
/// Registers the tenant and returns immediately; stack provisioning
/// happens asynchronously off the change feed.
pub async fn register_tenant(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = TenantRecord::register(body.tenant_name)?;
    let stored = state.registry.put(record).await?;
    tracing::info!(tenant_id = %stored.tenant_id, name = %stored.tenant_name, "Tenant registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "tenantId": stored.tenant_id })),
    ))
}

/// GET /tenants
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.page_limit)
        .min(state.page_limit);
    let page = state.query.list(params.offset, limit).await?;
    Ok(Json(page))
}

/// GET /tenants/{id}
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.query.get(&tenant_id).await?;
    Ok(Json(record))
}

/// GET /tenants/{id}/resources
pub async fn tenant_resources(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resources = state.query.resources(&tenant_id).await?;
    Ok(Json(resources))
}

/// DELETE /tenants/{id}
///
/// Accepts the teardown request; completion is observed through the
/// backend's lifecycle events.
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.deletion.request_delete(&tenant_id).await?;
    tracing::info!(tenant_id = %stored.tenant_id, "Tenant deletion accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "tenantId": stored.tenant_id,
            "status": stored.status,
        })),
    ))
}

/// POST /tenants/{id}/retry
///
/// Operator retry of a failed provision or teardown, dispatched on the
/// tenant's current status.
pub async fn retry_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.registry.get(&tenant_id).await?;
    let stored = match record.status {
        TenantStatus::ProvisionFailed => state.provisioner.retry(&tenant_id).await?,
        TenantStatus::DeleteFailed => state.deletion.retry(&tenant_id).await?,
        status => {
            return Err(ApiError::conflict(format!(
                "Tenant {tenant_id} is {status}, nothing to retry"
            )));
        }
    };
    tracing::info!(tenant_id = %stored.tenant_id, status = %stored.status, "Retry accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "tenantId": stored.tenant_id,
            "status": stored.status,
        })),
    ))
}
