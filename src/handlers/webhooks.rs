//! HTTP handlers for webhook endpoint management.
//!
//! Businesses register, list, and delete the endpoints that receive signed
//! ticket lifecycle notifications.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::webhook::WebhookEndpointRequest;
use crate::services::webhook_service;

/// Register a new webhook endpoint.
///
/// Returns 201 Created; the `secret` appears only in this response.
pub async fn create_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WebhookEndpointRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let endpoint = webhook_service::create_webhook_endpoint(&pool, business_id, request).await?;
    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// List the business's active webhook endpoints (without secrets).
pub async fn list_webhooks(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let endpoints = webhook_service::list_webhook_endpoints(&pool, business_id).await?;
    Ok(Json(endpoints))
}

/// Deactivate a webhook endpoint, keeping its delivery history.
pub async fn delete_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(endpoint_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    webhook_service::delete_webhook_endpoint(&pool, business_id, endpoint_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
