//! Service management HTTP handlers.
//!
//! - `POST /api/v1/services` - Create a service with its slot pool
//! - `GET /api/v1/services` - List the business's services
//! - `GET /api/v1/services/{id}` - Get one service
//! - `DELETE /api/v1/services/{id}` - Delete a service (slots cascade)
//! - `GET /api/v1/services/{id}/stats` - Occupancy stats
//! - `GET /api/v1/services/{id}/tickets` - Active tickets
//!
//! All routes require the business role; a customer key gets 403.

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
use crate::models::service::CreateServiceRequest;
use crate::services::{catalog_service, ticket_service};

/// Create a new service together with its initial slot set.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Cloakroom",
///   "total_slots": 120
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the service
/// - **422**: empty name or non-positive total_slots
pub async fn create_service(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let service = catalog_service::create_service(&pool, business_id, request).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// List the authenticated business's services, newest first.
pub async fn list_services(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let services = catalog_service::list_services(&pool, business_id).await?;
    Ok(Json(services))
}

/// Get a single service. 403 when it belongs to another business.
pub async fn get_service(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let service = catalog_service::get_service(&pool, service_id, business_id).await?;
    Ok(Json(service))
}

/// Delete a service; slots and tickets cascade.
pub async fn delete_service(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    catalog_service::delete_service(&pool, service_id, business_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Occupancy stats for a service.
///
/// # Response
///
/// ```json
/// {
///   "service_id": "...",
///   "name": "Cloakroom",
///   "total": 120,
///   "occupied": 37,
///   "free": 83
/// }
/// ```
pub async fn get_service_stats(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let stats = catalog_service::get_service_stats(&pool, service_id, business_id).await?;
    Ok(Json(stats))
}

/// Active tickets of a service, in slot order.
pub async fn list_active_tickets(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let tickets = ticket_service::list_active_by_service(&pool, business_id, service_id).await?;
    Ok(Json(tickets))
}
