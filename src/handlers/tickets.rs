//! Ticket lifecycle HTTP handlers.
//!
//! - `POST /api/v1/tickets/checkin` - Claim a slot, issue a signed QR ticket
//! - `POST /api/v1/tickets/scan` - Verify a QR payload, return ticket state
//! - `POST /api/v1/tickets/{id}/release` - Release a ticket, free its slot
//! - `GET /api/v1/tickets` - Customer: list own tickets

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
use crate::models::ticket::{CheckInRequest, ScanRequest};
use crate::services::ticket_service;

/// Check in: claim the next free slot and issue a signed QR ticket.
///
/// # Request Body
///
/// ```json
/// {
///   "service_id": "550e8400-e29b-41d4-a716-446655440000",
///   "customer_id": null
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: `{ticket_id, slot_number, qr_payload, issued_at}`
/// - **403**: service owned by another business, or customer-role key
/// - **404**: service absent
/// - **409**: no free slots available
pub async fn check_in(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let response = ticket_service::check_in(&pool, business_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Scan a QR payload and return the ticket's current state.
///
/// Scanning never mutates state; admission decisions (e.g. rejecting a
/// released ticket) belong to the caller.
///
/// # Response
///
/// - **200 OK**: `{ticket_id, service_id, slot_number, status, issued_at, released_at}`
/// - **400**: malformed payload or bad signature
/// - **403**: the payload belongs to another business
/// - **404**: no ticket stored under the payload's digest
pub async fn scan(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ScanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let response = ticket_service::scan(&pool, business_id, request).await?;
    Ok(Json(response))
}

/// Release a ticket and return its slot to the pool.
///
/// Idempotent: releasing an already-released ticket returns 200 with the
/// unchanged ticket.
pub async fn release(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let business_id = auth.business_id()?;
    let ticket = ticket_service::release(&pool, business_id, ticket_id).await?;
    Ok(Json(ticket))
}

/// List the authenticated customer's tickets, newest first.
pub async fn list_my_tickets(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = auth.customer_id()?;
    let tickets = ticket_service::list_by_customer(&pool, customer_id).await?;
    Ok(Json(tickets))
}
