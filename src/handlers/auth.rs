//! Registration and login HTTP handlers.
//!
//! These are the only unauthenticated endpoints besides `/health`. Both
//! return a plaintext API key exactly once; the server keeps only the hash.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::business::RegisterBusinessRequest;
use crate::models::customer::CustomerLoginRequest;
use crate::services::auth_service;

/// Register a new business.
///
/// # Endpoint
///
/// `POST /api/v1/auth/business/register`
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "business_id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Hotel Aurora",
///   "api_key": "wJalrXUtnFEMI..."
/// }
/// ```
///
/// The API key is shown only in this response.
pub async fn register_business(
    State(pool): State<DbPool>,
    Json(request): Json<RegisterBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = auth_service::register_business(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Customer login (find-or-create by email).
///
/// # Endpoint
///
/// `POST /api/v1/auth/customer/login`
///
/// Each login rotates the customer's API key; the previous key stops
/// working immediately.
pub async fn customer_login(
    State(pool): State<DbPool>,
    Json(request): Json<CustomerLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = auth_service::customer_login(&pool, request).await?;
    Ok(Json(response))
}
