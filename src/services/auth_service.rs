//! Registration and API-key issuance.
//!
//! Businesses register once and receive a bearer API key (stored server-side
//! as a SHA-256 hash, shown to the caller exactly once) together with a
//! private HMAC key used to sign QR payloads. Customers log in with an
//! email; the row is created on first login and the API key rotates on every
//! login.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::business::{
    Business, ROLE_BUSINESS, RegisterBusinessRequest, RegisterBusinessResponse,
};
use crate::models::customer::{Customer, CustomerLoginRequest, CustomerLoginResponse};

/// SHA-256 hash of an API key, as stored in the database.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a bearer API key: 256 random bits, base64url encoded.
fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a per-business QR signing secret: 32 random bytes as hex.
fn generate_hmac_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Register a new business.
///
/// # Process
///
/// 1. Validate name and email
/// 2. Generate the API key and the HMAC signing key
/// 3. Insert the business row (key stored as hash)
/// 4. Return the plaintext API key — the only time it is ever visible
///
/// # Errors
///
/// - `Validation`: empty name or email
/// - `Conflict`: email already registered
pub async fn register_business(
    pool: &DbPool,
    request: RegisterBusinessRequest,
) -> Result<RegisterBusinessResponse, AppError> {
    if request.name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(AppError::Validation(
            "name and email are required".to_string(),
        ));
    }

    let api_key = generate_api_key();
    let now = Utc::now().timestamp();

    let inserted = sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO businesses (name, email, api_key_hash, role, hmac_key, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.email.trim())
    .bind(hash_api_key(&api_key))
    .bind(ROLE_BUSINESS)
    .bind(generate_hmac_key())
    .bind(now)
    .fetch_one(pool)
    .await;

    let business = match inserted {
        Ok(business) => business,
        Err(e) if AppError::is_unique_violation(&e, "businesses_email_key") => {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(RegisterBusinessResponse {
        business_id: business.id,
        name: business.name,
        api_key,
    })
}

/// Customer login: find-or-create by email, rotating the API key.
///
/// The previous key (if any) stops working as soon as the new hash is
/// stored.
pub async fn customer_login(
    pool: &DbPool,
    request: CustomerLoginRequest,
) -> Result<CustomerLoginResponse, AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }

    let api_key = generate_api_key();
    let now = Utc::now().timestamp();

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (email, phone, api_key_hash, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET api_key_hash = EXCLUDED.api_key_hash,
            phone = COALESCE(EXCLUDED.phone, customers.phone)
        RETURNING *
        "#,
    )
    .bind(request.email.trim())
    .bind(request.phone)
    .bind(hash_api_key(&api_key))
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(CustomerLoginResponse {
        customer_id: customer.id,
        api_key,
    })
}

/// Fetch a business row, including its HMAC signing key.
pub async fn find_business(pool: &DbPool, business_id: Uuid) -> Result<Business, AppError> {
    sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1")
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("business"))
}
