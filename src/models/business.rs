//! Business (tenant) model and registration API types.
//!
//! Businesses are the tenants of the system: each one exclusively owns its
//! services, slots, tickets, and webhook endpoints. A business authenticates
//! with an API key (stored as a SHA-256 hash, the key itself shown exactly
//! once at registration) and holds a private HMAC key used to sign QR ticket
//! payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role string stored on business rows and asserted by the auth middleware.
pub const ROLE_BUSINESS: &str = "business";

/// Represents a business record from the database.
///
/// # Security
///
/// `hmac_key` is the per-business QR signing secret. It is loaded for
/// signing and verification only and must never appear in any API response.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Business {
    /// Unique identifier for this business
    pub id: Uuid,

    /// Human-readable business name
    pub name: String,

    /// Contact email, unique across businesses
    pub email: String,

    /// SHA-256 hash of the business API key (64 hex characters)
    pub api_key_hash: String,

    /// Role, always "business" for rows in this table
    pub role: String,

    /// High-entropy secret used to HMAC-sign QR payloads.
    ///
    /// Immutable for the lifetime of any outstanding ticket; there is no
    /// rotation operation.
    pub hmac_key: String,

    /// Creation time, seconds since epoch
    pub created_at: i64,

    /// Last update time, seconds since epoch
    pub updated_at: i64,
}

/// Request body for registering a new business.
///
/// ```json
/// {
///   "name": "Hotel Aurora",
///   "email": "frontdesk@aurora.example"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RegisterBusinessRequest {
    pub name: String,
    pub email: String,
}

/// Response returned once at registration.
///
/// # Security Note
///
/// `api_key` is the plaintext bearer key and is only ever returned here;
/// the server keeps only its hash.
#[derive(Debug, Serialize)]
pub struct RegisterBusinessResponse {
    pub business_id: Uuid,
    pub name: String,
    pub api_key: String,
}
