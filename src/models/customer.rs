//! Customer model and login API types.
//!
//! Customers are optional ticket holders. Login is a find-or-create on the
//! email address; each login rotates the customer's API key, so only the
//! hash of the latest key is stored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role string asserted by the auth middleware for customer principals.
pub const ROLE_CUSTOMER: &str = "customer";

/// Represents a customer record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,

    /// SHA-256 hash of the customer's current API key
    pub api_key_hash: String,

    /// Creation time, seconds since epoch
    pub created_at: i64,
}

/// Request body for customer login (find-or-create).
///
/// ```json
/// {
///   "email": "guest@example.com",
///   "phone": "+43123456789"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CustomerLoginRequest {
    pub email: String,
    pub phone: Option<String>,
}

/// Response for customer login.
///
/// `api_key` is the fresh plaintext key; the previous key (if any) stops
/// working immediately.
#[derive(Debug, Serialize)]
pub struct CustomerLoginResponse {
    pub customer_id: Uuid,
    pub api_key: String,
}
