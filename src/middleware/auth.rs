//! API key authentication middleware.
//!
//! Every protected request carries `Authorization: Bearer <key>`. The key is
//! hashed with SHA-256 and looked up first among businesses, then among
//! customers; the matching row determines the principal's role. The core
//! itself never sees the key — only the injected [`AuthContext`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::services::auth_service;

/// The principal's role, derived from which table the key hash matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Business,
    Customer,
}

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<AuthContext>` to learn who is calling.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated business or customer
    pub subject_id: Uuid,

    /// Which kind of principal the key resolved to
    pub role: Role,
}

impl AuthContext {
    /// The business id, or `Forbidden` when the caller is not a business.
    ///
    /// Check-in, scan, release, and every service operation require the
    /// business role.
    pub fn business_id(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::Business => Ok(self.subject_id),
            Role::Customer => Err(AppError::Forbidden(
                "this operation requires a business account".to_string(),
            )),
        }
    }

    /// The customer id, or `Forbidden` when the caller is not a customer.
    pub fn customer_id(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::Customer => Ok(self.subject_id),
            Role::Business => Err(AppError::Forbidden(
                "this operation requires a customer account".to_string(),
            )),
        }
    }
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` from the request
/// 2. Hash the key with SHA-256
/// 3. Look the hash up among businesses, then customers
/// 4. Found: inject [`AuthContext`], call the next handler
/// 5. Not found: 401 Unauthorized
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let key_hash = auth_service::hash_api_key(api_key);

    let auth_context = resolve_principal(&pool, &key_hash)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// Resolve a key hash to a principal, preferring business accounts.
async fn resolve_principal(
    pool: &DbPool,
    key_hash: &str,
) -> Result<Option<AuthContext>, AppError> {
    let business: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM businesses WHERE api_key_hash = $1")
            .bind(key_hash)
            .fetch_optional(pool)
            .await?;

    if let Some((id,)) = business {
        return Ok(Some(AuthContext {
            subject_id: id,
            role: Role::Business,
        }));
    }

    let customer: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM customers WHERE api_key_hash = $1")
            .bind(key_hash)
            .fetch_optional(pool)
            .await?;

    Ok(customer.map(|(id,)| AuthContext {
        subject_id: id,
        role: Role::Customer,
    }))
}
