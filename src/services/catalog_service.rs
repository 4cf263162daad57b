//! Service configurator: create capacity-limited services, report occupancy.
//!
//! Creating a service inserts the service row and its full slot batch in one
//! transaction, so the `total_slots` invariant holds from the first commit.

use chrono::Utc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::service::{
    CreateServiceRequest, Service, ServiceResponse, ServiceStatsResponse,
};
use crate::services::{slot_service, tenancy};

/// Create a service together with its initial slot set.
///
/// # Validation
///
/// - `name` must be non-empty
/// - `total_slots` must be greater than zero
///
/// # Errors
///
/// - `Validation` on bad input
/// - `NotFound` when the business does not exist
pub async fn create_service(
    pool: &DbPool,
    business_id: Uuid,
    request: CreateServiceRequest,
) -> Result<ServiceResponse, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("service name is required".to_string()));
    }
    if request.total_slots <= 0 {
        return Err(AppError::Validation(
            "total_slots must be greater than zero".to_string(),
        ));
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM businesses WHERE id = $1)")
        .bind(business_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound("business"));
    }

    let service_id = Uuid::new_v4();
    let now = Utc::now().timestamp();

    // Service row and slot batch commit together.
    let mut tx = pool.begin().await?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services (id, business_id, name, total_slots, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING id, business_id, name, total_slots, created_at, updated_at
        "#,
    )
    .bind(service_id)
    .bind(business_id)
    .bind(request.name.trim())
    .bind(request.total_slots)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    slot_service::create_slots(&mut tx, service_id, request.total_slots, now).await?;

    tx.commit().await?;

    Ok(service.into())
}

/// Fetch a service row by id, without tenancy filtering.
///
/// Callers that act on behalf of a business must follow up with a tenancy
/// check; this keeps "absent" (`NotFound`) distinguishable from "not yours"
/// (`Forbidden`).
pub async fn find_service(pool: &DbPool, service_id: Uuid) -> Result<Service, AppError> {
    sqlx::query_as::<_, Service>(
        r#"
        SELECT id, business_id, name, total_slots, created_at, updated_at
        FROM services
        WHERE id = $1
        "#,
    )
    .bind(service_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("service"))
}

/// Tenancy-checked fetch.
pub async fn get_service(
    pool: &DbPool,
    service_id: Uuid,
    business_id: Uuid,
) -> Result<ServiceResponse, AppError> {
    let service = find_service(pool, service_id).await?;
    tenancy::ensure_service_owner(business_id, &service)?;
    Ok(service.into())
}

/// All services of a business in reverse creation order.
pub async fn list_services(
    pool: &DbPool,
    business_id: Uuid,
) -> Result<Vec<ServiceResponse>, AppError> {
    let services = sqlx::query_as::<_, Service>(
        r#"
        SELECT id, business_id, name, total_slots, created_at, updated_at
        FROM services
        WHERE business_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(services.into_iter().map(Into::into).collect())
}

/// Occupancy stats: `{total, occupied, free}` from one aggregate query over
/// the slot rows.
pub async fn get_service_stats(
    pool: &DbPool,
    service_id: Uuid,
    business_id: Uuid,
) -> Result<ServiceStatsResponse, AppError> {
    let service = find_service(pool, service_id).await?;
    tenancy::ensure_service_owner(business_id, &service)?;

    let (total, occupied) = slot_service::count_by_status(pool, service_id).await?;

    Ok(ServiceStatsResponse {
        service_id: service.id,
        name: service.name,
        total,
        occupied,
        free: total - occupied,
    })
}

/// Delete a service; its slots and tickets cascade.
///
/// Deleting a service that still has active tickets is undefined behavior
/// for callers: outstanding QR codes will scan as `NotFound` afterwards.
pub async fn delete_service(
    pool: &DbPool,
    service_id: Uuid,
    business_id: Uuid,
) -> Result<(), AppError> {
    let service = find_service(pool, service_id).await?;
    tenancy::ensure_service_owner(business_id, &service)?;

    sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(service_id)
        .execute(pool)
        .await?;

    Ok(())
}
