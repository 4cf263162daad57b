//! Slot pool: atomic claim and release of capacity units.
//!
//! The slot is the unit of contention. All mutations here run inside a
//! transaction owned by the caller, so a claim and the ticket insert that
//! depends on it commit or roll back together.
//!
//! # Concurrency
//!
//! Claiming locks the candidate row with `FOR UPDATE SKIP LOCKED`: a
//! concurrent check-in that finds the lowest-numbered free slot locked moves
//! on to the next one instead of blocking. Two transactions can never claim
//! the same slot, and no service-level lock serializes check-ins.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::service::{SLOT_FREE, SLOT_OCCUPIED, Slot};

/// Claim the lowest-numbered free slot of a service and mark it occupied.
///
/// # Process
///
/// 1. `SELECT ... FOR UPDATE SKIP LOCKED` the lowest-numbered free slot
/// 2. Mark it occupied within the same transaction
///
/// The specific number a caller receives is not guaranteed under
/// contention; what is guaranteed is that concurrent claims never hand out
/// the same slot twice.
///
/// # Errors
///
/// - `Conflict` ("no free slots available") when the pool is drained or
///   every remaining free row is locked by a concurrent claim
pub async fn claim_next_free_slot(
    tx: &mut Transaction<'_, Postgres>,
    service_id: Uuid,
    now: i64,
) -> Result<Slot, AppError> {
    let candidate = sqlx::query_as::<_, Slot>(
        r#"
        SELECT id, service_id, slot_number, status, created_at, updated_at
        FROM slots
        WHERE service_id = $1 AND status = $2
        ORDER BY slot_number ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(service_id)
    .bind(SLOT_FREE)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::Conflict("no free slots available".to_string()))?;

    let claimed = sqlx::query_as::<_, Slot>(
        r#"
        UPDATE slots
        SET status = $1, updated_at = $2
        WHERE id = $3
        RETURNING id, service_id, slot_number, status, created_at, updated_at
        "#,
    )
    .bind(SLOT_OCCUPIED)
    .bind(now)
    .bind(candidate.id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(claimed)
}

/// Return a slot to the pool.
///
/// Only the release transition of an active ticket calls this; releasing a
/// slot without the corresponding ticket transition is a programming error.
pub async fn free_slot(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: Uuid,
    now: i64,
) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE slots SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(SLOT_FREE)
        .bind(now)
        .bind(slot_id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("slot"));
    }

    Ok(())
}

/// Insert the slot batch for a new service, numbered `1..=total_slots`, all
/// free. Runs in the service-creation transaction so a service row never
/// exists without its slots.
pub async fn create_slots(
    tx: &mut Transaction<'_, Postgres>,
    service_id: Uuid,
    total_slots: i32,
    now: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO slots (service_id, slot_number, status, created_at, updated_at)
        SELECT $1, n, $2, $3, $3
        FROM generate_series(1, $4) AS n
        "#,
    )
    .bind(service_id)
    .bind(SLOT_FREE)
    .bind(now)
    .bind(total_slots)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Occupancy counts for a service from one aggregate query.
///
/// Returns `(total, occupied)`; free is `total - occupied`.
pub async fn count_by_status(pool: &DbPool, service_id: Uuid) -> Result<(i64, i64), AppError> {
    let (total, occupied): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = $1)
        FROM slots
        WHERE service_id = $2
        "#,
    )
    .bind(SLOT_OCCUPIED)
    .bind(service_id)
    .fetch_one(pool)
    .await?;

    Ok((total, occupied))
}

/// All slots of a service in slot-number order.
pub async fn list_by_service(pool: &DbPool, service_id: Uuid) -> Result<Vec<Slot>, AppError> {
    let slots = sqlx::query_as::<_, Slot>(
        r#"
        SELECT id, service_id, slot_number, status, created_at, updated_at
        FROM slots
        WHERE service_id = $1
        ORDER BY slot_number ASC
        "#,
    )
    .bind(service_id)
    .fetch_all(pool)
    .await?;

    Ok(slots)
}
