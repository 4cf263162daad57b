//! Ticket lifecycle engine: check-in, scan, release.
//!
//! This is the only module that composes a transaction spanning slot and
//! ticket state. The invariant it maintains: every active ticket points at
//! exactly one occupied slot, and every occupied slot has exactly one active
//! ticket.
//!
//! # Atomicity Guarantees
//!
//! Check-in claims the slot and inserts the ticket inside one database
//! transaction; if anything fails, the claim rolls back and no ticket is
//! visible. Release flips the ticket to `released` and frees the slot in one
//! transaction, with the idempotency check performed under a row lock so a
//! concurrent double-release cannot free the slot twice.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ticket::{
    CheckInRequest, CheckInResponse, ScanRequest, ScanResponse, TICKET_ACTIVE, TICKET_RELEASED,
    Ticket, TicketResponse,
};
use crate::qr::QrPayload;
use crate::services::{auth_service, catalog_service, slot_service, tenancy, webhook_service};

/// Claim a slot and issue a signed QR ticket.
///
/// # Process
///
/// 1. Resolve the service; verify the business owns it
/// 2. Load the business for its HMAC signing key
/// 3. In one transaction: claim the lowest free slot, mint a ticket id,
///    sign the payload, insert the ticket
/// 4. On a duplicate `hmac_digest` (a ticket-id collision), retry once with
///    a fresh id
/// 5. Encode the payload and notify webhooks after commit
///
/// # Errors
///
/// - `NotFound`: service, business, or referenced customer absent
/// - `Forbidden`: service owned by another business
/// - `Conflict`: no free slots available
/// - `Internal`: signing or encoding failed
pub async fn check_in(
    pool: &DbPool,
    business_id: Uuid,
    request: CheckInRequest,
) -> Result<CheckInResponse, AppError> {
    let service = catalog_service::find_service(pool, request.service_id).await?;
    tenancy::ensure_service_owner(business_id, &service)?;

    let business = auth_service::find_business(pool, business_id).await?;

    if let Some(customer_id) = request.customer_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(customer_id)
                .fetch_one(pool)
                .await?;
        if !exists {
            return Err(AppError::NotFound("customer"));
        }
    }

    let mut retried = false;
    loop {
        let now = Utc::now().timestamp();
        let mut tx = pool.begin().await?;

        let slot = slot_service::claim_next_free_slot(&mut tx, service.id, now).await?;

        let ticket_id = Uuid::new_v4();

        let mut payload =
            QrPayload::new(ticket_id, service.id, business_id, slot.slot_number, now);
        payload
            .sign(&business.hmac_key)
            .map_err(|e| AppError::Internal(format!("QR signing failed: {e}")))?;

        let ticket = Ticket {
            id: ticket_id,
            service_id: service.id,
            slot_id: slot.id,
            slot_number: slot.slot_number,
            customer_id: request.customer_id,
            status: TICKET_ACTIVE.to_string(),
            hmac_digest: payload.hmac.clone(),
            issued_at: now,
            released_at: None,
            created_at: now,
            updated_at: now,
        };

        match insert_ticket(&mut tx, &ticket).await {
            Ok(()) => {
                tx.commit().await?;

                let encoded = payload
                    .encode()
                    .map_err(|e| AppError::Internal(format!("QR encoding failed: {e}")))?;

                webhook_service::notify_ticket_event(
                    pool,
                    business_id,
                    webhook_service::EVENT_CHECKED_IN,
                    &ticket,
                )
                .await;

                return Ok(CheckInResponse {
                    ticket_id,
                    slot_number: slot.slot_number,
                    qr_payload: encoded,
                    issued_at: now,
                });
            }
            Err(e) if AppError::is_unique_violation(&e, "tickets_hmac_digest_key") => {
                // Digest collision: the slot claim rolls back with the
                // transaction; retry once with a fresh ticket id.
                tx.rollback().await?;
                if retried {
                    return Err(AppError::Conflict(
                        "duplicate ticket signature".to_string(),
                    ));
                }
                tracing::warn!(
                    ticket_id = %ticket_id,
                    "hmac digest collision on insert, retrying with a fresh id"
                );
                retried = true;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Verify a QR code and return the ticket's current state.
///
/// Scanning does not mutate state; it is a query, not an admission gate. An
/// admission policy (e.g. reject already-released tickets) is the caller's
/// responsibility.
///
/// # Errors
///
/// - `BadRequest("invalid QR payload")`: malformed base64/JSON, bad
///   identifiers, or an unsupported payload version
/// - `Forbidden("foreign QR")`: the payload names another business; checked
///   before any signature work so cross-tenant probing never reaches the key
/// - `BadRequest("invalid QR signature")`: digest mismatch
/// - `NotFound`: no ticket stored under the payload's digest
pub async fn scan(
    pool: &DbPool,
    business_id: Uuid,
    request: ScanRequest,
) -> Result<ScanResponse, AppError> {
    let payload = crate::qr::decode(&request.qr_payload).map_err(|e| {
        tracing::debug!("QR decode failed: {e}");
        AppError::BadRequest("invalid QR payload".to_string())
    })?;

    if payload.business_id != business_id {
        return Err(AppError::Forbidden("foreign QR".to_string()));
    }

    let business = auth_service::find_business(pool, business_id).await?;

    if !payload.verify(&business.hmac_key) {
        return Err(AppError::BadRequest("invalid QR signature".to_string()));
    }

    let ticket = find_by_hmac(pool, &payload.hmac).await?;

    Ok(ticket.into())
}

/// Release a ticket and return its slot to the pool.
///
/// Idempotent from the API boundary: releasing an already-released ticket
/// succeeds without touching `released_at` or re-freeing the slot. The
/// already-released check runs inside the transaction under `FOR UPDATE`,
/// so of two concurrent releases exactly one performs the transition.
///
/// # Errors
///
/// - `NotFound`: ticket absent
/// - `Forbidden`: ticket's service owned by another business
pub async fn release(
    pool: &DbPool,
    business_id: Uuid,
    ticket_id: Uuid,
) -> Result<TicketResponse, AppError> {
    let ticket = find_by_id(pool, ticket_id).await?;
    let service = catalog_service::find_service(pool, ticket.service_id).await?;
    tenancy::ensure_ticket_owner(business_id, &service)?;

    let mut tx = pool.begin().await?;

    let locked = lock_ticket(&mut tx, ticket_id).await?;
    if locked.status == TICKET_RELEASED {
        tx.commit().await?;
        return Ok(locked.into());
    }

    let now = Utc::now().timestamp();
    let released = update_status(&mut tx, ticket_id, TICKET_RELEASED, now).await?;
    slot_service::free_slot(&mut tx, locked.slot_id, now).await?;

    tx.commit().await?;

    webhook_service::notify_ticket_event(
        pool,
        business_id,
        webhook_service::EVENT_RELEASED,
        &released,
    )
    .await;

    Ok(released.into())
}

/// Fetch a ticket by id.
pub async fn find_by_id(pool: &DbPool, ticket_id: Uuid) -> Result<Ticket, AppError> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("ticket"))
}

/// Fetch a ticket by the HMAC digest carried in its QR payload.
pub async fn find_by_hmac(pool: &DbPool, hmac_digest: &str) -> Result<Ticket, AppError> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE hmac_digest = $1")
        .bind(hmac_digest)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("ticket"))
}

/// All tickets held by a customer, newest first.
pub async fn list_by_customer(
    pool: &DbPool,
    customer_id: Uuid,
) -> Result<Vec<TicketResponse>, AppError> {
    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE customer_id = $1 ORDER BY issued_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(tickets.into_iter().map(Into::into).collect())
}

/// Active tickets of a service, tenancy-checked.
pub async fn list_active_by_service(
    pool: &DbPool,
    business_id: Uuid,
    service_id: Uuid,
) -> Result<Vec<TicketResponse>, AppError> {
    let service = catalog_service::find_service(pool, service_id).await?;
    tenancy::ensure_service_owner(business_id, &service)?;

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE service_id = $1 AND status = $2 ORDER BY slot_number ASC",
    )
    .bind(service_id)
    .bind(TICKET_ACTIVE)
    .fetch_all(pool)
    .await?;

    Ok(tickets.into_iter().map(Into::into).collect())
}

/// Transition a ticket's status inside the caller's transaction.
///
/// Records `released_at` when moving to `released`. A transition to the
/// state the ticket is already in is a no-op, not an error, and leaves
/// `released_at` untouched. `released -> active` is never valid.
pub async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    ticket_id: Uuid,
    new_status: &str,
    now: i64,
) -> Result<Ticket, AppError> {
    let current = lock_ticket(tx, ticket_id).await?;

    if current.status == new_status {
        return Ok(current);
    }
    if current.status == TICKET_RELEASED && new_status == TICKET_ACTIVE {
        return Err(AppError::Conflict(
            "a released ticket cannot return to active".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET status = $2,
            released_at = CASE WHEN $2 = 'released' THEN $3 ELSE released_at END,
            updated_at = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(ticket_id)
    .bind(new_status)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(updated)
}

/// Lock a ticket row for the remainder of the transaction.
async fn lock_ticket(
    tx: &mut Transaction<'_, Postgres>,
    ticket_id: Uuid,
) -> Result<Ticket, AppError> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
        .bind(ticket_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("ticket"))
}

/// Insert a new ticket row.
///
/// Returns the raw sqlx error so check-in can distinguish a digest
/// collision (unique violation, retried) from other failures.
async fn insert_ticket(
    tx: &mut Transaction<'_, Postgres>,
    ticket: &Ticket,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, service_id, slot_id, slot_number, customer_id,
            status, hmac_digest, issued_at, released_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.service_id)
    .bind(ticket.slot_id)
    .bind(ticket.slot_number)
    .bind(ticket.customer_id)
    .bind(&ticket.status)
    .bind(&ticket.hmac_digest)
    .bind(ticket.issued_at)
    .bind(ticket.released_at)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
