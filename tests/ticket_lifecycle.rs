//! End-to-end ticket lifecycle tests against a real PostgreSQL database.
//!
//! Covers the solo check-in flow, scan semantics, release idempotency,
//! capacity exhaustion, tenant isolation, and the slot/ticket invariants.

mod common;

use ticketing_service::error::AppError;
use ticketing_service::models::service::{CreateServiceRequest, SLOT_FREE, SLOT_OCCUPIED};
use ticketing_service::models::ticket::{
    CheckInRequest, ScanRequest, TICKET_ACTIVE, TICKET_RELEASED,
};
use ticketing_service::qr;
use ticketing_service::services::{
    auth_service, catalog_service, slot_service, ticket_service,
};
use uuid::Uuid;

fn check_in_request(service_id: Uuid) -> CheckInRequest {
    CheckInRequest {
        service_id,
        customer_id: None,
    }
}

#[tokio::test]
async fn solo_check_in_issues_first_slot_with_verifiable_payload() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 3).await;

    let response = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .expect("check-in should succeed");

    assert_eq!(response.slot_number, 1);

    // The QR payload decodes to the issued ticket and verifies under the
    // business's HMAC key.
    let payload = qr::decode(&response.qr_payload).expect("payload should decode");
    assert_eq!(payload.version, 1);
    assert_eq!(payload.ticket_id, response.ticket_id);
    assert_eq!(payload.service_id, service.id);
    assert_eq!(payload.business_id, business_id);
    assert_eq!(payload.slot_number, 1);
    assert_eq!(payload.issued_at, response.issued_at);

    let business = auth_service::find_business(&pool, business_id).await.unwrap();
    assert!(payload.verify(&business.hmac_key));

    let stats = catalog_service::get_service_stats(&pool, service.id, business_id)
        .await
        .unwrap();
    assert_eq!((stats.total, stats.occupied, stats.free), (3, 1, 2));
}

#[tokio::test]
async fn scan_reports_state_without_mutating_it() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 3).await;

    let issued = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();

    let scan = |payload: String| {
        ticket_service::scan(&pool, business_id, ScanRequest { qr_payload: payload })
    };

    let first = scan(issued.qr_payload.clone()).await.unwrap();
    assert_eq!(first.ticket_id, issued.ticket_id);
    assert_eq!(first.slot_number, 1);
    assert_eq!(first.status, TICKET_ACTIVE);
    assert_eq!(first.released_at, None);

    // A second scan returns identical state; the slot stays occupied.
    let second = scan(issued.qr_payload.clone()).await.unwrap();
    assert_eq!(second.status, TICKET_ACTIVE);

    let stats = catalog_service::get_service_stats(&pool, service.id, business_id)
        .await
        .unwrap();
    assert_eq!(stats.occupied, 1);
}

#[tokio::test]
async fn release_frees_the_slot_and_is_idempotent() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 3).await;

    let issued = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();

    let released = ticket_service::release(&pool, business_id, issued.ticket_id)
        .await
        .unwrap();
    assert_eq!(released.status, TICKET_RELEASED);
    let released_at = released.released_at.expect("released_at should be set");

    let stats = catalog_service::get_service_stats(&pool, service.id, business_id)
        .await
        .unwrap();
    assert_eq!((stats.total, stats.occupied, stats.free), (3, 0, 3));

    // Scanning still succeeds and now reports the released state.
    let scanned = ticket_service::scan(
        &pool,
        business_id,
        ScanRequest {
            qr_payload: issued.qr_payload.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(scanned.status, TICKET_RELEASED);
    assert_eq!(scanned.released_at, Some(released_at));

    // Releasing again succeeds without touching released_at or the slot.
    let again = ticket_service::release(&pool, business_id, issued.ticket_id)
        .await
        .unwrap();
    assert_eq!(again.released_at, Some(released_at));

    let stats = catalog_service::get_service_stats(&pool, service.id, business_id)
        .await
        .unwrap();
    assert_eq!(stats.free, 3);
}

#[tokio::test]
async fn check_in_fails_fast_when_capacity_is_exhausted() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Valet", 2).await;

    let first = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    let second = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    assert_eq!(first.slot_number, 1);
    assert_eq!(second.slot_number, 2);

    let third = ticket_service::check_in(&pool, business_id, check_in_request(service.id)).await;
    assert!(
        matches!(third, Err(AppError::Conflict(ref msg)) if msg == "no free slots available"),
        "expected Conflict, got {third:?}"
    );

    // The failed attempt persisted nothing.
    let active = ticket_service::list_active_by_service(&pool, business_id, service.id)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    let stats = catalog_service::get_service_stats(&pool, service.id, business_id)
        .await
        .unwrap();
    assert_eq!((stats.total, stats.occupied, stats.free), (2, 2, 0));
}

#[tokio::test]
async fn foreign_qr_is_forbidden_and_tampering_breaks_the_signature() {
    let (_container, pool) = common::setup().await;
    let business_a = common::register_business(&pool, "Business A").await;
    let business_b = common::register_business(&pool, "Business B").await;
    let service = common::create_service(&pool, business_a, "Cloakroom", 2).await;

    let issued = ticket_service::check_in(&pool, business_a, check_in_request(service.id))
        .await
        .unwrap();

    // Another tenant scanning the payload gets Forbidden, never BadRequest,
    // regardless of whether the signature would verify under some other key.
    let foreign = ticket_service::scan(
        &pool,
        business_b,
        ScanRequest {
            qr_payload: issued.qr_payload.clone(),
        },
    )
    .await;
    assert!(
        matches!(foreign, Err(AppError::Forbidden(_))),
        "expected Forbidden, got {foreign:?}"
    );

    // The owner tampering with iat by one second invalidates the signature.
    let mut payload = qr::decode(&issued.qr_payload).unwrap();
    payload.issued_at += 1;
    let tampered = payload.encode().unwrap();

    let result = ticket_service::scan(
        &pool,
        business_a,
        ScanRequest {
            qr_payload: tampered,
        },
    )
    .await;
    assert!(
        matches!(result, Err(AppError::BadRequest(ref msg)) if msg == "invalid QR signature"),
        "expected BadRequest(invalid QR signature), got {result:?}"
    );

    // Garbage input is rejected as an invalid payload.
    let garbage = ticket_service::scan(
        &pool,
        business_a,
        ScanRequest {
            qr_payload: "%%% not base64 %%%".to_string(),
        },
    )
    .await;
    assert!(
        matches!(garbage, Err(AppError::BadRequest(ref msg)) if msg == "invalid QR payload"),
        "expected BadRequest(invalid QR payload), got {garbage:?}"
    );
}

#[tokio::test]
async fn cross_tenant_operations_are_forbidden() {
    let (_container, pool) = common::setup().await;
    let business_a = common::register_business(&pool, "Business A").await;
    let business_b = common::register_business(&pool, "Business B").await;
    let service = common::create_service(&pool, business_a, "Cloakroom", 2).await;

    let check_in = ticket_service::check_in(&pool, business_b, check_in_request(service.id)).await;
    assert!(matches!(check_in, Err(AppError::Forbidden(_))));

    let issued = ticket_service::check_in(&pool, business_a, check_in_request(service.id))
        .await
        .unwrap();

    let release = ticket_service::release(&pool, business_b, issued.ticket_id).await;
    assert!(matches!(release, Err(AppError::Forbidden(_))));

    let stats = catalog_service::get_service_stats(&pool, service.id, business_b).await;
    assert!(matches!(stats, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn create_service_validates_input() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;

    let zero_slots = catalog_service::create_service(
        &pool,
        business_id,
        CreateServiceRequest {
            name: "Cloakroom".to_string(),
            total_slots: 0,
        },
    )
    .await;
    assert!(matches!(zero_slots, Err(AppError::Validation(_))));

    let empty_name = catalog_service::create_service(
        &pool,
        business_id,
        CreateServiceRequest {
            name: "   ".to_string(),
            total_slots: 5,
        },
    )
    .await;
    assert!(matches!(empty_name, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn released_tickets_never_return_to_active() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 1).await;

    let issued = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    ticket_service::release(&pool, business_id, issued.ticket_id)
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let result =
        ticket_service::update_status(&mut tx, issued.ticket_id, TICKET_ACTIVE, 0).await;
    assert!(
        matches!(result, Err(AppError::Conflict(_))),
        "expected Conflict, got {result:?}"
    );
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn customer_bound_tickets_are_listed_per_customer() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 3).await;

    let login = auth_service::customer_login(
        &pool,
        ticketing_service::models::customer::CustomerLoginRequest {
            email: format!("{}@example.com", Uuid::new_v4()),
            phone: None,
        },
    )
    .await
    .unwrap();

    ticket_service::check_in(
        &pool,
        business_id,
        CheckInRequest {
            service_id: service.id,
            customer_id: Some(login.customer_id),
        },
    )
    .await
    .unwrap();

    let tickets = ticket_service::list_by_customer(&pool, login.customer_id)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].customer_id, Some(login.customer_id));

    // A check-in against an unknown customer is rejected before any claim.
    let unknown = ticket_service::check_in(
        &pool,
        business_id,
        CheckInRequest {
            service_id: service.id,
            customer_id: Some(Uuid::new_v4()),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound("customer"))));
}

#[tokio::test]
async fn slot_rows_always_mirror_active_tickets() {
    let (_container, pool) = common::setup().await;
    let business_id = common::register_business(&pool, "Hotel Aurora").await;
    let service = common::create_service(&pool, business_id, "Cloakroom", 4).await;

    // Claim three, release the second.
    let t1 = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    let t2 = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    let t3 = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    ticket_service::release(&pool, business_id, t2.ticket_id)
        .await
        .unwrap();

    let slots = slot_service::list_by_service(&pool, service.id).await.unwrap();

    // The slot set is exactly {1..=total_slots}.
    let numbers: Vec<i32> = slots.iter().map(|s| s.slot_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    // Occupied slots correspond one-to-one to active tickets.
    let occupied: Vec<i32> = slots
        .iter()
        .filter(|s| s.status == SLOT_OCCUPIED)
        .map(|s| s.slot_number)
        .collect();
    assert_eq!(occupied, vec![t1.slot_number, t3.slot_number]);

    let active = ticket_service::list_active_by_service(&pool, business_id, service.id)
        .await
        .unwrap();
    assert_eq!(active.len(), occupied.len());

    // The freed slot is reusable: the next check-in takes slot 2 again.
    let t4 = ticket_service::check_in(&pool, business_id, check_in_request(service.id))
        .await
        .unwrap();
    assert_eq!(t4.slot_number, 2);

    let slots = slot_service::list_by_service(&pool, service.id).await.unwrap();
    assert_eq!(
        slots.iter().filter(|s| s.status == SLOT_FREE).count(),
        1,
        "only slot 4 should remain free"
    );
}
