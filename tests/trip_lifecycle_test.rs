//! Tests del ciclo de vida del viaje: creación, negociación, transiciones y
//! barrido de solicitudes viejas.

mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use common::{assert_driver_id_invariant, TestContext, DROPOFF, PICKUP};
use taxi_marketplace::models::trip::{TripRequest, TripStatus};
use taxi_marketplace::models::{CommissionStatus, Destination, VehicleType};
use taxi_marketplace::repositories::TripRepository;
use taxi_marketplace::services::OfferDecision;
use taxi_marketplace::utils::errors::AppError;

#[tokio::test]
async fn full_lifecycle_reaches_completed() {
    let ctx = TestContext::new();
    ctx.set_commission_rate(10).await;
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;
    assert_eq!(doc.trip.status, TripStatus::Pending);
    assert_eq!(doc.trip.service_percentage, Some(10));
    assert_eq!(doc.trip.trip_id.len(), 5);
    assert_driver_id_invariant(&doc);

    let offered = ctx
        .offer_service
        .submit_offer(&doc.id, "d1", Decimal::from(20), Some(PICKUP))
        .await
        .unwrap();
    assert_eq!(offered.trip.status, TripStatus::Offered);
    assert_eq!(offered.trip.price, Some(Decimal::from(20)));
    assert_eq!(offered.trip.driver_id.as_deref(), Some("d1"));
    assert!(offered.trip.driver_start_location.is_some());
    assert!(offered.trip.offered_at.is_some());
    assert_driver_id_invariant(&offered);

    let accepted = ctx
        .offer_service
        .respond_to_offer(&doc.id, "p1", OfferDecision::Accept)
        .await
        .unwrap();
    assert_eq!(accepted.trip.status, TripStatus::Accepted);
    assert!(accepted.trip.accepted_at.is_some());

    let arrived = ctx.trip_service.driver_arrived(&doc.id, "d1").await.unwrap();
    assert_eq!(arrived.trip.status, TripStatus::DriverArrived);
    assert_eq!(arrived.trip.driver_arrived, Some(true));
    assert!(arrived.trip.arrived_at.is_some());

    let in_progress = ctx.trip_service.start_trip(&doc.id, "d1").await.unwrap();
    assert_eq!(in_progress.trip.status, TripStatus::InProgress);

    let completed = ctx.trip_service.complete_trip(&doc.id, "d1").await.unwrap();
    assert_eq!(completed.trip.status, TripStatus::Completed);
    assert!(completed.trip.completed_at.is_some());
    assert_eq!(completed.trip.commission_status, Some(CommissionStatus::Unpaid));
    assert_driver_id_invariant(&completed);
}

#[tokio::test]
async fn passenger_cannot_have_two_active_trips() {
    let ctx = TestContext::new();
    ctx.request_trip("p1", VehicleType::Sedan).await;

    let result = ctx
        .trip_service
        .request_trip(taxi_marketplace::services::trip_service::NewTripRequest {
            user_id: "p1".to_string(),
            user_name: None,
            user_email: None,
            user_photo: None,
            user_phone: None,
            vehicle_type: VehicleType::Sedan,
            pickup: PICKUP,
            pickup_address: Some("Otra esquina".to_string()),
            destination: Destination {
                latitude: DROPOFF.latitude,
                longitude: DROPOFF.longitude,
                address: "Unare".to_string(),
            },
        })
        .await;

    assert!(matches!(result, Err(AppError::StaleState(_))));
}

#[tokio::test]
async fn concurrent_offers_exactly_one_wins() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;
    ctx.seed_driver("d2", VehicleType::Sedan).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;

    let (a, b) = tokio::join!(
        ctx.offer_service
            .submit_offer(&doc.id, "d1", Decimal::from(15), None),
        ctx.offer_service
            .submit_offer(&doc.id, "d2", Decimal::from(18), None),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one offer must land");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AppError::AlreadyOffered(_))));

    let current = ctx.trip_service.get_trip(&doc.id).await.unwrap();
    assert_eq!(current.trip.status, TripStatus::Offered);
}

#[tokio::test]
async fn decline_returns_trip_to_pool_with_driver_purged() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;
    ctx.offer_service
        .submit_offer(&doc.id, "d1", Decimal::from(25), Some(PICKUP))
        .await
        .unwrap();

    let declined = ctx
        .offer_service
        .respond_to_offer(&doc.id, "p1", OfferDecision::Decline)
        .await
        .unwrap();

    assert_eq!(declined.trip.status, TripStatus::Pending);
    assert!(declined.trip.driver_id.is_none());
    assert!(declined.trip.driver_name.is_none());
    assert!(declined.trip.driver_photo.is_none());
    assert!(declined.trip.driver_email.is_none());
    assert!(declined.trip.driver_start_location.is_none());
    assert!(declined.trip.price.is_none());
    assert!(declined.trip.offered_at.is_none());
    assert_driver_id_invariant(&declined);

    // De vuelta en el pool para el mismo tipo de vehículo
    let pool = ctx
        .offer_service
        .list_pending_trips(VehicleType::Sedan, Some("d2"))
        .await
        .unwrap();
    match pool {
        taxi_marketplace::services::PoolView::Pool(requests) => {
            assert!(requests.iter().any(|r| r.id == doc.id));
        }
        other => panic!("expected pool, got {:?}", other),
    }
}

#[tokio::test]
async fn cancel_from_accepted_clears_driver_fields() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    let cancelled = ctx.trip_service.cancel_trip(&doc.id, "p1").await.unwrap();
    assert_eq!(cancelled.trip.status, TripStatus::Cancelled);
    assert!(cancelled.trip.cancelled_at.is_some());
    assert!(cancelled.trip.driver_id.is_none());
    assert!(cancelled.trip.price.is_none());
    assert_driver_id_invariant(&cancelled);
}

#[tokio::test]
async fn cancel_rejected_once_in_progress() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;
    ctx.trip_service.driver_arrived(&doc.id, "d1").await.unwrap();
    ctx.trip_service.start_trip(&doc.id, "d1").await.unwrap();

    let result = ctx.trip_service.cancel_trip(&doc.id, "p1").await;
    assert!(matches!(result, Err(AppError::StaleState(_))));
}

#[tokio::test]
async fn cancel_by_non_owner_is_rejected() {
    let ctx = TestContext::new();
    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;

    let result = ctx.trip_service.cancel_trip(&doc.id, "intruso").await;
    assert!(matches!(result, Err(AppError::NotOwner(_))));
}

#[tokio::test]
async fn release_returns_accepted_trip_to_pool() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    let released = ctx
        .offer_service
        .release_trip(&doc.id, "d1")
        .await
        .unwrap();
    assert_eq!(released.trip.status, TripStatus::Pending);
    assert!(released.trip.driver_id.is_none());
    assert!(released.trip.accepted_at.is_none());
    assert_driver_id_invariant(&released);
}

#[tokio::test]
async fn manual_arrival_is_idempotent() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    let first = ctx.trip_service.driver_arrived(&doc.id, "d1").await.unwrap();
    let second = ctx.trip_service.driver_arrived(&doc.id, "d1").await.unwrap();

    assert_eq!(first.trip.status, TripStatus::DriverArrived);
    assert_eq!(second.trip.status, TripStatus::DriverArrived);
    assert_eq!(first.trip.arrived_at, second.trip.arrived_at);
}

#[tokio::test]
async fn stale_sweep_cancels_old_pending_and_is_idempotent() {
    let ctx = TestContext::new();

    // Plantar una solicitud pendiente de hace dos horas directamente en el
    // repositorio
    let repo = TripRepository::new(ctx.store.clone());
    let mut old_trip: TripRequest = serde_json::from_value(serde_json::json!({
        "tripId": "99999",
        "status": "pending",
        "userId": "p-old",
        "location": { "latitude": PICKUP.latitude, "longitude": PICKUP.longitude },
        "address": "Vieja esquina",
        "destination": {
            "latitude": DROPOFF.latitude,
            "longitude": DROPOFF.longitude,
            "address": "Unare"
        },
        "vehicleType": "sedan",
        "createdAt": Utc::now().to_rfc3339()
    }))
    .unwrap();
    old_trip.created_at = Utc::now() - Duration::hours(2);
    let old_id = repo.create(&old_trip).await.unwrap();

    // Una solicitud fresca no debe ser tocada
    let fresh = ctx.request_trip("p-fresh", VehicleType::Sedan).await;

    let swept = ctx
        .trip_service
        .sweep_stale_pending(Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let old_doc = ctx.trip_service.get_trip(&old_id).await.unwrap();
    assert_eq!(old_doc.trip.status, TripStatus::Cancelled);

    let fresh_doc = ctx.trip_service.get_trip(&fresh.id).await.unwrap();
    assert_eq!(fresh_doc.trip.status, TripStatus::Pending);

    // Segundo barrido: mismo estado final, nada que doble-cancelar
    let swept_again = ctx
        .trip_service
        .sweep_stale_pending(Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(swept_again, 0);

    let old_doc = ctx.trip_service.get_trip(&old_id).await.unwrap();
    assert_eq!(old_doc.trip.status, TripStatus::Cancelled);
}

#[tokio::test]
async fn trip_history_merges_roles_newest_first() {
    let ctx = TestContext::new();
    ctx.set_commission_rate(10).await;
    ctx.seed_driver("dual", VehicleType::Sedan).await;

    // "dual" completa una carrera como conductor...
    ctx.completed_trip("p1", "dual", VehicleType::Sedan, Decimal::from(30))
        .await;
    // ...y luego pide un viaje como pasajero
    ctx.request_trip("dual", VehicleType::Sedan).await;

    let history = ctx.trip_service.trip_history("dual").await.unwrap();
    assert_eq!(history.len(), 2);
    // Más reciente primero: el viaje como pasajero
    assert_eq!(
        history[0].role,
        taxi_marketplace::services::trip_service::TripRole::Passenger
    );
    let driver_entry = &history[1];
    assert_eq!(
        driver_entry.role,
        taxi_marketplace::services::trip_service::TripRole::Driver
    );
    // $30 al 10%: comisión $3, neto $27
    assert_eq!(driver_entry.commission, Some(Decimal::from(3)));
    assert_eq!(driver_entry.net_earnings, Some(Decimal::from(27)));
}
