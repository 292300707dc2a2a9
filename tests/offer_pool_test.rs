//! Tests del pool de ofertas: visibilidad, filtrado por tipo de vehículo y
//! reglas de la negociación.

mod common;

use rust_decimal::Decimal;
use serde_json::json;

use common::{TestContext, DROPOFF, PICKUP};
use taxi_marketplace::models::VehicleType;
use taxi_marketplace::services::{OfferDecision, PoolView};
use taxi_marketplace::store::{DocumentStore, WriteOp};
use taxi_marketplace::utils::errors::AppError;

#[tokio::test]
async fn pool_filters_by_vehicle_type() {
    let ctx = TestContext::new();
    ctx.request_trip("p1", VehicleType::Sedan).await;
    ctx.request_trip("p2", VehicleType::Motorcycle).await;
    ctx.request_trip("p3", VehicleType::Truck).await;

    let view = ctx
        .offer_service
        .list_pending_trips(VehicleType::Motorcycle, None)
        .await
        .unwrap();

    match view {
        PoolView::Pool(requests) => {
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].trip.user_id, "p2");
        }
        other => panic!("expected pool, got {:?}", other),
    }
}

#[tokio::test]
async fn trips_without_vehicle_type_stay_out_of_every_pool() {
    let ctx = TestContext::new();

    // Documento heredado sin vehicleType, plantado directo en el store
    ctx.store
        .batch_write(vec![WriteOp::Create {
            collection: "taxiRequests".to_string(),
            id: "legacy-1".to_string(),
            data: json!({
                "tripId": "11111",
                "status": "pending",
                "userId": "p-legacy",
                "location": { "latitude": PICKUP.latitude, "longitude": PICKUP.longitude },
                "address": "Sin tipo",
                "destination": {
                    "latitude": DROPOFF.latitude,
                    "longitude": DROPOFF.longitude,
                    "address": "Unare"
                },
                "createdAt": chrono::Utc::now().to_rfc3339()
            }),
        }])
        .await
        .unwrap();

    for vehicle_type in [VehicleType::Motorcycle, VehicleType::Sedan, VehicleType::Truck] {
        let view = ctx
            .offer_service
            .list_pending_trips(vehicle_type, None)
            .await
            .unwrap();
        match view {
            PoolView::Pool(requests) => {
                assert!(requests.is_empty(), "legacy trip leaked into {:?}", vehicle_type)
            }
            other => panic!("expected pool, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn driver_with_active_negotiation_is_redirected() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;
    ctx.offer_service
        .submit_offer(&doc.id, "d1", Decimal::from(12), None)
        .await
        .unwrap();

    // Otro viaje pendiente que d1 no debería ver
    ctx.request_trip("p2", VehicleType::Sedan).await;

    let view = ctx
        .offer_service
        .list_pending_trips(VehicleType::Sedan, Some("d1"))
        .await
        .unwrap();

    match view {
        PoolView::ActiveTrip(active) => assert_eq!(active.id, doc.id),
        other => panic!("expected redirect to active trip, got {:?}", other),
    }
}

#[tokio::test]
async fn busy_driver_cannot_submit_a_second_offer() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let first = ctx.request_trip("p1", VehicleType::Sedan).await;
    let second = ctx.request_trip("p2", VehicleType::Sedan).await;

    ctx.offer_service
        .submit_offer(&first.id, "d1", Decimal::from(10), None)
        .await
        .unwrap();

    let result = ctx
        .offer_service
        .submit_offer(&second.id, "d1", Decimal::from(10), None)
        .await;
    assert!(matches!(result, Err(AppError::StaleState(_))));
}

#[tokio::test]
async fn offer_price_must_be_positive() {
    let ctx = TestContext::new();
    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;

    for price in [Decimal::ZERO, Decimal::from(-7)] {
        let result = ctx
            .offer_service
            .submit_offer(&doc.id, "d1", price, None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidPrice(_))));
    }
}

#[tokio::test]
async fn respond_requires_ownership_and_offered_state() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;

    // Sin oferta todavía
    let result = ctx
        .offer_service
        .respond_to_offer(&doc.id, "p1", OfferDecision::Accept)
        .await;
    assert!(matches!(result, Err(AppError::NotOffered(_))));

    ctx.offer_service
        .submit_offer(&doc.id, "d1", Decimal::from(20), None)
        .await
        .unwrap();

    // Oferta en pie, pero no es su viaje
    let result = ctx
        .offer_service
        .respond_to_offer(&doc.id, "otro", OfferDecision::Accept)
        .await;
    assert!(matches!(result, Err(AppError::NotOwner(_))));
}

#[tokio::test]
async fn offer_on_missing_trip_is_not_found() {
    let ctx = TestContext::new();
    let result = ctx
        .offer_service
        .submit_offer("no-such-trip", "d1", Decimal::from(10), None)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn pool_subscription_sees_new_requests() {
    let ctx = TestContext::new();

    let repo = taxi_marketplace::repositories::TripRepository::new(ctx.store.clone());
    let mut subscription = repo
        .subscribe_pending_by_vehicle(VehicleType::Sedan)
        .await
        .unwrap();

    // Una moto no debe aparecer en la suscripción de sedanes
    ctx.request_trip("p-moto", VehicleType::Motorcycle).await;
    let sedan = ctx.request_trip("p-sedan", VehicleType::Sedan).await;

    let event = subscription.next().await.expect("change event");
    assert_eq!(event.id, sedan.id);
}

#[tokio::test]
async fn offer_fans_out_notifications_to_other_drivers() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;
    ctx.seed_driver("d2", VehicleType::Sedan).await;
    ctx.seed_driver("d3", VehicleType::Motorcycle).await;

    let doc = ctx.request_trip("p1", VehicleType::Sedan).await;
    ctx.offer_service
        .submit_offer(&doc.id, "d1", Decimal::from(20), None)
        .await
        .unwrap();

    // d2 (mismo tipo) recibe la notificación; d1 (oferente) y d3 (otro tipo)
    // no
    let notifications = ctx
        .store
        .query(
            "notifications",
            &[taxi_marketplace::store::Predicate::eq("userId", "d2")],
        )
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);

    for excluded in ["d1", "d3"] {
        let none = ctx
            .store
            .query(
                "notifications",
                &[taxi_marketplace::store::Predicate::eq("userId", excluded)],
            )
            .await
            .unwrap();
        assert!(none.is_empty(), "{} should not be notified", excluded);
    }
}
