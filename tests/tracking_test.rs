//! Tests de tracking: persistencia de posición, detección de llegada y
//! teardown del stream.

mod common;

use rust_decimal::Decimal;

use common::{wait_for_trip, TestContext, DROPOFF, PICKUP};
use taxi_marketplace::models::trip::TripStatus;
use taxi_marketplace::models::{CommissionStatus, GeoPoint, VehicleType};
use taxi_marketplace::services::tracking_service::TrackingLeg;
use taxi_marketplace::utils::errors::AppError;

/// Un punto a ~550 m del pickup: fuera del umbral de llegada
fn far_from_pickup() -> GeoPoint {
    GeoPoint::new(PICKUP.latitude + 0.005, PICKUP.longitude)
}

#[tokio::test]
async fn samples_update_driver_location_until_arrival() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    ctx.tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToPickup)
        .await
        .unwrap();

    // Lejos del pickup: la posición se persiste y el estado no cambia
    let far = far_from_pickup();
    ctx.tracking.push_sample(&doc.id, far).await.unwrap();

    let tracked = wait_for_trip(&ctx.trip_service, &doc.id, |d| {
        d.trip.driver_location.is_some()
    })
    .await;
    assert_eq!(tracked.trip.status, TripStatus::Accepted);
    let location = tracked.trip.driver_location.unwrap();
    assert!((location.latitude - far.latitude).abs() < 1e-9);

    // Exactamente en el pickup: distancia² = 0, llegada detectada
    ctx.tracking.push_sample(&doc.id, PICKUP).await.unwrap();

    let arrived = wait_for_trip(&ctx.trip_service, &doc.id, |d| {
        d.trip.status == TripStatus::DriverArrived
    })
    .await;
    assert_eq!(arrived.trip.driver_arrived, Some(true));
}

#[tokio::test]
async fn arrival_fires_exactly_once() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    ctx.tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToPickup)
        .await
        .unwrap();
    ctx.tracking.push_sample(&doc.id, PICKUP).await.unwrap();

    let arrived = wait_for_trip(&ctx.trip_service, &doc.id, |d| {
        d.trip.status == TripStatus::DriverArrived
    })
    .await;
    let first_arrival = arrived.trip.arrived_at;

    // La sesión del tramo terminó: muestras posteriores en el mismo punto no
    // re-disparan la transición
    let mut rejected = false;
    for _ in 0..100 {
        if ctx.tracking.push_sample(&doc.id, PICKUP).await.is_err() {
            rejected = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(rejected, "session should be gone after arrival");

    let current = ctx.trip_service.get_trip(&doc.id).await.unwrap();
    assert_eq!(current.trip.status, TripStatus::DriverArrived);
    assert_eq!(current.trip.arrived_at, first_arrival);
}

#[tokio::test]
async fn destination_arrival_completes_trip_and_accrues_commission() {
    let ctx = TestContext::new();
    ctx.set_commission_rate(10).await;
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;
    ctx.trip_service.driver_arrived(&doc.id, "d1").await.unwrap();
    ctx.trip_service.start_trip(&doc.id, "d1").await.unwrap();

    ctx.tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToDestination)
        .await
        .unwrap();
    ctx.tracking.push_sample(&doc.id, DROPOFF).await.unwrap();

    let completed = wait_for_trip(&ctx.trip_service, &doc.id, |d| {
        d.trip.status == TripStatus::Completed
    })
    .await;
    assert_eq!(
        completed.trip.commission_status,
        Some(CommissionStatus::Unpaid)
    );

    // La llegada al destino alimenta el ledger
    let debt = ctx.commission_service.outstanding_debt("d1").await.unwrap();
    assert_eq!(debt.amount, Decimal::from(2));
}

#[tokio::test]
async fn tracking_requires_matching_leg_and_driver() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    // Tramo equivocado para el estado actual
    let result = ctx
        .tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToDestination)
        .await;
    assert!(matches!(result, Err(AppError::StaleState(_))));

    // Conductor equivocado
    let result = ctx
        .tracking
        .start_tracking(&doc.id, "otro", TrackingLeg::ToPickup)
        .await;
    assert!(matches!(result, Err(AppError::NotOwner(_))));
}

#[tokio::test]
async fn samples_without_session_are_rejected() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    let result = ctx.tracking.push_sample(&doc.id, PICKUP).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn cancellation_tears_down_tracking() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    ctx.tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToPickup)
        .await
        .unwrap();

    // El pasajero cancela mientras el conductor viene en camino
    ctx.trip_service.cancel_trip(&doc.id, "p1").await.unwrap();

    // La próxima muestra encuentra el guard vencido y la sesión muere; las
    // siguientes se descartan con error
    let mut rejected = false;
    for _ in 0..100 {
        if ctx
            .tracking
            .push_sample(&doc.id, far_from_pickup())
            .await
            .is_err()
        {
            rejected = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(rejected, "tracking should stop after cancellation");

    let current = ctx.trip_service.get_trip(&doc.id).await.unwrap();
    assert_eq!(current.trip.status, TripStatus::Cancelled);
}

#[tokio::test]
async fn explicit_stop_removes_session() {
    let ctx = TestContext::new();
    ctx.seed_driver("d1", VehicleType::Sedan).await;

    let doc = ctx
        .accepted_trip("p1", "d1", VehicleType::Sedan, Decimal::from(20))
        .await;

    ctx.tracking
        .start_tracking(&doc.id, "d1", TrackingLeg::ToPickup)
        .await
        .unwrap();
    assert_eq!(ctx.tracking.active_sessions().await, 1);

    ctx.tracking.stop_tracking(&doc.id).await;
    assert_eq!(ctx.tracking.active_sessions().await, 0);

    let result = ctx.tracking.push_sample(&doc.id, PICKUP).await;
    assert!(result.is_err());
}
