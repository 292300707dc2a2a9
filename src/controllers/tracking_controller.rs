//! Controller de tracking
//!
//! Alta, muestras y teardown de la sesión de tracking de un viaje.

use std::sync::Arc;

use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{LocationSampleRequest, StartTrackingRequest, TrackingLegDto};
use crate::models::GeoPoint;
use crate::services::tracking_service::TrackingLeg;
use crate::services::TrackingService;
use crate::utils::errors::AppError;

pub struct TrackingController {
    service: Arc<TrackingService>,
}

impl TrackingController {
    pub fn new(service: Arc<TrackingService>) -> Self {
        Self { service }
    }

    pub async fn start(
        &self,
        trip_id: &str,
        request: StartTrackingRequest,
    ) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;

        let leg = match request.leg {
            TrackingLegDto::Pickup => TrackingLeg::ToPickup,
            TrackingLegDto::Destination => TrackingLeg::ToDestination,
        };
        self.service
            .start_tracking(trip_id, &request.driver_id, leg)
            .await?;

        Ok(ApiResponse::success_with_message(
            (),
            "Tracking iniciado.".to_string(),
        ))
    }

    pub async fn push_sample(
        &self,
        trip_id: &str,
        request: LocationSampleRequest,
    ) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;
        self.service
            .push_sample(
                trip_id,
                GeoPoint::new(request.latitude, request.longitude),
            )
            .await?;
        Ok(ApiResponse::success(()))
    }

    pub async fn stop(&self, trip_id: &str) -> ApiResponse<()> {
        self.service.stop_tracking(trip_id).await;
        ApiResponse::success_with_message((), "Tracking detenido.".to_string())
    }
}
