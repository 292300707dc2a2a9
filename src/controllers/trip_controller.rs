//! Controller de viajes
//!
//! Orquesta las operaciones del ciclo de vida del viaje: creación,
//! cancelación y las transiciones del conductor, más el historial.

use std::sync::Arc;

use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{
    CreateTripRequest, DriverActionRequest, HistoryEntryResponse, PassengerActionRequest,
};
use crate::models::trip::TripDoc;
use crate::services::trip_service::NewTripRequest;
use crate::services::TripService;
use crate::utils::errors::AppError;

pub struct TripController {
    service: Arc<TripService>,
}

impl TripController {
    pub fn new(service: Arc<TripService>) -> Self {
        Self { service }
    }

    pub async fn create(
        &self,
        request: CreateTripRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;

        let trip = self
            .service
            .request_trip(NewTripRequest {
                user_id: request.user_id,
                user_name: request.user_name,
                user_email: request.user_email,
                user_photo: request.user_photo,
                user_phone: request.user_phone,
                vehicle_type: request.vehicle_type,
                pickup: request.pickup.into(),
                pickup_address: request.pickup_address,
                destination: request.destination.into(),
            })
            .await?;

        Ok(ApiResponse::success_with_message(
            trip,
            "¡Buscando tu taxi!".to_string(),
        ))
    }

    pub async fn get(&self, trip_id: &str) -> Result<TripDoc, AppError> {
        self.service.get_trip(trip_id).await
    }

    pub async fn cancel(
        &self,
        trip_id: &str,
        request: PassengerActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self.service.cancel_trip(trip_id, &request.user_id).await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "Viaje cancelado correctamente.".to_string(),
        ))
    }

    pub async fn driver_arrived(
        &self,
        trip_id: &str,
        request: DriverActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .driver_arrived(trip_id, &request.driver_id)
            .await?;
        Ok(ApiResponse::success(trip))
    }

    pub async fn start(
        &self,
        trip_id: &str,
        request: DriverActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self.service.start_trip(trip_id, &request.driver_id).await?;
        Ok(ApiResponse::success(trip))
    }

    pub async fn complete(
        &self,
        trip_id: &str,
        request: DriverActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .complete_trip(trip_id, &request.driver_id)
            .await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "¡Viaje completado con éxito!".to_string(),
        ))
    }

    pub async fn history(
        &self,
        user_id: &str,
    ) -> Result<Vec<HistoryEntryResponse>, AppError> {
        let entries = self.service.trip_history(user_id).await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }
}
