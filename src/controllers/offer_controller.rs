//! Controller de ofertas
//!
//! Pool de solicitudes, envío de ofertas y respuesta del pasajero.

use std::sync::Arc;

use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::offer_dto::{PoolQuery, PoolResponse, SubmitOfferRequest};
use crate::dto::trip_dto::{DriverActionRequest, PassengerActionRequest};
use crate::models::trip::TripDoc;
use crate::services::offer_service::{OfferDecision, PoolView};
use crate::services::OfferService;
use crate::utils::errors::AppError;

pub struct OfferController {
    service: Arc<OfferService>,
}

impl OfferController {
    pub fn new(service: Arc<OfferService>) -> Self {
        Self { service }
    }

    pub async fn pool(&self, query: PoolQuery) -> Result<PoolResponse, AppError> {
        let view = self
            .service
            .list_pending_trips(query.vehicle_type, query.driver_id.as_deref())
            .await?;

        Ok(match view {
            PoolView::Pool(requests) => PoolResponse {
                active_trip: None,
                requests,
            },
            PoolView::ActiveTrip(trip) => PoolResponse {
                active_trip: Some(trip),
                requests: Vec::new(),
            },
        })
    }

    pub async fn submit(
        &self,
        trip_id: &str,
        request: SubmitOfferRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .submit_offer(
                trip_id,
                &request.driver_id,
                request.price,
                request.driver_location.map(Into::into),
            )
            .await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "Oferta enviada. Esperando al pasajero.".to_string(),
        ))
    }

    pub async fn accept(
        &self,
        trip_id: &str,
        request: PassengerActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .respond_to_offer(trip_id, &request.user_id, OfferDecision::Accept)
            .await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "¡Oferta aceptada! El conductor va en camino.".to_string(),
        ))
    }

    pub async fn decline(
        &self,
        trip_id: &str,
        request: PassengerActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .respond_to_offer(trip_id, &request.user_id, OfferDecision::Decline)
            .await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "Oferta rechazada. Buscando otro conductor...".to_string(),
        ))
    }

    pub async fn release(
        &self,
        trip_id: &str,
        request: DriverActionRequest,
    ) -> Result<ApiResponse<TripDoc>, AppError> {
        request.validate()?;
        let trip = self
            .service
            .release_trip(trip_id, &request.driver_id)
            .await?;
        Ok(ApiResponse::success_with_message(
            trip,
            "Viaje liberado. Volvió al pool de solicitudes.".to_string(),
        ))
    }
}
