//! Rutas de viajes
//!
//! Un endpoint request/response por transición del ciclo de vida, más el
//! stream SSE de cambios en vivo que reemplaza a las suscripciones del
//! cliente.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;

use crate::controllers::{OfferController, TrackingController, TripController};
use crate::dto::common::ApiResponse;
use crate::dto::offer_dto::SubmitOfferRequest;
use crate::dto::trip_dto::{
    CreateTripRequest, DriverActionRequest, HistoryEntryResponse, HistoryQuery,
    LocationSampleRequest, PassengerActionRequest, StartTrackingRequest,
};
use crate::models::trip::TripDoc;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip).get(trip_history))
        .route("/:id", get(get_trip))
        .route("/:id/events", get(trip_events))
        .route("/:id/cancel", post(cancel_trip))
        .route("/:id/offers", post(submit_offer))
        .route("/:id/accept", post(accept_offer))
        .route("/:id/decline", post(decline_offer))
        .route("/:id/release", post(release_trip))
        .route("/:id/arrived", post(driver_arrived))
        .route("/:id/start", post(start_trip))
        .route("/:id/complete", post(complete_trip))
        .route("/:id/tracking/start", post(start_tracking))
        .route("/:id/tracking/stop", post(stop_tracking))
        .route("/:id/location", post(push_location))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(request): Json<CreateTripRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.create(request).await?))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TripDoc>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.get(&id).await?))
}

async fn trip_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.history(&query.user_id).await?))
}

/// Stream SSE de cambios de un viaje: estado, posición del conductor,
/// desenlace. El cliente corta la conexión para hacer teardown.
async fn trip_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Validar que el viaje exista antes de abrir el stream
    state.trip_service.get_trip(&id).await?;

    let subscription = state.trip_service.repository().subscribe_all().await?;

    let stream = futures::stream::unfold(
        (subscription, id),
        |(mut subscription, id)| async move {
            loop {
                match subscription.next().await {
                    Some(event) => {
                        // La suscripción es por colección; acá filtramos el
                        // documento que interesa
                        if event.id != id {
                            continue;
                        }
                        let payload =
                            serde_json::to_string(&event.data).unwrap_or_default();
                        let sse_event = Event::default().event("change").data(payload);
                        return Some((Ok::<_, Infallible>(sse_event), (subscription, id)));
                    }
                    None => return None,
                }
            }
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PassengerActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.cancel(&id, request).await?))
}

async fn submit_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitOfferRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = OfferController::new(state.offer_service.clone());
    Ok(Json(controller.submit(&id, request).await?))
}

async fn accept_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PassengerActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = OfferController::new(state.offer_service.clone());
    Ok(Json(controller.accept(&id, request).await?))
}

async fn decline_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PassengerActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = OfferController::new(state.offer_service.clone());
    Ok(Json(controller.decline(&id, request).await?))
}

async fn release_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DriverActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = OfferController::new(state.offer_service.clone());
    Ok(Json(controller.release(&id, request).await?))
}

async fn driver_arrived(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DriverActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.driver_arrived(&id, request).await?))
}

async fn start_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DriverActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.start(&id, request).await?))
}

async fn complete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DriverActionRequest>,
) -> Result<Json<ApiResponse<TripDoc>>, AppError> {
    let controller = TripController::new(state.trip_service.clone());
    Ok(Json(controller.complete(&id, request).await?))
}

async fn start_tracking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StartTrackingRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TrackingController::new(state.tracking.clone());
    Ok(Json(controller.start(&id, request).await?))
}

async fn stop_tracking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<()>> {
    let controller = TrackingController::new(state.tracking.clone());
    Json(controller.stop(&id).await)
}

async fn push_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LocationSampleRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TrackingController::new(state.tracking.clone());
    Ok(Json(controller.push_sample(&id, request).await?))
}
