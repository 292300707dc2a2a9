//! Rutas de facturación

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::PaymentController;
use crate::dto::common::ApiResponse;
use crate::dto::payment_dto::{
    DebtQuery, DebtResponse, RejectPaymentRequest, ReportPaymentRequest,
};
use crate::models::payment::PaymentDoc;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_billing_router() -> Router<AppState> {
    Router::new()
        .route("/debt", get(outstanding_debt))
        .route("/payments", post(report_payment).get(list_payments))
        .route("/payments/:id/approve", post(approve_payment))
        .route("/payments/:id/reject", post(reject_payment))
}

async fn outstanding_debt(
    State(state): State<AppState>,
    Query(query): Query<DebtQuery>,
) -> Result<Json<DebtResponse>, AppError> {
    let controller = PaymentController::new(state.commission_service.clone());
    Ok(Json(controller.outstanding_debt(&query.driver_id).await?))
}

async fn report_payment(
    State(state): State<AppState>,
    Json(request): Json<ReportPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentDoc>>, AppError> {
    let controller = PaymentController::new(state.commission_service.clone());
    Ok(Json(controller.report(request).await?))
}

async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentDoc>>, AppError> {
    let controller = PaymentController::new(state.commission_service.clone());
    Ok(Json(controller.list().await?))
}

async fn approve_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PaymentDoc>>, AppError> {
    let controller = PaymentController::new(state.commission_service.clone());
    Ok(Json(controller.approve(&id).await?))
}

async fn reject_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RejectPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentDoc>>, AppError> {
    let controller = PaymentController::new(state.commission_service.clone());
    Ok(Json(controller.reject(&id, request).await?))
}
