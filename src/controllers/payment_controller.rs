//! Controller de facturación
//!
//! Deuda pendiente del conductor y ciclo reporte → aprobación/rechazo.

use std::sync::Arc;

use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::payment_dto::{DebtResponse, RejectPaymentRequest, ReportPaymentRequest};
use crate::models::payment::PaymentDoc;
use crate::services::CommissionService;
use crate::utils::errors::AppError;

pub struct PaymentController {
    service: Arc<CommissionService>,
}

impl PaymentController {
    pub fn new(service: Arc<CommissionService>) -> Self {
        Self { service }
    }

    pub async fn outstanding_debt(&self, driver_id: &str) -> Result<DebtResponse, AppError> {
        let debt = self.service.outstanding_debt(driver_id).await?;
        Ok(DebtResponse::from_debt(debt))
    }

    pub async fn report(
        &self,
        request: ReportPaymentRequest,
    ) -> Result<ApiResponse<PaymentDoc>, AppError> {
        request.validate()?;
        let payment = self
            .service
            .report_payment(&request.driver_id, &request.reference_number)
            .await?;
        Ok(ApiResponse::success_with_message(
            payment,
            "Pago reportado exitosamente. Tu pago está sujeto a verificación.".to_string(),
        ))
    }

    pub async fn list(&self) -> Result<Vec<PaymentDoc>, AppError> {
        self.service.list_payments().await
    }

    pub async fn approve(&self, payment_id: &str) -> Result<ApiResponse<PaymentDoc>, AppError> {
        let payment = self.service.approve_payment(payment_id).await?;
        Ok(ApiResponse::success_with_message(
            payment,
            "Pago aprobado correctamente.".to_string(),
        ))
    }

    pub async fn reject(
        &self,
        payment_id: &str,
        request: RejectPaymentRequest,
    ) -> Result<ApiResponse<PaymentDoc>, AppError> {
        let payment = self
            .service
            .reject_payment(payment_id, request.reason)
            .await?;
        Ok(ApiResponse::success_with_message(
            payment,
            "Pago rechazado. La deuda ha vuelto a ser pendiente para el conductor.".to_string(),
        ))
    }
}
