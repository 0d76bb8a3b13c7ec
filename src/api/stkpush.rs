use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::value::RawValue;
use tracing::{info, warn};

use super::{error::ApiError, AppState};
use crate::payments::types::PaymentRequest;

/// `POST /stkpush`
///
/// Validates the body, then hands it to the payment provider, which fetches a
/// token and forwards the push. The provider's acknowledgement is relayed
/// unchanged with 200.
pub async fn initiate_stk_push(
    State(state): State<AppState>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<Box<RawValue>>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!("Unreadable STK push body: {}", rejection);
        ApiError::Validation
    })?;

    let request = request.validate().ok_or(ApiError::Validation)?;

    info!(
        "STK push requested: amount={} reference={}",
        request.amount, request.account_reference
    );

    let response = state.provider.initiate_stk_push(request).await?;
    Ok(Json(response))
}
