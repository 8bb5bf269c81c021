use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{error::AppError, services::payments};

use super::projects::AppState;

const SIGNATURE_HEADERS: [&str; 2] = ["payment-signature", "stripe-signature"];

/// `POST /webhooks/payment` — 결제 완료 알림
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let Some(secret) = state.payment_webhook_secret.as_deref() else {
        tracing::warn!("payment webhook received but PAYMENT_WEBHOOK_SECRET is not set");
        return Err(AppError::NotFound);
    };

    let signature = SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing payment signature".to_string()))?;

    payments::handle_webhook(&state.pool, secret, signature, &body).await?;

    Ok(Json(json!({ "received": true })))
}
