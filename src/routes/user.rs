use axum::{extract::State, Json};

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    services::payments::APP_ID,
};

use super::projects::AppState;

/// `GET /user/credits`
pub async fn get_credits(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<CreditsResponse>, AppError> {
    let credits = db::get_credits(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(CreditsResponse { credits }))
}

/// `POST /user/purchase-credits` — 미결제 트랜잭션을 만들고, 결제 세션에 실을 메타데이터를 돌려줍니다.
/// 실제 크레딧 적립은 결제 웹훅에서 이루어집니다.
pub async fn purchase_credits(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<PurchaseCreditsRequest>,
) -> Result<Json<PurchaseCreditsResponse>, AppError> {
    let plan = Plan::find(&req.plan_id)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown plan: {}", req.plan_id)))?;

    let transaction = db::create_transaction(&state.pool, &auth_user.user_id, &plan).await?;
    tracing::info!(
        transaction_id = %transaction.id,
        user_id = %auth_user.user_id,
        plan = plan.id,
        "credit purchase started"
    );

    Ok(Json(PurchaseCreditsResponse {
        transaction_id: transaction.id.clone(),
        plan,
        metadata: PaymentMetadata {
            transaction_id: Some(transaction.id),
            app_id: Some(APP_ID.to_string()),
        },
    }))
}
