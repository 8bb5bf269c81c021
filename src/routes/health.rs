//! # 헬스체크(Health Check) 핸들러
//!
//! - `GET /api/v1/health` → `{ "status": "ok" }`
//!
//! DB에 간단한 쿼리를 보내 연결 풀이 살아 있는지도 함께 확인합니다.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;

use super::projects::AppState;

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(json!({
        "status": "ok"
    })))
}
