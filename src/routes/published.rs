//! 공개 프로젝트 조회 (인증 불필요)

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{db, error::AppError};

use super::projects::AppState;

/// `GET /published` — 커뮤니티 화면에 보여 줄 공개 프로젝트 목록
pub async fn list_published_projects(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let projects = db::list_published_projects(&state.pool).await?;
    Ok(Json(json!({ "projects": projects })))
}

/// `GET /published/{id}` — 공개 프로젝트의 현재 코드.
/// 비공개이거나 아직 코드가 없으면 404.
pub async fn get_published_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let code = db::get_project(&state.pool, &id)
        .await?
        .filter(|project| project.is_published)
        .and_then(|project| project.current_code)
        .filter(|code| !code.is_empty())
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({ "code": code })))
}
