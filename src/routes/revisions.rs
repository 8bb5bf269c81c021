use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::RevisionRequest,
    services::Pipeline,
};

use super::projects::AppState;

/// `POST /projects/{id}/revisions` — 수정 파이프라인을 끝까지 실행하고 새 버전을 반환합니다.
pub async fn make_revision(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> Result<Json<Value>, AppError> {
    let prompt = req.revision_prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::BadRequest("Revision prompt is required".to_string()));
    }

    let project = db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // 잠금을 먼저 잡은 뒤 프로젝트를 다시 읽어야 다른 작업이 바꾼 현재 코드를 놓치지 않습니다.
    let _guard = state.locks.try_acquire(&id)?;
    let project = db::get_user_project(&state.pool, &project.id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut pipeline = Pipeline::revision(
        state.pool.clone(),
        state.completion.clone(),
        &auth_user.user_id,
        project,
        prompt,
    );
    let version = pipeline.run().await?;

    Ok(Json(json!({ "message": "Changes made successfully", "version": version })))
}

pub async fn list_project_versions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    // 소유권 확인
    db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let versions = db::list_versions(&state.pool, &id).await?;
    Ok(Json(json!({ "versions": versions })))
}

/// `POST /projects/{id}/versions/{version_id}/rollback`
pub async fn rollback_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let _guard = state.locks.try_acquire(&id)?;
    let version = db::rollback_to_version(&state.pool, &id, &version_id).await?;

    tracing::info!(project_id = %id, version_id = %version.id, "rolled back");
    Ok(Json(json!({ "message": "Rolled back successfully", "version": version })))
}
