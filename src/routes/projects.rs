//! # 프로젝트(Project) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST   /api/v1/projects`              → 새 프로젝트 생성 (생성 파이프라인 시작)
//! - `GET    /api/v1/projects/{id}`         → 프로젝트 + 대화 기록 + 버전 목록
//! - `DELETE /api/v1/projects/{id}`         → 프로젝트 삭제
//! - `GET    /api/v1/projects/{id}/preview` → 미리보기용 프로젝트 + 버전 목록
//! - `GET    /api/v1/projects/{id}/status`  → 백그라운드 생성 작업 상태
//! - `PATCH  /api/v1/projects/{id}/publish` → 공개 여부 전환
//! - `PUT    /api/v1/projects/{id}/code`    → 코드 직접 저장 (파이프라인 우회)
//! - `GET    /api/v1/user/projects`         → 내 프로젝트 목록
//!
//! 모든 핸들러는 `AuthUser`로 요청자를 확인하고, 다른 사용자의 프로젝트는
//! 존재하지 않는 것과 똑같이 404로 응답합니다.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    services::{completion::CompletionClient, JobRegistry, JobStatus, Pipeline, ProjectLocks},
};

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 외부 협력자(DB 풀, completion 클라이언트)는 main에서 만들어 여기에 주입합니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀 (내부적으로 Arc로 공유)
    pub pool: SqlitePool,
    /// 외부 인증 서비스와 공유하는 JWT 검증 키
    pub jwt_secret: String,
    pub completion: Arc<dyn CompletionClient>,
    pub jobs: JobRegistry,
    pub locks: ProjectLocks,
    /// 처음 보는 사용자에게 지급할 크레딧
    pub signup_credits: i64,
    /// None이면 결제 웹훅을 받지 않습니다.
    pub payment_webhook_secret: Option<String>,
}

/// `POST /projects` — 새 프로젝트를 만들고 생성 파이프라인을 시작합니다.
///
/// 크레딧 차감과 사용자 메시지 기록까지는 요청 안에서 처리하고,
/// 프롬프트 보강 이후 단계는 백그라운드 작업으로 넘긴 뒤 즉시 202를 응답합니다.
/// 진행 상황은 대화 기록이나 `GET /projects/{id}/status`로 확인합니다.
pub async fn create_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let prompt = req.initial_prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::BadRequest("Initial prompt is required".to_string()));
    }

    let mut pipeline = Pipeline::creation(
        state.pool.clone(),
        state.completion.clone(),
        &auth_user.user_id,
        prompt,
    );
    // 크레딧을 차감하기 전에 미리 정해 둔 프로젝트 ID로 잠금을 잡습니다.
    let guard = state.locks.try_acquire(pipeline.project_id())?;
    let project = pipeline.start().await?;

    state.jobs.spawn(&project.id, async move {
        let _guard = guard;
        pipeline.finish().await
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "projectId": project.id, "project": project })),
    ))
}

/// `GET /projects/{id}` — 프로젝트와 대화 기록(시간순), 버전 목록(생성순)
pub async fn get_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, AppError> {
    let project = db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let conversation = db::list_messages(&state.pool, &id).await?;
    let versions = db::list_versions(&state.pool, &id).await?;

    Ok(Json(ProjectDetail {
        project,
        conversation,
        versions,
    }))
}

/// `GET /user/projects` — 내 프로젝트 목록 (최근 수정순)
pub async fn list_user_projects(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let projects = db::list_user_projects(&state.pool, &auth_user.user_id).await?;
    Ok(Json(json!({ "projects": projects })))
}

/// `DELETE /projects/{id}` — 대화 기록과 버전까지 모두 삭제합니다.
/// 생성 작업이 진행 중이면 409.
pub async fn delete_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let _guard = state.locks.try_acquire(&id)?;
    if !db::delete_project(&state.pool, &id, &auth_user.user_id).await? {
        return Err(AppError::NotFound);
    }

    state.jobs.forget(&id);
    tracing::info!(project_id = %id, user_id = %auth_user.user_id, "project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /projects/{id}/preview` — 미리보기 화면용 (대화 기록 제외)
pub async fn get_project_preview(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectPreview>, AppError> {
    let project = db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let versions = db::list_versions(&state.pool, &id).await?;

    Ok(Json(ProjectPreview { project, versions }))
}

/// `GET /projects/{id}/status` — 이 서버 프로세스에서 시작된 생성 작업의 상태
pub async fn get_job_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, AppError> {
    db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = state.jobs.status(&id).ok_or(AppError::NotFound)?;
    Ok(Json(status))
}

/// `PATCH /projects/{id}/publish` — 공개/비공개를 전환합니다.
pub async fn toggle_publish(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let project = db::toggle_publish(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let message = if project.is_published {
        "Project published successfully"
    } else {
        "Project unpublished"
    };
    Ok(Json(json!({ "message": message, "isPublished": project.is_published })))
}

/// `PUT /projects/{id}/code` — 편집기에서 수정한 코드를 그대로 저장합니다.
///
/// 크레딧을 쓰지 않고 버전도 만들지 않습니다. 저장된 코드는 어떤 버전과도
/// 일치하지 않으므로 현재 버전 포인터를 비웁니다.
pub async fn save_project_code(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<SaveCodeRequest>,
) -> Result<Json<Value>, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("Code is required".to_string()));
    }

    db::get_user_project(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let _guard = state.locks.try_acquire(&id)?;
    db::set_current_code(&state.pool, &id, &req.code, None).await?;

    Ok(Json(json!({ "message": "Project saved successfully" })))
}
