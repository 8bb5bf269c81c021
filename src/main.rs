//! # Wizardry 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성 + 마이그레이션
//! 4. 언어 모델 completion 클라이언트 생성
//! 5. API 라우터 설정 (`build_router`)
//! 6. HTTP 서버 시작

// ── 모듈 선언 ──
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    http::HeaderValue,
    routing::{get, patch, post, put},
    Router,
};
use config::Config;
use routes::*;
use services::{completion::OpenAiCompletionClient, JobRegistry, ProjectLocks};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 wizardry, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wizardry=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting Wizardry server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    // 데이터베이스 파일이 없으면 새로 만듭니다.
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    // ── 5단계: 데이터베이스 마이그레이션 실행 ──
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // ── 6단계: completion 클라이언트 생성 ──
    let completion = OpenAiCompletionClient::new(
        &config.completion_api_url,
        &config.completion_api_key,
        &config.completion_model,
        Duration::from_secs(config.completion_timeout_secs),
    )?;
    tracing::info!(
        model = %config.completion_model,
        url = %config.completion_api_url,
        "completion client ready"
    );
    if config.payment_webhook_secret.is_none() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET is not set, payment webhooks are disabled");
    }

    // ── 7단계: 애플리케이션 상태(State) 생성 ──
    let state = AppState {
        pool: pool.clone(),
        jwt_secret: config.jwt_secret.clone(),
        completion: Arc::new(completion),
        jobs: JobRegistry::default(),
        locks: ProjectLocks::default(),
        signup_credits: config.signup_credits,
        payment_webhook_secret: config.payment_webhook_secret.clone(),
    };

    // ── 8단계: 라우터 + 미들웨어 ──
    let app = build_router(state, &config.trusted_origins, Some(&config.frontend_dist));

    // ── 9단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `/api/v1` 아래의 모든 API 라우트
fn api_routes(state: AppState) -> Router {
    Router::new()
        // 사용자: 크레딧, 크레딧 구매, 내 프로젝트
        .route("/user/credits", get(get_credits))
        .route("/user/purchase-credits", post(purchase_credits))
        .route("/user/projects", get(list_user_projects))
        // 프로젝트 생성/조회/삭제
        .route("/projects", post(create_project))
        .route("/projects/{id}", get(get_project).delete(delete_project))
        .route("/projects/{id}/preview", get(get_project_preview))
        .route("/projects/{id}/status", get(get_job_status))
        .route("/projects/{id}/publish", patch(toggle_publish))
        .route("/projects/{id}/code", put(save_project_code))
        // 수정 요청과 버전 관리
        .route("/projects/{id}/revisions", post(make_revision))
        .route("/projects/{id}/versions", get(list_project_versions))
        .route(
            "/projects/{id}/versions/{version_id}/rollback",
            post(rollback_version),
        )
        // 공개 프로젝트 (인증 불필요)
        .route("/published", get(list_published_projects))
        .route("/published/{id}", get(get_published_code))
        // 결제 웹훅 (서명으로 인증)
        .route("/webhooks/payment", post(payment_webhook))
        // 헬스체크
        .route("/health", get(health_check))
        .with_state(state)
}

/// API 라우트에 CORS/로깅 미들웨어를 붙이고, 프론트엔드 빌드가 있으면 함께 서빙합니다.
///
/// `trusted_origins`가 비어 있으면 모든 출처를 허용합니다.
fn build_router(state: AppState, trusted_origins: &[String], frontend_dist: Option<&str>) -> Router {
    let origins: Vec<HeaderValue> = trusted_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid trusted origin");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new().nest("/api/v1", api_routes(state));

    // SPA이므로 찾을 수 없는 경로는 index.html로 돌려보냅니다.
    let router = match frontend_dist.filter(|dist| Path::new(dist).exists()) {
        Some(dist) => {
            tracing::info!("Serving frontend static files from {}", dist);
            let serve_dir = ServeDir::new(dist)
                .not_found_service(ServeFile::new(Path::new(dist).join("index.html")));
            router.fallback_service(serve_dir)
        }
        None => {
            tracing::warn!("Frontend dist directory not found, serving API only");
            router
        }
    };

    router.layer(cors).layer(TraceLayer::new_for_http())
}
