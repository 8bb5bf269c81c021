//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! 생성 파이프라인 관점의 분류:
//! - `Unauthorized`, `InsufficientCredits`, `NotFound`, `BadRequest`, `Conflict`:
//!   상태를 변경하기 전에 거부되는 클라이언트 에러
//! - `GenerationFailure`: 모델이 빈 결과를 돌려준 경우. 크레딧 환불 +
//!   대화 기록에 실패 메시지를 남깁니다.
//! - 그 외(`Completion`, `Database`, `Internal`): 예상하지 못한 실패.
//!   크레딧은 환불하되 클라이언트에는 일반적인 메시지만 반환합니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::completion::CompletionError;
use crate::services::pipeline::FAILURE_MESSAGE;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없거나 요청자 소유가 아님 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 크레딧 부족 (HTTP 403). 차감 전에 반환되므로 잔액은 변하지 않습니다.
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// 같은 프로젝트에 대해 다른 생성 작업이 진행 중 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 모델이 비어 있거나 쓸 수 없는 결과를 반환함 (HTTP 502)
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    /// completion 엔드포인트 호출 실패 (HTTP 502)
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx::Error → AppError::Database 자동 변환 (`?` 연산자와 함께 사용)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// 파이프라인이 대화 기록에 "생성 실패" 메시지를 남겨야 하는 에러인지 여부
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, AppError::GenerationFailure(_))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InsufficientCredits => (StatusCode::FORBIDDEN, "insufficient_credits"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::GenerationFailure(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
            AppError::Completion(_) => (StatusCode::BAD_GATEWAY, "completion_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        }
    }

    /// 클라이언트에게 보여 줄 메시지.
    /// 내부 에러(Database, Completion, Internal)와 생성 실패는 고정 문구로 바꿉니다.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::NotFound | AppError::InsufficientCredits => self.to_string(),
            AppError::GenerationFailure(_) => FAILURE_MESSAGE.to_string(),
            AppError::Completion(_) => "The language model request failed".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            AppError::Database(_) => "A database error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러의 실제 내용은 로그에만 기록하고,
    /// 클라이언트에는 `public_message`만 반환합니다.
    fn into_response(self) -> Response {
        match &self {
            AppError::GenerationFailure(msg) => tracing::warn!("Generation failure: {}", msg),
            AppError::Completion(e) => tracing::error!("Completion error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            _ => {}
        }

        let (status, code) = self.status_and_code();

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.public_message()
            }
        }));

        (status, body).into_response()
    }
}
