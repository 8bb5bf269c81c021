//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인
//! - `projects`: 프로젝트 생성/조회/삭제/공개/저장, 공유 상태(`AppState`)
//! - `revisions`: 수정 요청, 버전 목록, 롤백
//! - `published`: 공개 프로젝트 조회 (인증 불필요)
//! - `user`: 크레딧 잔액과 크레딧 구매
//! - `webhooks`: 결제 완료 알림

pub mod health;
pub mod projects;
pub mod published;
pub mod revisions;
pub mod user;
pub mod webhooks;

pub use health::*;
pub use projects::*;
pub use published::*;
pub use revisions::*;
pub use user::*;
pub use webhooks::*;
