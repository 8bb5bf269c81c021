//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)와 생성 파이프라인(services/pipeline)이 이 모듈을 호출합니다.
//!
//! 각 하위 모듈:
//! - `users`: 사용자 조회/등록과 크레딧 원장(차감/환불)
//! - `projects`: 프로젝트 CRUD, 공개 여부, 현재 코드 포인터
//! - `conversations`: 추가 전용(append-only) 대화 기록
//! - `versions`: 버전 저장소 (생성, 목록, 롤백)
//! - `transactions`: 크레딧 구매 트랜잭션
//!
//! 여러 쿼리를 하나의 DB 트랜잭션 안에서 실행해야 하는 함수는
//! `&SqlitePool` 대신 `SqliteExecutor`를 받습니다.

pub mod conversations;
pub mod projects;
pub mod transactions;
pub mod users;
pub mod versions;

pub use conversations::*;
pub use projects::*;
pub use transactions::*;
pub use users::*;
pub use versions::*;
