//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `user`: 사용자와 크레딧 잔액
//! - `project`: 웹사이트 프로젝트와 요청/응답 타입
//! - `conversation`: 프로젝트 대화 기록(감사 로그) 항목
//! - `version`: 생성된 코드의 불변 스냅샷
//! - `transaction`: 크레딧 구매 트랜잭션과 요금제

pub mod conversation;
pub mod project;
pub mod transaction;
pub mod user;
pub mod version;

pub use conversation::*;
pub use project::*;
pub use transaction::*;
pub use user::*;
pub use version::*;
