//! # 비즈니스 로직 모듈
//!
//! - `completion`: 언어 모델 호출 트레이트와 HTTP 구현
//! - `enhance`: 프롬프트 보강 단계
//! - `generate`: HTML 코드 생성 단계
//! - `pipeline`: 크레딧 차감부터 버전 저장까지 이어지는 상태 기계
//! - `jobs`: 백그라운드 생성 작업 상태 레지스트리
//! - `locks`: 프로젝트별 변경 잠금
//! - `payments`: 결제 웹훅 서명 검증과 크레딧 적립

pub mod completion;
pub mod enhance;
pub mod generate;
pub mod jobs;
pub mod locks;
pub mod payments;
pub mod pipeline;

pub use jobs::{JobRegistry, JobStatus};
pub use locks::ProjectLocks;
pub use pipeline::Pipeline;
