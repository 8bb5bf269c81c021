//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: 인증 서비스와 공유하는 JWT 검증 키 (필수)
//! - `COMPLETION_API_KEY`: 언어 모델 API 키 (필수)
//! - `COMPLETION_API_URL`: OpenAI 호환 API 주소
//! - `COMPLETION_MODEL`: 사용할 모델 이름
//! - `COMPLETION_TIMEOUT_SECS`: 모델 호출 타임아웃(초)
//! - `PAYMENT_WEBHOOK_SECRET`: 결제 웹훅 서명 키 (없으면 웹훅 비활성)
//! - `SIGNUP_CREDITS`: 처음 보는 사용자에게 지급할 크레딧
//! - `TRUSTED_ORIGINS`: CORS 허용 출처 (쉼표 구분)
//! - `FRONTEND_DIST`: 빌드된 프론트엔드 디렉토리
//! - `HOST`, `PORT`: 서버 바인딩 주소

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/wizardry.db?mode=rwc")
    pub database_url: String,
    pub jwt_secret: String,
    pub completion_api_key: String,
    /// 예: "https://openrouter.ai/api/v1"
    pub completion_api_url: String,
    pub completion_model: String,
    pub completion_timeout_secs: u64,
    pub payment_webhook_secret: Option<String>,
    pub signup_credits: i64,
    /// 비어 있으면 모든 출처를 허용합니다.
    pub trusted_origins: Vec<String>,
    pub frontend_dist: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`, `JWT_SECRET`, `COMPLETION_API_KEY`는 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            completion_api_key: env::var("COMPLETION_API_KEY")?,

            completion_api_url: env::var("COMPLETION_API_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            completion_model: env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "tngtech/deepseek-r1t2-chimera:free".to_string()),
            completion_timeout_secs: env::var("COMPLETION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(180),

            // 빈 문자열은 설정하지 않은 것으로 취급합니다.
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            signup_credits: env::var("SIGNUP_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            trusted_origins: env::var("TRUSTED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),

            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }
}

/// "https://a.com, https://b.com" → ["https://a.com", "https://b.com"]
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("https://a.com, https://b.com,,"),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }
}
