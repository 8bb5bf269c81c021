use serde::{Deserialize, Serialize};

/// 생성 파이프라인이 만들어 낸 HTML 문서의 불변 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Version {
    pub id: String,
    pub project_id: String,
    pub version_number: i64,
    pub code: String,
    pub description: String,
    pub timestamp: String,
}
