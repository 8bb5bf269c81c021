use serde::{Deserialize, Serialize};

use super::{Conversation, Version};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub initial_prompt: String,
    pub current_code: Option<String>,
    /// 현재 활성 버전에 대한 약한 참조. 직접 따라가지 말고
    /// `db::find_project_version`으로 조회해서 사용합니다.
    pub current_version_id: Option<String>,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    /// 프롬프트로부터 프로젝트 이름을 만듭니다. 50자를 넘으면 앞 45자 + "..."
    pub fn name_from_prompt(prompt: &str) -> String {
        let prompt = prompt.trim();
        if prompt.chars().count() > 50 {
            let head: String = prompt.chars().take(45).collect();
            format!("{}...", head)
        } else {
            prompt.to_string()
        }
    }
}

/// 공개 프로젝트 목록의 항목 (작성자 이름 포함)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublishedProject {
    pub id: String,
    pub name: String,
    pub initial_prompt: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub updated_at: String,
}

/// `GET /projects/{id}` 응답: 프로젝트 + 대화 기록 + 버전 목록
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub conversation: Vec<Conversation>,
    pub versions: Vec<Version>,
}

#[derive(Debug, Serialize)]
pub struct ProjectPreview {
    #[serde(flatten)]
    pub project: Project,
    pub versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub initial_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub revision_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveCodeRequest {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_is_used_as_name() {
        assert_eq!(
            Project::name_from_prompt("a landing page for a bakery"),
            "a landing page for a bakery"
        );
    }

    #[test]
    fn long_prompt_is_truncated_on_char_boundary() {
        let prompt = "빵".repeat(60);
        let name = Project::name_from_prompt(&prompt);
        assert_eq!(name.chars().count(), 48);
        assert!(name.ends_with("..."));
    }
}
