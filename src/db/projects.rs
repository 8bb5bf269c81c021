//! # 프로젝트 데이터베이스 쿼리 모듈
//!
//! `projects` 테이블의 생성/조회/수정/삭제 쿼리입니다.
//! 요청자 소유 여부는 항상 `user_id` 조건으로 함께 확인하며,
//! 소유자가 아니면 "없음"(None)과 같은 결과를 돌려줍니다.

use crate::error::AppError;
use crate::models::{Project, PublishedProject};
use sqlx::{SqliteExecutor, SqlitePool};

/// 새 프로젝트를 생성하고, 생성된 행을 그대로 반환합니다.
/// (`RETURNING` 절로 INSERT와 조회를 한 번에 처리)
///
/// `id`는 호출자가 정합니다. 생성 파이프라인은 행을 만들기 전에 이 ID로 프로젝트 잠금을 잡습니다.
pub async fn create_project<'e, E>(
    executor: E,
    id: &str,
    user_id: &str,
    name: &str,
    initial_prompt: &str,
) -> Result<Project, AppError>
where
    E: SqliteExecutor<'e>,
{
    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, user_id, name, initial_prompt)
        VALUES (?, ?, ?, ?)
        RETURNING id, user_id, name, initial_prompt, current_code, current_version_id,
                  is_published, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(initial_prompt)
    .fetch_one(executor)
    .await?;

    Ok(project)
}

/// 요청자 소유의 프로젝트를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Project))`: 프로젝트가 있고 요청자 소유인 경우
/// - `Ok(None)`: 없거나 다른 사용자의 프로젝트인 경우
pub async fn get_user_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, user_id, name, initial_prompt, current_code, current_version_id,
               is_published, created_at, updated_at
        FROM projects
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

/// 소유자 확인 없이 ID로 조회합니다. 공개 프로젝트 조회에만 사용합니다.
pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, user_id, name, initial_prompt, current_code, current_version_id,
               is_published, created_at, updated_at
        FROM projects
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

/// 사용자의 모든 프로젝트 (최근 수정순)
pub async fn list_user_projects(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Project>, AppError> {
    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, user_id, name, initial_prompt, current_code, current_version_id,
               is_published, created_at, updated_at
        FROM projects
        WHERE user_id = ?
        ORDER BY updated_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(projects)
}

/// 공개된 프로젝트 목록 (작성자 이름 포함)
pub async fn list_published_projects(pool: &SqlitePool) -> Result<Vec<PublishedProject>, AppError> {
    let projects = sqlx::query_as::<_, PublishedProject>(
        r#"
        SELECT p.id, p.name, p.initial_prompt, p.user_id, u.name AS user_name, p.updated_at
        FROM projects p
        JOIN users u ON u.id = p.user_id
        WHERE p.is_published = 1
        ORDER BY p.updated_at DESC, p.rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(projects)
}

/// 현재 코드와 현재 버전 포인터를 함께 갱신합니다.
/// `version_id`가 None이면 포인터를 비웁니다 (수동 저장).
pub async fn set_current_code<'e, E>(
    executor: E,
    project_id: &str,
    code: &str,
    version_id: Option<&str>,
) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET current_code = ?, current_version_id = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(code)
    .bind(version_id)
    .bind(project_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// 공개 여부를 뒤집고 변경된 프로젝트를 반환합니다.
pub async fn toggle_publish(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET is_published = NOT is_published,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND user_id = ?
        RETURNING id, user_id, name, initial_prompt, current_code, current_version_id,
                  is_published, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

/// 프로젝트를 삭제합니다. 대화 기록과 버전은 `ON DELETE CASCADE`로 함께 삭제됩니다.
pub async fn delete_project(pool: &SqlitePool, id: &str, user_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, test_pool};
    use crate::db::{append_message, list_messages, list_versions, create_version};
    use crate::models::Role;

    #[tokio::test]
    async fn other_users_cannot_see_project() {
        let pool = test_pool().await;
        seed_user(&pool, "owner", 10).await;
        seed_user(&pool, "intruder", 10).await;

        let project = create_project(&pool, "project-1", "owner", "Bakery", "a bakery").await.unwrap();

        assert!(get_user_project(&pool, &project.id, "owner").await.unwrap().is_some());
        assert!(get_user_project(&pool, &project.id, "intruder").await.unwrap().is_none());
        assert!(toggle_publish(&pool, &project.id, "intruder").await.unwrap().is_none());
        assert!(!delete_project(&pool, &project.id, "intruder").await.unwrap());
    }

    #[tokio::test]
    async fn toggle_publish_flips_flag() {
        let pool = test_pool().await;
        seed_user(&pool, "owner", 10).await;
        let project = create_project(&pool, "project-2", "owner", "Bakery", "a bakery").await.unwrap();
        assert!(!project.is_published);

        let toggled = toggle_publish(&pool, &project.id, "owner").await.unwrap().unwrap();
        assert!(toggled.is_published);
        assert_eq!(list_published_projects(&pool).await.unwrap().len(), 1);

        let toggled = toggle_publish(&pool, &project.id, "owner").await.unwrap().unwrap();
        assert!(!toggled.is_published);
        assert!(list_published_projects(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_history() {
        let pool = test_pool().await;
        seed_user(&pool, "owner", 10).await;
        let project = create_project(&pool, "project-3", "owner", "Bakery", "a bakery").await.unwrap();
        append_message(&pool, &project.id, Role::User, "a bakery").await.unwrap();
        create_version(&pool, &project.id, "<html></html>", "Initial version").await.unwrap();

        assert!(delete_project(&pool, &project.id, "owner").await.unwrap());
        assert!(list_messages(&pool, &project.id).await.unwrap().is_empty());
        assert!(list_versions(&pool, &project.id).await.unwrap().is_empty());
    }
}
