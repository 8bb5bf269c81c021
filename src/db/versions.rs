use crate::db::{append_message, set_current_code};
use crate::error::AppError;
use crate::models::{Role, Version};
use sqlx::{SqliteExecutor, SqlitePool};

pub const ROLLBACK_MESSAGE: &str = "I have rolled back your website to the selected version.";

pub async fn create_version<'e, E>(
    executor: E,
    project_id: &str,
    code: &str,
    description: &str,
) -> Result<Version, AppError>
where
    E: SqliteExecutor<'e>,
{
    let id = uuid::Uuid::now_v7().to_string();

    let version = sqlx::query_as::<_, Version>(
        r#"
        INSERT INTO versions (id, project_id, version_number, code, description)
        VALUES (
            ?, ?,
            (SELECT COALESCE(MAX(version_number), 0) + 1 FROM versions WHERE project_id = ?),
            ?, ?
        )
        RETURNING id, project_id, version_number, code, description, timestamp
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(project_id)
    .bind(code)
    .bind(description)
    .fetch_one(executor)
    .await?;

    Ok(version)
}

pub async fn list_versions(pool: &SqlitePool, project_id: &str) -> Result<Vec<Version>, AppError> {
    let versions = sqlx::query_as::<_, Version>(
        r#"
        SELECT id, project_id, version_number, code, description, timestamp
        FROM versions
        WHERE project_id = ?
        ORDER BY version_number ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// 프로젝트 안에서만 버전을 찾습니다. 다른 프로젝트의 버전 ID는 None.
pub async fn find_project_version<'e, E>(
    executor: E,
    project_id: &str,
    version_id: &str,
) -> Result<Option<Version>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let version = sqlx::query_as::<_, Version>(
        r#"
        SELECT id, project_id, version_number, code, description, timestamp
        FROM versions
        WHERE id = ? AND project_id = ?
        "#,
    )
    .bind(version_id)
    .bind(project_id)
    .fetch_optional(executor)
    .await?;

    Ok(version)
}

/// 새 버전을 저장하고 프로젝트의 현재 코드/버전 포인터를 그 버전으로 옮깁니다.
/// 두 쓰기는 하나의 트랜잭션으로 묶입니다.
pub async fn commit_version(
    pool: &SqlitePool,
    project_id: &str,
    code: &str,
    description: &str,
) -> Result<Version, AppError> {
    let mut tx = pool.begin().await?;

    let version = create_version(&mut *tx, project_id, code, description).await?;
    set_current_code(&mut *tx, project_id, &version.code, Some(&version.id)).await?;

    tx.commit().await?;
    Ok(version)
}

/// 이전 버전으로 되돌립니다.
///
/// 포인터와 현재 코드만 옮기고 새 버전은 만들지 않습니다.
/// 버전 목록은 "생성" 이력이지 포인터 이동 이력이 아닙니다.
pub async fn rollback_to_version(
    pool: &SqlitePool,
    project_id: &str,
    version_id: &str,
) -> Result<Version, AppError> {
    let mut tx = pool.begin().await?;

    let version = find_project_version(&mut *tx, project_id, version_id)
        .await?
        .ok_or(AppError::NotFound)?;

    set_current_code(&mut *tx, project_id, &version.code, Some(&version.id)).await?;
    append_message(&mut *tx, project_id, Role::Assistant, ROLLBACK_MESSAGE).await?;

    tx.commit().await?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, test_pool};
    use crate::db::{create_project, get_user_project, list_messages};

    #[tokio::test]
    async fn version_numbers_are_per_project() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let a = create_project(&pool, "project-1", "u1", "A", "a").await.unwrap();
        let b = create_project(&pool, "project-2", "u1", "B", "b").await.unwrap();

        let a1 = create_version(&pool, &a.id, "<p>a1</p>", "Initial version").await.unwrap();
        let a2 = create_version(&pool, &a.id, "<p>a2</p>", "Changes made").await.unwrap();
        let b1 = create_version(&pool, &b.id, "<p>b1</p>", "Initial version").await.unwrap();

        assert_eq!((a1.version_number, a2.version_number, b1.version_number), (1, 2, 1));
        let listed = list_versions(&pool, &a.id).await.unwrap();
        assert_eq!(listed, vec![a1, a2]);
    }

    #[tokio::test]
    async fn commit_moves_current_pointer() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let project = create_project(&pool, "project-3", "u1", "A", "a").await.unwrap();

        let version = commit_version(&pool, &project.id, "<p>v1</p>", "Initial version")
            .await
            .unwrap();

        let project = get_user_project(&pool, &project.id, "u1").await.unwrap().unwrap();
        assert_eq!(project.current_version_id.as_deref(), Some(version.id.as_str()));
        assert_eq!(project.current_code.as_deref(), Some("<p>v1</p>"));
    }

    #[tokio::test]
    async fn rollback_repoints_without_new_version() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let project = create_project(&pool, "project-4", "u1", "A", "a").await.unwrap();
        let v1 = commit_version(&pool, &project.id, "<p>v1</p>", "Initial version").await.unwrap();
        commit_version(&pool, &project.id, "<p>v2</p>", "Changes made").await.unwrap();

        let target = rollback_to_version(&pool, &project.id, &v1.id).await.unwrap();
        assert_eq!(target, v1);

        let project = get_user_project(&pool, &project.id, "u1").await.unwrap().unwrap();
        assert_eq!(project.current_version_id.as_deref(), Some(v1.id.as_str()));
        assert_eq!(project.current_code.as_deref(), Some("<p>v1</p>"));
        assert_eq!(list_versions(&pool, &project.id).await.unwrap().len(), 2);

        let log = list_messages(&pool, &project.id).await.unwrap();
        assert_eq!(log.last().map(|e| e.content.as_str()), Some(ROLLBACK_MESSAGE));
    }

    #[tokio::test]
    async fn rollback_to_foreign_version_is_not_found() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let mine = create_project(&pool, "project-5", "u1", "Mine", "mine").await.unwrap();
        let other = create_project(&pool, "project-6", "u1", "Other", "other").await.unwrap();
        let mine_v = commit_version(&pool, &mine.id, "<p>mine</p>", "Initial version").await.unwrap();
        let other_v = commit_version(&pool, &other.id, "<p>other</p>", "Initial version").await.unwrap();

        let err = rollback_to_version(&pool, &mine.id, &other_v.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let after = get_user_project(&pool, &mine.id, "u1").await.unwrap().unwrap();
        assert_eq!(after.current_version_id.as_deref(), Some(mine_v.id.as_str()));
        assert_eq!(after.current_code.as_deref(), Some("<p>mine</p>"));
        assert!(list_messages(&pool, &mine.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_reads_are_stable() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let project = create_project(&pool, "project-7", "u1", "A", "a").await.unwrap();
        commit_version(&pool, &project.id, "<p>v1</p>", "Initial version").await.unwrap();
        commit_version(&pool, &project.id, "<p>v2</p>", "Changes made").await.unwrap();

        let first = list_versions(&pool, &project.id).await.unwrap();
        let second = list_versions(&pool, &project.id).await.unwrap();
        assert_eq!(first, second);

        let first = get_user_project(&pool, &project.id, "u1").await.unwrap();
        let second = get_user_project(&pool, &project.id, "u1").await.unwrap();
        assert_eq!(first, second);
    }
}
