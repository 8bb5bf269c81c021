//! 추가 전용(append-only) 대화 기록.
//!
//! 수정/삭제 함수는 의도적으로 두지 않습니다. 항목은 프로젝트 삭제 시에만 함께 사라집니다.

use crate::error::AppError;
use crate::models::{Conversation, Role};
use sqlx::{SqliteExecutor, SqlitePool};

pub async fn append_message<'e, E>(
    executor: E,
    project_id: &str,
    role: Role,
    content: &str,
) -> Result<Conversation, AppError>
where
    E: SqliteExecutor<'e>,
{
    let id = uuid::Uuid::now_v7().to_string();

    let entry = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (id, project_id, role, content)
        VALUES (?, ?, ?, ?)
        RETURNING id, project_id, role, content, timestamp
        "#,
    )
    .bind(&id)
    .bind(project_id)
    .bind(role)
    .bind(content)
    .fetch_one(executor)
    .await?;

    Ok(entry)
}

/// 타임스탬프 오름차순. 같은 밀리초에 기록된 항목은 삽입 순서를 따릅니다.
pub async fn list_messages(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<Conversation>, AppError> {
    let entries = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, project_id, role, content, timestamp
        FROM conversations
        WHERE project_id = ?
        ORDER BY timestamp ASC, rowid ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_project;
    use crate::db::testing::{seed_user, test_pool};

    #[tokio::test]
    async fn messages_come_back_in_insertion_order() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 10).await;
        let project = create_project(&pool, "project-1", "u1", "Site", "site").await.unwrap();

        append_message(&pool, &project.id, Role::User, "first").await.unwrap();
        append_message(&pool, &project.id, Role::Assistant, "second").await.unwrap();
        append_message(&pool, &project.id, Role::Assistant, "third").await.unwrap();

        let entries = list_messages(&pool, &project.id).await.unwrap();
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(entries[0].role, Role::User);

        // 쓰기 없이 반복 조회하면 같은 결과
        assert_eq!(list_messages(&pool, &project.id).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn append_to_missing_project_fails() {
        let pool = test_pool().await;
        let err = append_message(&pool, "nope", Role::User, "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
