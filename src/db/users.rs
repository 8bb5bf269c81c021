//! 사용자 조회와 크레딧 원장.
//!
//! 차감은 `credits >= amount` 조건을 건 단일 UPDATE로 처리합니다.
//! 확인과 차감 사이에 다른 요청이 끼어들 수 없으므로 잔액이 음수가 되지 않습니다.

use crate::error::AppError;
use crate::models::User;
use sqlx::{SqliteExecutor, SqlitePool};

/// 외부 인증 서비스의 사용자를 처음 보면 가입 크레딧과 함께 등록합니다.
/// 이미 있으면 아무것도 바꾸지 않습니다.
pub async fn ensure_user(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    email: Option<&str>,
    signup_credits: i64,
) -> Result<User, AppError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, credits)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(signup_credits)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve user".to_string()))
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, credits, total_creation, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_credits(pool: &SqlitePool, user_id: &str) -> Result<Option<i64>, AppError> {
    let credits = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(credits)
}

/// 잔액이 `amount` 이상일 때만 차감합니다. 부족하면 잔액을 건드리지 않고
/// `InsufficientCredits`를 반환합니다.
pub async fn debit_credits<'e, E>(executor: E, user_id: &str, amount: i64) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET credits = credits - ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND credits >= ?
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InsufficientCredits);
    }
    Ok(())
}

/// 무조건 적립합니다 (환불, 결제 완료).
pub async fn credit_credits<'e, E>(executor: E, user_id: &str, amount: i64) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET credits = credits + ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn increment_total_creation<'e, E>(executor: E, user_id: &str) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET total_creation = total_creation + 1 WHERE id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}
