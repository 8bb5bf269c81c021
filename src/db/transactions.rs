use crate::db::credit_credits;
use crate::error::AppError;
use crate::models::{Plan, Transaction};
use sqlx::SqlitePool;

pub async fn create_transaction(
    pool: &SqlitePool,
    user_id: &str,
    plan: &Plan,
) -> Result<Transaction, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (id, user_id, plan_id, amount, credits)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, plan_id, amount, credits, is_paid, created_at, updated_at
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(plan.id)
    .bind(plan.amount)
    .bind(plan.credits)
    .fetch_one(pool)
    .await?;

    Ok(transaction)
}

/// 트랜잭션을 결제 완료로 표시하고 사용자에게 크레딧을 적립합니다.
///
/// 미결제 상태일 때만 갱신되므로 같은 결제 알림이 여러 번 와도 한 번만 적립됩니다.
/// 이미 처리됐거나 없는 트랜잭션이면 `Ok(None)`.
pub async fn complete_transaction(
    pool: &SqlitePool,
    transaction_id: &str,
) -> Result<Option<Transaction>, AppError> {
    let mut tx = pool.begin().await?;

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET is_paid = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND is_paid = 0
        RETURNING id, user_id, plan_id, amount, credits, is_paid, created_at, updated_at
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(transaction) = &transaction {
        credit_credits(&mut *tx, &transaction.user_id, transaction.credits).await?;
    }

    tx.commit().await?;
    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::get_credits;
    use crate::db::testing::{seed_user, test_pool};

    #[tokio::test]
    async fn completing_twice_credits_once() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 0).await;
        let plan = Plan::find("pro").unwrap();
        let transaction = create_transaction(&pool, "u1", &plan).await.unwrap();
        assert!(!transaction.is_paid);

        let paid = complete_transaction(&pool, &transaction.id).await.unwrap().unwrap();
        assert!(paid.is_paid);
        assert!(complete_transaction(&pool, &transaction.id).await.unwrap().is_none());

        assert_eq!(get_credits(&pool, "u1").await.unwrap(), Some(plan.credits));
    }

    #[tokio::test]
    async fn unknown_transaction_is_ignored() {
        let pool = test_pool().await;
        assert!(complete_transaction(&pool, "missing").await.unwrap().is_none());
    }
}
