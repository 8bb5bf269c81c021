//! 결제 웹훅 처리.
//!
//! 결제 서비스는 `Payment-Signature` 헤더(`t=<unix>,v1=<hex>`)와 함께 이벤트를 보냅니다.
//! 서명은 `HMAC-SHA256(secret, "<t>.<body>")`이며, 5분보다 오래된 타임스탬프는 거부합니다.
//! 서명이 맞으면 이벤트 메타데이터의 트랜잭션을 결제 완료로 표시하고 크레딧을 적립합니다.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::{PaymentMetadata, Transaction};

/// 결제 세션 메타데이터의 `appId`. 다른 앱의 결제 이벤트는 무시합니다.
pub const APP_ID: &str = "wizardry-ai";

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentObject {
    pub id: Option<String>,
    pub metadata: Option<PaymentMetadata>,
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// 테스트에서 결제 서비스 대신 서명 헤더 값을 만듭니다.
#[cfg(test)]
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mac = signed_mac(secret, timestamp, payload).unwrap();
    hex::encode(mac.finalize().into_bytes())
}

/// 서명 헤더를 검증합니다. `now`는 테스트를 위해 인자로 받습니다.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::BadRequest("Malformed payment signature".to_string()))?;
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::BadRequest("Payment signature expired".to_string()));
    }

    for candidate in signatures {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        // verify_slice는 상수 시간 비교
        if signed_mac(secret, timestamp, payload)?.verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::BadRequest("Payment signature verification failed".to_string()))
}

/// 검증된 웹훅 본문을 처리합니다.
///
/// # 반환값
/// - `Ok(Some(Transaction))`: 이번 이벤트로 결제 완료 처리된 트랜잭션
/// - `Ok(None)`: 관심 없는 이벤트, 다른 앱의 결제, 이미 처리된 트랜잭션
pub async fn handle_webhook(
    pool: &SqlitePool,
    secret: &str,
    signature_header: &str,
    payload: &[u8],
) -> Result<Option<Transaction>, AppError> {
    verify_signature(secret, signature_header, payload, Utc::now().timestamp())?;

    let event: PaymentEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(format!("Invalid payment event: {}", e)))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" | "checkout.session.completed" => {
            let Some(PaymentMetadata {
                transaction_id: Some(transaction_id),
                app_id: Some(app_id),
            }) = event.data.object.metadata
            else {
                tracing::warn!(object_id = ?event.data.object.id, "payment event without metadata");
                return Ok(None);
            };
            if app_id != APP_ID {
                return Ok(None);
            }

            let transaction = db::complete_transaction(pool, &transaction_id).await?;
            match &transaction {
                Some(t) => tracing::info!(
                    transaction_id = %t.id,
                    user_id = %t.user_id,
                    credits = t.credits,
                    "payment completed, credits added"
                ),
                None => tracing::info!(transaction_id = %transaction_id, "payment already processed or unknown"),
            }
            Ok(transaction)
        }
        other => {
            tracing::info!("Unhandled payment event type {}", other);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, test_pool};
    use crate::models::Plan;

    const SECRET: &str = "whsec_test";

    fn header(payload: &[u8], t: i64) -> String {
        format!("t={},v1={}", t, sign(SECRET, t, payload))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"ping"}"#;
        assert!(verify_signature(SECRET, &header(payload, 1000), payload, 1010).is_ok());
    }

    #[test]
    fn rejects_tampered_payload_and_stale_timestamp() {
        let payload = br#"{"type":"ping"}"#;
        let h = header(payload, 1000);
        assert!(verify_signature(SECRET, &h, br#"{"type":"pong"}"#, 1000).is_err());
        assert!(verify_signature(SECRET, &h, payload, 1000 + 301).is_err());
        assert!(verify_signature(SECRET, "v1=abcd", payload, 1000).is_err());
        assert!(verify_signature("other", &h, payload, 1000).is_err());
    }

    #[test]
    fn skips_malformed_candidates_and_accepts_uppercase_hex() {
        let payload = br#"{"type":"ping"}"#;
        let good = sign(SECRET, 1000, payload);
        assert_eq!(good.len(), 64);

        // 잘못된 후보는 건너뛰고 뒤의 올바른 서명을 찾습니다.
        let h = format!("t=1000,v1=zz,v1=abc,v1={}", good.to_uppercase());
        assert!(verify_signature(SECRET, &h, payload, 1000).is_ok());

        let h = "t=1000,v1=not-hex";
        assert!(verify_signature(SECRET, h, payload, 1000).is_err());
    }

    #[tokio::test]
    async fn paid_event_credits_user_once() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 0).await;
        let plan = Plan::find("basic").unwrap();
        let transaction = db::create_transaction(&pool, "u1", &plan).await.unwrap();

        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "metadata": { "transactionId": transaction.id, "appId": APP_ID }
            }}
        })
        .to_string();
        let h = header(body.as_bytes(), Utc::now().timestamp());

        let paid = handle_webhook(&pool, SECRET, &h, body.as_bytes()).await.unwrap();
        assert!(paid.is_some());
        let again = handle_webhook(&pool, SECRET, &h, body.as_bytes()).await.unwrap();
        assert!(again.is_none());

        assert_eq!(db::get_credits(&pool, "u1").await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn foreign_app_is_ignored() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", 0).await;
        let plan = Plan::find("basic").unwrap();
        let transaction = db::create_transaction(&pool, "u1", &plan).await.unwrap();

        let body = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "metadata": { "transactionId": transaction.id, "appId": "someone-else" }
            }}
        })
        .to_string();
        let h = header(body.as_bytes(), Utc::now().timestamp());

        assert!(handle_webhook(&pool, SECRET, &h, body.as_bytes()).await.unwrap().is_none());
        assert_eq!(db::get_credits(&pool, "u1").await.unwrap(), Some(0));
    }
}
