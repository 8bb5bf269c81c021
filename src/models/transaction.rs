use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    /// 결제 금액 (센트 단위)
    pub amount: i64,
    pub credits: i64,
    pub is_paid: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 크레딧 충전 요금제
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub credits: i64,
    pub amount: i64,
}

pub const PLANS: [Plan; 3] = [
    Plan { id: "basic", credits: 100, amount: 500 },
    Plan { id: "pro", credits: 400, amount: 1900 },
    Plan { id: "enterprise", credits: 1000, amount: 4900 },
];

impl Plan {
    pub fn find(plan_id: &str) -> Option<Plan> {
        PLANS.iter().copied().find(|plan| plan.id == plan_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseCreditsRequest {
    #[serde(rename = "planId", alias = "plan_id")]
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
pub struct PurchaseCreditsResponse {
    pub transaction_id: String,
    pub plan: Plan,
    /// 결제 세션 메타데이터에 그대로 실어 보낼 값
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(rename = "appId")]
    pub app_id: Option<String>,
}
