use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Earning,
    Penalty,
    WithdrawalRequest,
    PayoutProcessed,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earning => "EARNING",
            Self::Penalty => "PENALTY",
            Self::WithdrawalRequest => "WITHDRAWAL_REQUEST",
            Self::PayoutProcessed => "PAYOUT_PROCESSED",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processed,
}

/// Ledger entry. `amount` is signed: credits positive, debits negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierTransaction {
    pub id: Uuid,
    pub courier_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub description: String,
    pub shipment_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl CourierTransaction {
    /// Whether this entry currently contributes to the courier's balance.
    pub fn affects_balance(&self) -> bool {
        self.status == TransactionStatus::Processed
    }
}
