use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-client billing policy. `flat_rate_fee` is charged per package in EGP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPolicy {
    pub client_id: Uuid,
    pub name: String,
    pub flat_rate_fee: Decimal,
}
