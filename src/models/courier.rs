use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    Flat,
    Percentage,
}

impl std::str::FromStr for CommissionType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FLAT" => Ok(Self::Flat),
            "PERCENTAGE" => Ok(Self::Percentage),
            other => Err(format!("unknown commission type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CommissionSettings {
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
}

/// Per-courier ledger projection.
///
/// The money counters are only moved by [`crate::engine::ledger::Ledger`]
/// postings, so they stay crate-private and are exposed through getters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierStats {
    pub courier_id: Uuid,
    pub name: String,
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
    pub(crate) total_earnings: Decimal,
    pub(crate) current_balance: Decimal,
    pub(crate) deliveries_completed: u64,
    pub is_restricted: bool,
}

impl CourierStats {
    pub fn new(name: String, settings: CommissionSettings) -> Self {
        Self {
            courier_id: Uuid::new_v4(),
            name,
            commission_type: settings.commission_type,
            commission_value: settings.commission_value,
            total_earnings: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            deliveries_completed: 0,
            is_restricted: false,
        }
    }

    pub fn total_earnings(&self) -> Decimal {
        self.total_earnings
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn deliveries_completed(&self) -> u64 {
        self.deliveries_completed
    }
}
