use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CashOnDelivery,
    Transfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    WaitingForPackaging,
    PackagedAndWaitingForAssignment,
    AssignedToCourier,
    InTransit,
    OutForDelivery,
    Delivered,
    DeliveryFailed,
    ReturnRequested,
    ReturnInProgress,
    Returned,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 10] = [
        Self::WaitingForPackaging,
        Self::PackagedAndWaitingForAssignment,
        Self::AssignedToCourier,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::DeliveryFailed,
        Self::ReturnRequested,
        Self::ReturnInProgress,
        Self::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPackaging => "WAITING_FOR_PACKAGING",
            Self::PackagedAndWaitingForAssignment => "PACKAGED_AND_WAITING_FOR_ASSIGNMENT",
            Self::AssignedToCourier => "ASSIGNED_TO_COURIER",
            Self::InTransit => "IN_TRANSIT",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::DeliveryFailed => "DELIVERY_FAILED",
            Self::ReturnRequested => "RETURN_REQUESTED",
            Self::ReturnInProgress => "RETURN_IN_PROGRESS",
            Self::Returned => "RETURNED",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeliveryFailed | Self::Returned)
    }

    /// Fees freeze once a delivery outcome is recorded.
    pub fn locks_fees(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeliveryFailed)
    }

    /// Reporting label; packaged shipments are grouped as `PENDING_ASSIGNMENT`.
    pub fn reporting_bucket(&self) -> &'static str {
        match self {
            Self::PackagedAndWaitingForAssignment => "PENDING_ASSIGNMENT",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub status: ShipmentStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub price: Decimal,
    pub package_value: Decimal,
    pub payment_method: PaymentMethod,
    pub client_flat_rate_fee: Option<Decimal>,
    pub courier_commission: Option<Decimal>,
    pub status: ShipmentStatus,
    pub creation_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusChange>,
}

impl Shipment {
    pub fn new(input: NewShipment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: input.client_id,
            courier_id: None,
            recipient_name: input.recipient_name,
            recipient_phone: input.recipient_phone,
            price: input.price,
            package_value: input.package_value,
            payment_method: input.payment_method,
            client_flat_rate_fee: None,
            courier_commission: None,
            status: ShipmentStatus::WaitingForPackaging,
            creation_date: now,
            delivery_date: None,
            status_history: vec![StatusChange {
                status: ShipmentStatus::WaitingForPackaging,
                timestamp: now,
            }],
        }
    }

    /// Timestamp of the most recent status change.
    pub fn phase_started_at(&self) -> DateTime<Utc> {
        self.status_history
            .last()
            .map(|change| change.timestamp)
            .unwrap_or(self.creation_date)
    }

    /// Client fee minus courier commission, once both are stamped.
    pub fn net_profit(&self) -> Option<Decimal> {
        match (self.client_flat_rate_fee, self.courier_commission) {
            (Some(fee), Some(commission)) => Some(fee - commission),
            _ => None,
        }
    }
}

/// Validated creation input; the command layer resolves `client_id` from the caller.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub client_id: Uuid,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub price: Decimal,
    pub package_value: Decimal,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeUpdate {
    pub client_flat_rate_fee: Option<Decimal>,
    pub courier_commission: Option<Decimal>,
}
