//! Row and field projection of shipments for a given caller.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Caller, Role};
use crate::engine::lifecycle::{days_in_phase, is_overdue};
use crate::models::shipment::{PaymentMethod, Shipment, ShipmentStatus, StatusChange};

/// Whether `caller` may see this shipment row at all.
pub fn can_see(caller: &Caller, shipment: &Shipment) -> bool {
    match caller.role {
        Role::Admin | Role::SuperUser => true,
        Role::Client => shipment.client_id == caller.id,
        Role::Courier => shipment.courier_id == Some(caller.id),
    }
}

pub fn visible_shipments(caller: Caller) -> impl Fn(&Shipment) -> bool {
    move |shipment: &Shipment| can_see(&caller, shipment)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAccess {
    pub client_fee: bool,
    pub courier_commission: bool,
}

impl FieldAccess {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self {
                client_fee: true,
                courier_commission: true,
            },
            Role::SuperUser => Self {
                client_fee: false,
                courier_commission: false,
            },
            Role::Client => Self {
                client_fee: true,
                courier_commission: false,
            },
            Role::Courier => Self {
                client_fee: false,
                courier_commission: true,
            },
        }
    }

    pub fn net_profit(&self) -> bool {
        self.client_fee && self.courier_commission
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub client_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub overdue: Option<bool>,
}

impl ShipmentFilter {
    pub fn matches(
        &self,
        shipment: &Shipment,
        now: DateTime<Utc>,
        overdue_after: Duration,
    ) -> bool {
        self.status.is_none_or(|status| shipment.status == status)
            && self.client_id.is_none_or(|id| shipment.client_id == id)
            && self.courier_id.is_none_or(|id| shipment.courier_id == Some(id))
            && self
                .overdue
                .is_none_or(|overdue| is_overdue(shipment, now, overdue_after) == overdue)
    }
}

/// Shipment as returned to a caller, with restricted fields blanked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentView {
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
    pub net_profit: Option<Decimal>,
    pub status: ShipmentStatus,
    pub creation_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusChange>,
    pub days_in_phase: i64,
    pub is_overdue: bool,
}

pub fn project(
    caller: &Caller,
    shipment: &Shipment,
    now: DateTime<Utc>,
    overdue_after: Duration,
) -> ShipmentView {
    let access = FieldAccess::for_role(caller.role);

    ShipmentView {
        id: shipment.id,
        client_id: shipment.client_id,
        courier_id: shipment.courier_id,
        recipient_name: shipment.recipient_name.clone(),
        recipient_phone: shipment.recipient_phone.clone(),
        price: shipment.price,
        package_value: shipment.package_value,
        payment_method: shipment.payment_method,
        client_flat_rate_fee: shipment.client_flat_rate_fee.filter(|_| access.client_fee),
        courier_commission: shipment.courier_commission.filter(|_| access.courier_commission),
        net_profit: shipment.net_profit().filter(|_| access.net_profit()),
        status: shipment.status,
        creation_date: shipment.creation_date,
        delivery_date: shipment.delivery_date,
        status_history: shipment.status_history.clone(),
        days_in_phase: days_in_phase(shipment, now),
        is_overdue: is_overdue(shipment, now, overdue_after),
    }
}
