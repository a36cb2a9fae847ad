//! Shipment status graph.
//!
//! ```text
//! WAITING_FOR_PACKAGING -> PACKAGED_AND_WAITING_FOR_ASSIGNMENT -> ASSIGNED_TO_COURIER
//!     -> IN_TRANSIT -> OUT_FOR_DELIVERY -> DELIVERED | DELIVERY_FAILED
//!
//! ASSIGNED_TO_COURIER | IN_TRANSIT | OUT_FOR_DELIVERY
//!     -> RETURN_REQUESTED -> RETURN_IN_PROGRESS -> RETURNED
//! ```
//!
//! Functions here only touch the shipment itself. Fee stamping and the
//! delivery credit are applied by the command layer in the same write.

use chrono::{DateTime, Duration, Utc};

use crate::auth::Action;
use crate::error::AppError;
use crate::models::shipment::{Shipment, ShipmentStatus, StatusChange};

pub fn allowed_targets(from: ShipmentStatus) -> &'static [ShipmentStatus] {
    use crate::models::shipment::ShipmentStatus::*;

    match from {
        WaitingForPackaging => &[PackagedAndWaitingForAssignment],
        PackagedAndWaitingForAssignment => &[AssignedToCourier],
        AssignedToCourier => &[InTransit, ReturnRequested],
        InTransit => &[OutForDelivery, ReturnRequested],
        OutForDelivery => &[Delivered, DeliveryFailed, ReturnRequested],
        ReturnRequested => &[ReturnInProgress],
        ReturnInProgress => &[Returned],
        Delivered | DeliveryFailed | Returned => &[],
    }
}

pub fn can_transition(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    allowed_targets(from).contains(&to)
}

pub fn ensure_transition(from: ShipmentStatus, to: ShipmentStatus) -> Result<(), AppError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

/// Capability a caller needs to move a shipment into `target`.
pub fn required_action(target: ShipmentStatus) -> Action {
    use crate::models::shipment::ShipmentStatus::*;

    match target {
        WaitingForPackaging | PackagedAndWaitingForAssignment | AssignedToCourier => {
            Action::DispatchShipment
        }
        ReturnRequested => Action::RequestReturn,
        InTransit | OutForDelivery | Delivered | DeliveryFailed | ReturnInProgress | Returned => {
            Action::UpdateDelivery
        }
    }
}

/// Validates the edge, then appends to the history and moves `status`.
///
/// The recorded timestamp never precedes the previous entry, so the history
/// stays ordered even if the wall clock steps backwards.
pub fn apply_transition(
    shipment: &mut Shipment,
    to: ShipmentStatus,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    ensure_transition(shipment.status, to)?;

    let timestamp = now.max(shipment.phase_started_at());
    let change = StatusChange { status: to, timestamp };

    shipment.status_history.push(change.clone());
    shipment.status = to;

    if to == ShipmentStatus::Delivered && shipment.delivery_date.is_none() {
        shipment.delivery_date = Some(timestamp);
    }

    Ok(change)
}

pub fn is_overdue(shipment: &Shipment, now: DateTime<Utc>, threshold: Duration) -> bool {
    !shipment.status.is_terminal() && now - shipment.creation_date > threshold
}

/// Whole days spent in the current status.
pub fn days_in_phase(shipment: &Shipment, now: DateTime<Utc>) -> i64 {
    (now - shipment.phase_started_at()).num_days().max(0)
}
