use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::AppError;
use crate::models::client::ClientPolicy;
use crate::models::courier::{CommissionType, CourierStats};
use crate::models::shipment::Shipment;

const MONEY_SCALE: u32 = 2;

/// Upper bound for any single amount accepted from a caller. Sums of bounded
/// amounts stay far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000);

pub fn ensure_amount(label: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::InvalidAmount(format!("{label} cannot be negative")));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::InvalidAmount(format!("{label} cannot exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

pub(crate) fn overflow(label: &str) -> AppError {
    AppError::InvalidAmount(format!("{label} is out of range"))
}

/// Flat per-package charge; independent of the shipment price.
pub fn compute_client_fee(_shipment: &Shipment, policy: &ClientPolicy) -> Decimal {
    policy.flat_rate_fee
}

pub fn compute_courier_commission(
    shipment: &Shipment,
    courier: &CourierStats,
) -> Result<Decimal, AppError> {
    match courier.commission_type {
        CommissionType::Flat => Ok(courier.commission_value),
        CommissionType::Percentage => shipment
            .price
            .checked_mul(courier.commission_value)
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .map(round_money)
            .ok_or_else(|| overflow("courier commission")),
    }
}

/// Two decimal places, half-up for the non-negative amounts handled here.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Stamps unset fees; already-stamped values are kept as they are.
pub fn stamp_fees(
    shipment: &mut Shipment,
    policy: &ClientPolicy,
    courier: &CourierStats,
) -> Result<(), AppError> {
    let commission = match shipment.courier_commission {
        Some(commission) => commission,
        None => compute_courier_commission(shipment, courier)?,
    };
    if shipment.client_flat_rate_fee.is_none() {
        shipment.client_flat_rate_fee = Some(compute_client_fee(shipment, policy));
    }
    shipment.courier_commission = Some(commission);
    Ok(())
}
