//! Read-side folds over shipments and ledger entries.
//!
//! Every figure is a plain sum or count, so the result does not depend on the
//! iteration order of the underlying maps.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::lifecycle::is_overdue;
use crate::models::client::ClientPolicy;
use crate::models::courier::CourierStats;
use crate::models::shipment::{Shipment, ShipmentStatus};
use crate::models::transaction::{CourierTransaction, TransactionStatus, TransactionType};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminFinancials {
    pub gross_revenue: Decimal,
    pub total_client_fees: Decimal,
    pub total_courier_payouts: Decimal,
    pub net_revenue: Decimal,
    pub total_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientFinancials {
    pub client_id: Uuid,
    pub name: String,
    pub total_orders: u64,
    pub order_sum: Decimal,
    pub flat_rate_fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierFinancials {
    pub courier_id: Uuid,
    pub name: String,
    pub deliveries_completed: u64,
    pub total_earnings: Decimal,
    pub total_penalties: Decimal,
    pub total_paid_out: Decimal,
    pub pending_payouts: Decimal,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBreakdown {
    pub buckets: BTreeMap<&'static str, u64>,
    pub overdue: u64,
    pub total: u64,
}

pub fn admin_financials<'a>(shipments: impl IntoIterator<Item = &'a Shipment>) -> AdminFinancials {
    let mut totals = shipments
        .into_iter()
        .filter(|shipment| shipment.status == ShipmentStatus::Delivered)
        .fold(AdminFinancials::default(), |mut acc, shipment| {
            acc.gross_revenue += shipment.price;
            acc.total_client_fees += shipment.client_flat_rate_fee.unwrap_or_default();
            acc.total_courier_payouts += shipment.courier_commission.unwrap_or_default();
            acc.total_orders += 1;
            acc
        });

    totals.net_revenue = totals.total_client_fees - totals.total_courier_payouts;
    totals
}

/// One row per registered client, including clients with no shipments yet.
pub fn client_financials<'a>(
    clients: impl IntoIterator<Item = &'a ClientPolicy>,
    shipments: impl IntoIterator<Item = &'a Shipment>,
) -> Vec<ClientFinancials> {
    let mut per_client: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
    for shipment in shipments {
        let entry = per_client.entry(shipment.client_id).or_default();
        entry.0 += 1;
        entry.1 += shipment.price;
    }

    let mut rows: Vec<ClientFinancials> = clients
        .into_iter()
        .map(|client| {
            let (total_orders, order_sum) = per_client
                .get(&client.client_id)
                .copied()
                .unwrap_or_default();
            ClientFinancials {
                client_id: client.client_id,
                name: client.name.clone(),
                total_orders,
                order_sum,
                flat_rate_fee: client.flat_rate_fee,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.client_id.cmp(&b.client_id)));
    rows
}

pub fn courier_financials<'a>(
    couriers: impl IntoIterator<Item = &'a CourierStats>,
    transactions: impl IntoIterator<Item = &'a CourierTransaction>,
) -> Vec<CourierFinancials> {
    let mut rows: HashMap<Uuid, CourierFinancials> = couriers
        .into_iter()
        .map(|courier| {
            (
                courier.courier_id,
                CourierFinancials {
                    courier_id: courier.courier_id,
                    name: courier.name.clone(),
                    deliveries_completed: courier.deliveries_completed(),
                    total_earnings: courier.total_earnings(),
                    total_penalties: Decimal::ZERO,
                    total_paid_out: Decimal::ZERO,
                    pending_payouts: Decimal::ZERO,
                    current_balance: courier.current_balance(),
                },
            )
        })
        .collect();

    for tx in transactions {
        let Some(row) = rows.get_mut(&tx.courier_id) else {
            continue;
        };
        match (tx.kind, tx.status) {
            (TransactionType::Penalty, _) => row.total_penalties += tx.amount.abs(),
            (TransactionType::WithdrawalRequest, TransactionStatus::Pending) => {
                row.pending_payouts += tx.amount.abs()
            }
            (TransactionType::WithdrawalRequest, TransactionStatus::Processed)
            | (TransactionType::PayoutProcessed, _) => row.total_paid_out += tx.amount.abs(),
            (TransactionType::Earning, _) => {}
        }
    }

    let mut rows: Vec<CourierFinancials> = rows.into_values().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.courier_id.cmp(&b.courier_id)));
    rows
}

pub fn status_breakdown<'a>(
    shipments: impl IntoIterator<Item = &'a Shipment>,
    now: DateTime<Utc>,
    overdue_after: Duration,
) -> StatusBreakdown {
    shipments
        .into_iter()
        .fold(StatusBreakdown::default(), |mut acc, shipment| {
            *acc.buckets.entry(shipment.status.reporting_bucket()).or_default() += 1;
            if is_overdue(shipment, now, overdue_after) {
                acc.overdue += 1;
            }
            acc.total += 1;
            acc
        })
}
