use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::rates::{ensure_amount, overflow};
use crate::error::AppError;
use crate::models::courier::{CommissionSettings, CourierStats};
use crate::models::transaction::{CourierTransaction, TransactionStatus, TransactionType};

/// Courier balances and the transactions that justify them.
///
/// Every change to a courier's money counters goes through one of the posting
/// methods and leaves a transaction behind, so
/// `current_balance == reconciled_balance` holds after each call. Transactions
/// are stored apart from the courier records and are never removed.
#[derive(Debug, Default)]
pub struct Ledger {
    couriers: HashMap<Uuid, CourierStats>,
    transactions: HashMap<Uuid, CourierTransaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, stats: CourierStats) -> CourierStats {
        self.couriers.insert(stats.courier_id, stats.clone());
        stats
    }

    pub fn courier(&self, courier_id: Uuid) -> Result<&CourierStats, AppError> {
        self.couriers
            .get(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
    }

    fn courier_mut(&mut self, courier_id: Uuid) -> Result<&mut CourierStats, AppError> {
        self.couriers
            .get_mut(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
    }

    pub fn couriers(&self) -> impl Iterator<Item = &CourierStats> {
        self.couriers.values()
    }

    pub fn courier_count(&self) -> usize {
        self.couriers.len()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &CourierTransaction> {
        self.transactions.values()
    }

    /// A courier's history, oldest first.
    pub fn transactions_for(&self, courier_id: Uuid) -> Vec<CourierTransaction> {
        let mut history: Vec<CourierTransaction> = self
            .transactions
            .values()
            .filter(|tx| tx.courier_id == courier_id)
            .cloned()
            .collect();
        history.sort_by_key(|tx| tx.timestamp);
        history
    }

    pub fn pending_payouts(&self) -> Vec<CourierTransaction> {
        let mut pending: Vec<CourierTransaction> = self
            .transactions
            .values()
            .filter(|tx| {
                tx.kind == TransactionType::WithdrawalRequest
                    && tx.status == TransactionStatus::Pending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|tx| tx.timestamp);
        pending
    }

    /// Fold over processed entries. Pending requests do not count.
    pub fn reconciled_balance(&self, courier_id: Uuid) -> Decimal {
        self.transactions
            .values()
            .filter(|tx| tx.courier_id == courier_id && tx.affects_balance())
            .map(|tx| tx.amount)
            .sum()
    }

    /// Delivery credit. Only the DELIVERED transition calls this.
    pub(crate) fn credit_earning(
        &mut self,
        courier_id: Uuid,
        amount: Decimal,
        shipment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CourierTransaction, AppError> {
        if amount < Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "commission for shipment {shipment_id} is negative"
            )));
        }

        let courier = self.courier_mut(courier_id)?;
        let total_earnings = courier
            .total_earnings
            .checked_add(amount)
            .ok_or_else(|| overflow("total earnings"))?;
        let current_balance = courier
            .current_balance
            .checked_add(amount)
            .ok_or_else(|| overflow("current balance"))?;
        courier.total_earnings = total_earnings;
        courier.current_balance = current_balance;
        courier.deliveries_completed += 1;

        Ok(self.post(CourierTransaction {
            id: Uuid::new_v4(),
            courier_id,
            kind: TransactionType::Earning,
            status: TransactionStatus::Processed,
            amount,
            description: format!("delivery commission for shipment {shipment_id}"),
            shipment_id: Some(shipment_id),
            timestamp: now,
        }))
    }

    pub fn apply_manual_penalty(
        &mut self,
        courier_id: Uuid,
        amount: Decimal,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CourierTransaction, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount("penalty must be greater than zero".to_string()));
        }
        ensure_amount("penalty", amount)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidAmount("penalty reason cannot be empty".to_string()));
        }

        let courier = self.courier_mut(courier_id)?;
        courier.current_balance = courier
            .current_balance
            .checked_sub(amount)
            .ok_or_else(|| overflow("current balance"))?;

        Ok(self.post(CourierTransaction {
            id: Uuid::new_v4(),
            courier_id,
            kind: TransactionType::Penalty,
            status: TransactionStatus::Processed,
            amount: -amount,
            description: reason.to_string(),
            shipment_id: None,
            timestamp: now,
        }))
    }

    /// Records a pending withdrawal. The balance is debited on processing.
    pub fn request_payout(
        &mut self,
        courier_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CourierTransaction, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount("payout must be greater than zero".to_string()));
        }
        ensure_amount("payout", amount)?;

        let balance = self.courier(courier_id)?.current_balance;
        if amount > balance {
            return Err(AppError::InvalidAmount(format!(
                "payout {amount} exceeds current balance {balance}"
            )));
        }

        Ok(self.post(CourierTransaction {
            id: Uuid::new_v4(),
            courier_id,
            kind: TransactionType::WithdrawalRequest,
            status: TransactionStatus::Pending,
            amount: -amount,
            description: format!("withdrawal request of {amount}"),
            shipment_id: None,
            timestamp: now,
        }))
    }

    pub fn process_payout(&mut self, transaction_id: Uuid) -> Result<CourierTransaction, AppError> {
        let tx = self
            .transactions
            .get(&transaction_id)
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        if tx.kind != TransactionType::WithdrawalRequest {
            return Err(AppError::BadRequest(format!(
                "transaction {transaction_id} is not a withdrawal request"
            )));
        }
        if tx.status == TransactionStatus::Processed {
            return Err(AppError::TransactionAlreadyProcessed(transaction_id));
        }

        let courier_id = tx.courier_id;
        let debit = tx.amount.abs();

        let courier = self.courier_mut(courier_id)?;
        courier.current_balance = courier
            .current_balance
            .checked_sub(debit)
            .ok_or_else(|| overflow("current balance"))?;

        let tx = self
            .transactions
            .get_mut(&transaction_id)
            .ok_or(AppError::TransactionNotFound(transaction_id))?;
        tx.status = TransactionStatus::Processed;

        Ok(tx.clone())
    }

    /// Future commissions only; shipments already stamped keep their value.
    pub fn update_commission_settings(
        &mut self,
        courier_id: Uuid,
        settings: CommissionSettings,
    ) -> Result<CourierStats, AppError> {
        ensure_amount("commission value", settings.commission_value)?;

        let courier = self.courier_mut(courier_id)?;
        courier.commission_type = settings.commission_type;
        courier.commission_value = settings.commission_value;
        Ok(courier.clone())
    }

    pub fn set_restricted(
        &mut self,
        courier_id: Uuid,
        restricted: bool,
    ) -> Result<CourierStats, AppError> {
        let courier = self.courier_mut(courier_id)?;
        courier.is_restricted = restricted;
        Ok(courier.clone())
    }

    fn post(&mut self, tx: CourierTransaction) -> CourierTransaction {
        self.transactions.insert(tx.id, tx.clone());
        tx
    }
}
