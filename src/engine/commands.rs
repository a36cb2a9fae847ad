//! Mutating operations. Each one checks the caller's capability, takes the
//! store's write lock once, validates, and only then writes.

use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{require, Action, Caller, Role};
use crate::engine::lifecycle::{apply_transition, ensure_transition, required_action};
use crate::engine::rates::{ensure_amount, stamp_fees};
use crate::engine::visibility::{can_see, project, ShipmentView};
use crate::error::AppError;
use crate::models::client::ClientPolicy;
use crate::models::courier::{CommissionSettings, CourierStats};
use crate::models::shipment::{FeeUpdate, NewShipment, PaymentMethod, Shipment, ShipmentStatus};
use crate::models::transaction::CourierTransaction;
use crate::state::{AppState, ConsoleEvent, Store};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterClient {
    pub name: String,
    pub flat_rate_fee: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCourier {
    pub name: String,
    pub commission: Option<CommissionSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShipment {
    /// Required for staff callers; a client always ships as itself.
    pub client_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub price: Decimal,
    pub package_value: Decimal,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub status: ShipmentStatus,
    /// Courier to assign; only meaningful when entering ASSIGNED_TO_COURIER.
    pub courier_id: Option<Uuid>,
}

pub(crate) fn instrumented<T>(
    state: &AppState,
    command: &'static str,
    run: impl FnOnce() -> Result<T, AppError>,
) -> Result<T, AppError> {
    let start = Instant::now();
    let result = run();

    state
        .metrics
        .command_latency_seconds
        .with_label_values(&[command])
        .observe(start.elapsed().as_secs_f64());

    if let Err(err) = &result {
        state
            .metrics
            .command_errors_total
            .with_label_values(&[err.kind()])
            .inc();
        match err {
            AppError::Internal(_) => error!(command, error = %err, "command failed"),
            _ => warn!(command, error = %err, "command rejected"),
        }
    }

    result
}

fn ensure_present(label: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn visible_shipment<'a>(
    store: &'a Store,
    caller: &Caller,
    id: Uuid,
) -> Result<&'a Shipment, AppError> {
    let shipment = store.shipment(id)?;
    if !can_see(caller, shipment) {
        return Err(AppError::PermissionDenied(format!(
            "shipment {id} is not accessible to {:?} {}",
            caller.role, caller.id
        )));
    }
    Ok(shipment)
}

fn sync_pending_gauge(state: &AppState, store: &Store) {
    state
        .metrics
        .pending_payouts
        .set(store.ledger.pending_payouts().len() as i64);
}

fn record_posting(state: &AppState, tx: &CourierTransaction) {
    state
        .metrics
        .ledger_transactions_total
        .with_label_values(&[tx.kind.as_str()])
        .inc();
    state.publish(ConsoleEvent::LedgerPosted(tx.clone()));
}

pub fn register_client(
    state: &AppState,
    caller: &Caller,
    input: RegisterClient,
) -> Result<ClientPolicy, AppError> {
    instrumented(state, "register_client", || {
        require(state.authorizer.as_ref(), caller, Action::ManageClients)?;

        let name = ensure_present("client name", &input.name)?;
        let flat_rate_fee = input
            .flat_rate_fee
            .unwrap_or(state.settings.default_client_flat_fee);
        ensure_amount("flat rate fee", flat_rate_fee)?;

        let policy = ClientPolicy {
            client_id: Uuid::new_v4(),
            name,
            flat_rate_fee,
        };
        state.write()?.clients.insert(policy.client_id, policy.clone());

        info!(
            client_id = %policy.client_id,
            flat_rate_fee = %policy.flat_rate_fee,
            "client registered"
        );
        Ok(policy)
    })
}

/// Affects fees stamped from now on; already-stamped shipments keep theirs.
pub fn update_client_fee(
    state: &AppState,
    caller: &Caller,
    client_id: Uuid,
    flat_rate_fee: Decimal,
) -> Result<ClientPolicy, AppError> {
    instrumented(state, "update_client_fee", || {
        require(state.authorizer.as_ref(), caller, Action::ManageClients)?;
        ensure_amount("flat rate fee", flat_rate_fee)?;

        let mut store = state.write()?;
        let policy = store
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| AppError::NotFound(format!("client {client_id} not found")))?;
        policy.flat_rate_fee = flat_rate_fee;

        info!(client_id = %client_id, flat_rate_fee = %flat_rate_fee, "client fee updated");
        Ok(policy.clone())
    })
}

pub fn register_courier(
    state: &AppState,
    caller: &Caller,
    input: RegisterCourier,
) -> Result<CourierStats, AppError> {
    instrumented(state, "register_courier", || {
        require(state.authorizer.as_ref(), caller, Action::ManageCouriers)?;

        let name = ensure_present("courier name", &input.name)?;
        let settings = input.commission.unwrap_or(state.settings.default_commission);
        ensure_amount("commission value", settings.commission_value)?;

        let stats = state.write()?.ledger.register(CourierStats::new(name, settings));

        info!(courier_id = %stats.courier_id, "courier registered");
        Ok(stats)
    })
}

pub fn update_courier_settings(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
    settings: CommissionSettings,
) -> Result<CourierStats, AppError> {
    instrumented(state, "update_courier_settings", || {
        require(state.authorizer.as_ref(), caller, Action::ManageCouriers)?;

        let stats = state.write()?.ledger.update_commission_settings(courier_id, settings)?;

        info!(
            courier_id = %courier_id,
            commission_type = ?stats.commission_type,
            commission_value = %stats.commission_value,
            "commission settings updated"
        );
        Ok(stats)
    })
}

pub fn set_courier_restriction(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
    restricted: bool,
) -> Result<CourierStats, AppError> {
    instrumented(state, "set_courier_restriction", || {
        require(state.authorizer.as_ref(), caller, Action::ManageCouriers)?;

        let stats = state.write()?.ledger.set_restricted(courier_id, restricted)?;

        info!(courier_id = %courier_id, restricted, "courier restriction changed");
        Ok(stats)
    })
}

pub fn create_shipment(
    state: &AppState,
    caller: &Caller,
    input: CreateShipment,
) -> Result<ShipmentView, AppError> {
    instrumented(state, "create_shipment", || {
        require(state.authorizer.as_ref(), caller, Action::CreateShipment)?;

        let client_id = match (caller.role, input.client_id) {
            (Role::Client, Some(requested)) if requested != caller.id => {
                return Err(AppError::PermissionDenied(format!(
                    "client {} cannot create shipments for client {requested}",
                    caller.id
                )));
            }
            (Role::Client, _) => caller.id,
            (_, Some(client_id)) => client_id,
            (_, None) => return Err(AppError::BadRequest("client_id is required".to_string())),
        };

        let recipient_name = ensure_present("recipient name", &input.recipient_name)?;
        let recipient_phone = ensure_present("recipient phone", &input.recipient_phone)?;
        ensure_amount("price", input.price)?;
        ensure_amount("package value", input.package_value)?;

        let now = Utc::now();
        let mut store = state.write()?;
        store.client(client_id)?;

        let shipment = Shipment::new(
            NewShipment {
                client_id,
                recipient_name,
                recipient_phone,
                price: input.price,
                package_value: input.package_value,
                payment_method: input.payment_method,
            },
            now,
        );
        store.shipments.insert(shipment.id, shipment.clone());

        info!(
            shipment_id = %shipment.id,
            client_id = %client_id,
            price = %shipment.price,
            "shipment created"
        );
        Ok(project(caller, &shipment, now, state.settings.overdue_after))
    })
}

/// Moves a shipment along its status graph.
///
/// Assignment stamps missing fees from the client policy and the courier's
/// commission settings. Delivery credits the courier in the same write: the
/// ledger posting is made first and the shipment is stored only if it succeeds.
pub fn transition_shipment(
    state: &AppState,
    caller: &Caller,
    shipment_id: Uuid,
    request: TransitionRequest,
) -> Result<ShipmentView, AppError> {
    instrumented(state, "transition_shipment", || {
        let target = request.status;
        require(state.authorizer.as_ref(), caller, required_action(target))?;

        let now = Utc::now();
        let mut guard = state.write()?;
        let store = &mut *guard;

        let mut updated = visible_shipment(store, caller, shipment_id)?.clone();
        let from = updated.status;
        ensure_transition(from, target)?;

        if target == ShipmentStatus::AssignedToCourier {
            let courier_id = request.courier_id.or(updated.courier_id).ok_or_else(|| {
                AppError::BadRequest("courier_id is required to assign a shipment".to_string())
            })?;
            let courier = store.ledger.courier(courier_id)?;
            if courier.is_restricted {
                return Err(AppError::CourierRestricted(courier_id));
            }
            let policy = store.client(updated.client_id)?;

            updated.courier_id = Some(courier_id);
            stamp_fees(&mut updated, policy, courier)?;
        } else if request.courier_id.is_some() && request.courier_id != updated.courier_id {
            return Err(AppError::BadRequest(
                "a courier can only be set when assigning".to_string(),
            ));
        }

        let change = apply_transition(&mut updated, target, now)?;

        let credit = if target == ShipmentStatus::Delivered {
            let courier_id = updated.courier_id.ok_or_else(|| {
                AppError::Internal(format!("delivered shipment {shipment_id} has no courier"))
            })?;
            let commission = updated.courier_commission.ok_or_else(|| {
                AppError::Internal(format!("delivered shipment {shipment_id} has no commission"))
            })?;
            Some(store.ledger.credit_earning(
                courier_id,
                commission,
                shipment_id,
                change.timestamp,
            )?)
        } else {
            None
        };

        store.shipments.insert(shipment_id, updated.clone());

        state
            .metrics
            .shipment_transitions_total
            .with_label_values(&[target.as_str()])
            .inc();
        state.publish(ConsoleEvent::ShipmentTransitioned {
            shipment_id,
            from,
            to: target,
            at: change.timestamp,
        });
        if let Some(tx) = &credit {
            record_posting(state, tx);
            info!(
                shipment_id = %shipment_id,
                courier_id = %tx.courier_id,
                amount = %tx.amount,
                "courier credited for delivery"
            );
        }

        info!(shipment_id = %shipment_id, from = %from, to = %target, "shipment transitioned");
        Ok(project(caller, &updated, now, state.settings.overdue_after))
    })
}

pub fn update_shipment_fees(
    state: &AppState,
    caller: &Caller,
    shipment_id: Uuid,
    fees: FeeUpdate,
) -> Result<ShipmentView, AppError> {
    instrumented(state, "update_shipment_fees", || {
        require(state.authorizer.as_ref(), caller, Action::EditFees)?;

        if fees.client_flat_rate_fee.is_none() && fees.courier_commission.is_none() {
            return Err(AppError::BadRequest("no fee supplied".to_string()));
        }
        if let Some(fee) = fees.client_flat_rate_fee {
            ensure_amount("client flat rate fee", fee)?;
        }
        if let Some(commission) = fees.courier_commission {
            ensure_amount("courier commission", commission)?;
        }

        let now = Utc::now();
        let mut store = state.write()?;
        let mut updated = visible_shipment(&store, caller, shipment_id)?.clone();

        if updated.status.locks_fees() {
            return Err(AppError::ShipmentLocked(shipment_id));
        }

        if let Some(fee) = fees.client_flat_rate_fee {
            updated.client_flat_rate_fee = Some(fee);
        }
        if let Some(commission) = fees.courier_commission {
            updated.courier_commission = Some(commission);
        }
        store.shipments.insert(shipment_id, updated.clone());

        info!(shipment_id = %shipment_id, "shipment fees updated");
        Ok(project(caller, &updated, now, state.settings.overdue_after))
    })
}

pub fn apply_manual_penalty(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
    amount: Decimal,
    reason: &str,
) -> Result<CourierTransaction, AppError> {
    instrumented(state, "apply_manual_penalty", || {
        require(state.authorizer.as_ref(), caller, Action::ManageCouriers)?;

        let tx = state
            .write()?
            .ledger
            .apply_manual_penalty(courier_id, amount, reason, Utc::now())?;
        record_posting(state, &tx);

        info!(
            courier_id = %courier_id,
            transaction_id = %tx.id,
            amount = %tx.amount,
            "penalty applied"
        );
        Ok(tx)
    })
}

pub fn request_payout(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
    amount: Decimal,
) -> Result<CourierTransaction, AppError> {
    instrumented(state, "request_payout", || {
        require(state.authorizer.as_ref(), caller, Action::RequestPayout)?;
        if caller.id != courier_id {
            return Err(AppError::PermissionDenied(format!(
                "courier {} cannot request a payout for courier {courier_id}",
                caller.id
            )));
        }

        let mut store = state.write()?;
        let tx = store.ledger.request_payout(courier_id, amount, Utc::now())?;
        sync_pending_gauge(state, &store);
        record_posting(state, &tx);

        info!(
            courier_id = %courier_id,
            transaction_id = %tx.id,
            amount = %amount,
            "payout requested"
        );
        Ok(tx)
    })
}

pub fn process_payout(
    state: &AppState,
    caller: &Caller,
    transaction_id: Uuid,
) -> Result<CourierTransaction, AppError> {
    instrumented(state, "process_payout", || {
        require(state.authorizer.as_ref(), caller, Action::ProcessPayout)?;

        let mut store = state.write()?;
        let tx = store.ledger.process_payout(transaction_id)?;
        sync_pending_gauge(state, &store);
        record_posting(state, &tx);

        info!(courier_id = %tx.courier_id, transaction_id = %tx.id, "payout processed");
        Ok(tx)
    })
}
