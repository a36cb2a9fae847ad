//! Read-only operations. Each takes the read lock once, so a query never
//! observes a transition half applied.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{require, require_admin_financials, Action, Caller, Role};
use crate::engine::financials::{
    admin_financials, client_financials, courier_financials, status_breakdown, AdminFinancials,
    ClientFinancials, CourierFinancials, StatusBreakdown,
};
use crate::engine::visibility::{can_see, project, visible_shipments, ShipmentFilter, ShipmentView};
use crate::error::AppError;
use crate::models::client::ClientPolicy;
use crate::models::courier::CourierStats;
use crate::models::transaction::CourierTransaction;
use crate::state::AppState;

/// Visible shipments matching `filter`, newest first.
pub fn list_shipments(
    state: &AppState,
    caller: &Caller,
    filter: &ShipmentFilter,
) -> Result<Vec<ShipmentView>, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ViewShipments)?;

    let now = Utc::now();
    let overdue_after = state.settings.overdue_after;
    let visible = visible_shipments(*caller);
    let store = state.read()?;

    let mut views: Vec<ShipmentView> = store
        .shipments
        .values()
        .filter(|&shipment| visible(shipment) && filter.matches(shipment, now, overdue_after))
        .map(|shipment| project(caller, shipment, now, overdue_after))
        .collect();
    views.sort_by(|a, b| b.creation_date.cmp(&a.creation_date).then(a.id.cmp(&b.id)));

    Ok(views)
}

pub fn get_shipment(
    state: &AppState,
    caller: &Caller,
    shipment_id: Uuid,
) -> Result<ShipmentView, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ViewShipments)?;

    let store = state.read()?;
    let shipment = store.shipment(shipment_id)?;
    if !can_see(caller, shipment) {
        return Err(AppError::PermissionDenied(format!(
            "shipment {shipment_id} is not accessible to {:?} {}",
            caller.role, caller.id
        )));
    }

    Ok(project(caller, shipment, Utc::now(), state.settings.overdue_after))
}

/// Admins read any courier's ledger; a courier reads only its own.
fn ensure_ledger_access(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
) -> Result<(), AppError> {
    match caller.role {
        Role::Admin => require(state.authorizer.as_ref(), caller, Action::ViewLedger),
        Role::Courier if caller.id == courier_id => {
            require(state.authorizer.as_ref(), caller, Action::ViewLedger)
        }
        _ => Err(AppError::PermissionDenied(format!(
            "{:?} {} may not read the ledger of courier {courier_id}",
            caller.role, caller.id
        ))),
    }
}

pub fn get_courier_stats(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
) -> Result<CourierStats, AppError> {
    ensure_ledger_access(state, caller, courier_id)?;

    Ok(state.read()?.ledger.courier(courier_id)?.clone())
}

pub fn list_courier_transactions(
    state: &AppState,
    caller: &Caller,
    courier_id: Uuid,
) -> Result<Vec<CourierTransaction>, AppError> {
    ensure_ledger_access(state, caller, courier_id)?;

    let store = state.read()?;
    store.ledger.courier(courier_id)?;
    Ok(store.ledger.transactions_for(courier_id))
}

pub fn list_couriers(state: &AppState, caller: &Caller) -> Result<Vec<CourierStats>, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ManageCouriers)?;

    let mut couriers: Vec<CourierStats> = state.read()?.ledger.couriers().cloned().collect();
    couriers.sort_by(|a, b| a.name.cmp(&b.name).then(a.courier_id.cmp(&b.courier_id)));
    Ok(couriers)
}

pub fn list_pending_payouts(
    state: &AppState,
    caller: &Caller,
) -> Result<Vec<CourierTransaction>, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ProcessPayout)?;

    Ok(state.read()?.ledger.pending_payouts())
}

pub fn list_clients(state: &AppState, caller: &Caller) -> Result<Vec<ClientPolicy>, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ManageClients)?;

    let mut clients: Vec<ClientPolicy> = state.read()?.clients.values().cloned().collect();
    clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.client_id.cmp(&b.client_id)));
    Ok(clients)
}

pub fn get_admin_financials(
    state: &AppState,
    caller: &Caller,
) -> Result<AdminFinancials, AppError> {
    require_admin_financials(state.authorizer.as_ref(), caller)?;

    Ok(admin_financials(state.read()?.shipments.values()))
}

pub fn get_client_financials(
    state: &AppState,
    caller: &Caller,
) -> Result<Vec<ClientFinancials>, AppError> {
    require_admin_financials(state.authorizer.as_ref(), caller)?;

    let store = state.read()?;
    Ok(client_financials(store.clients.values(), store.shipments.values()))
}

pub fn get_courier_financials(
    state: &AppState,
    caller: &Caller,
) -> Result<Vec<CourierFinancials>, AppError> {
    require_admin_financials(state.authorizer.as_ref(), caller)?;

    let store = state.read()?;
    Ok(courier_financials(store.ledger.couriers(), store.ledger.transactions()))
}

/// Row counts only, so staff without financial access may read it.
pub fn get_status_breakdown(
    state: &AppState,
    caller: &Caller,
) -> Result<StatusBreakdown, AppError> {
    require(state.authorizer.as_ref(), caller, Action::ViewReports)?;

    Ok(status_breakdown(
        state.read()?.shipments.values(),
        Utc::now(),
        state.settings.overdue_after,
    ))
}
