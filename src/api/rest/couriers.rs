use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::engine::commands::{self, RegisterCourier};
use crate::engine::financials::CourierFinancials;
use crate::engine::queries;
use crate::error::AppError;
use crate::models::courier::{CommissionSettings, CourierStats};
use crate::models::transaction::CourierTransaction;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/financials", get(courier_financials))
        .route("/couriers/:id", get(get_courier))
        .route("/couriers/:id/settings", patch(update_settings))
        .route("/couriers/:id/restriction", patch(update_restriction))
        .route("/couriers/:id/penalties", post(apply_penalty))
        .route("/couriers/:id/payouts", post(request_payout))
        .route("/couriers/:id/transactions", get(list_transactions))
}

#[derive(Deserialize)]
pub struct RestrictionRequest {
    pub is_restricted: bool,
}

#[derive(Deserialize)]
pub struct PenaltyRequest {
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct PayoutRequest {
    pub amount: Decimal,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<RegisterCourier>,
) -> Result<Json<CourierStats>, AppError> {
    commands::register_courier(&state, &caller, payload).map(Json)
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<CourierStats>>, AppError> {
    queries::list_couriers(&state, &caller).map(Json)
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierStats>, AppError> {
    queries::get_courier_stats(&state, &caller, id).map(Json)
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommissionSettings>,
) -> Result<Json<CourierStats>, AppError> {
    commands::update_courier_settings(&state, &caller, id, payload).map(Json)
}

async fn update_restriction(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestrictionRequest>,
) -> Result<Json<CourierStats>, AppError> {
    commands::set_courier_restriction(&state, &caller, id, payload.is_restricted).map(Json)
}

async fn apply_penalty(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<PenaltyRequest>,
) -> Result<Json<CourierTransaction>, AppError> {
    commands::apply_manual_penalty(&state, &caller, id, payload.amount, &payload.reason).map(Json)
}

async fn request_payout(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayoutRequest>,
) -> Result<Json<CourierTransaction>, AppError> {
    commands::request_payout(&state, &caller, id, payload.amount).map(Json)
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CourierTransaction>>, AppError> {
    queries::list_courier_transactions(&state, &caller, id).map(Json)
}

async fn courier_financials(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<CourierFinancials>>, AppError> {
    queries::get_courier_financials(&state, &caller).map(Json)
}
