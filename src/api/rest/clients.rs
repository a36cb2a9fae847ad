use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::engine::commands::{self, RegisterClient};
use crate::engine::financials::ClientFinancials;
use crate::engine::queries;
use crate::error::AppError;
use crate::models::client::ClientPolicy;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clients", post(register_client).get(list_clients))
        .route("/clients/financials", get(client_financials))
        .route("/clients/:id/fee", patch(update_client_fee))
}

#[derive(Deserialize)]
pub struct UpdateFeeRequest {
    pub flat_rate_fee: Decimal,
}

async fn register_client(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<RegisterClient>,
) -> Result<Json<ClientPolicy>, AppError> {
    commands::register_client(&state, &caller, payload).map(Json)
}

async fn list_clients(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<ClientPolicy>>, AppError> {
    queries::list_clients(&state, &caller).map(Json)
}

async fn update_client_fee(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFeeRequest>,
) -> Result<Json<ClientPolicy>, AppError> {
    commands::update_client_fee(&state, &caller, id, payload.flat_rate_fee).map(Json)
}

async fn client_financials(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<ClientFinancials>>, AppError> {
    queries::get_client_financials(&state, &caller).map(Json)
}
