use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::Caller;
use crate::engine::{commands, queries};
use crate::error::AppError;
use crate::models::transaction::CourierTransaction;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transactions/pending", get(list_pending))
        .route("/transactions/:id/process", post(process_payout))
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<CourierTransaction>>, AppError> {
    queries::list_pending_payouts(&state, &caller).map(Json)
}

async fn process_payout(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierTransaction>, AppError> {
    commands::process_payout(&state, &caller, id).map(Json)
}
