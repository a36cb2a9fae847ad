use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::auth::Caller;
use crate::engine::financials::{AdminFinancials, StatusBreakdown};
use crate::engine::queries;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/financials", get(admin_financials))
        .route("/reports/status", get(status_breakdown))
}

async fn admin_financials(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<AdminFinancials>, AppError> {
    queries::get_admin_financials(&state, &caller).map(Json)
}

async fn status_breakdown(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<StatusBreakdown>, AppError> {
    queries::get_status_breakdown(&state, &caller).map(Json)
}
