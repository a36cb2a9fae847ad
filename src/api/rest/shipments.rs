use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::Caller;
use crate::engine::commands::{self, CreateShipment, TransitionRequest};
use crate::engine::queries;
use crate::engine::visibility::{ShipmentFilter, ShipmentView};
use crate::error::AppError;
use crate::models::shipment::FeeUpdate;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shipments", post(create_shipment).get(list_shipments))
        .route("/shipments/:id", get(get_shipment))
        .route("/shipments/:id/transitions", post(transition_shipment))
        .route("/shipments/:id/fees", patch(update_fees))
}

async fn create_shipment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<CreateShipment>,
) -> Result<Json<ShipmentView>, AppError> {
    commands::create_shipment(&state, &caller, payload).map(Json)
}

async fn list_shipments(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(filter): Query<ShipmentFilter>,
) -> Result<Json<Vec<ShipmentView>>, AppError> {
    queries::list_shipments(&state, &caller, &filter).map(Json)
}

async fn get_shipment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ShipmentView>, AppError> {
    queries::get_shipment(&state, &caller, id).map(Json)
}

async fn transition_shipment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<ShipmentView>, AppError> {
    commands::transition_shipment(&state, &caller, id, payload).map(Json)
}

async fn update_fees(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeeUpdate>,
) -> Result<Json<ShipmentView>, AppError> {
    commands::update_shipment_fees(&state, &caller, id, payload).map(Json)
}
