use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_ops::api::rest::router;
use courier_ops::config::EngineSettings;
use courier_ops::state::AppState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct Identity {
    role: &'static str,
    id: String,
}

impl Identity {
    fn admin() -> Self {
        Self {
            role: "ADMIN",
            id: Uuid::new_v4().to_string(),
        }
    }

    fn super_user() -> Self {
        Self {
            role: "SUPER_USER",
            id: Uuid::new_v4().to_string(),
        }
    }

    fn client(id: &str) -> Self {
        Self {
            role: "CLIENT",
            id: id.to_string(),
        }
    }

    fn courier(id: &str) -> Self {
        Self {
            role: "COURIER",
            id: id.to_string(),
        }
    }
}

fn setup() -> axum::Router {
    let state = AppState::new(1024, EngineSettings::default());
    router(Arc::new(state))
}

fn request(method: &str, uri: &str, who: &Identity, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-caller-role", who.role)
        .header("x-caller-id", who.id.as_str());

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn anonymous_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

struct World {
    app: axum::Router,
    admin: Identity,
    client_id: String,
    courier_id: String,
}

async fn world() -> World {
    let app = setup();
    let admin = Identity::admin();

    let (status, client) = send(
        &app,
        request(
            "POST",
            "/clients",
            &admin,
            Some(json!({ "name": "Delta Electronics", "flat_rate_fee": "15" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, courier) = send(
        &app,
        request(
            "POST",
            "/couriers",
            &admin,
            Some(json!({
                "name": "Mahmoud",
                "commission": { "commission_type": "PERCENTAGE", "commission_value": "10" }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    World {
        app,
        admin,
        client_id: client["client_id"].as_str().unwrap().to_string(),
        courier_id: courier["courier_id"].as_str().unwrap().to_string(),
    }
}

async fn create_shipment(w: &World, price: &str) -> String {
    let (status, body) = send(
        &w.app,
        request(
            "POST",
            "/shipments",
            &Identity::client(&w.client_id),
            Some(json!({
                "recipient_name": "Aya",
                "recipient_phone": "+201066666666",
                "price": price,
                "package_value": "300",
                "payment_method": "CASH_ON_DELIVERY"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_string()
}

async fn transition(w: &World, who: &Identity, id: &str, status: &str) -> (StatusCode, Value) {
    let courier_id = (status == "ASSIGNED_TO_COURIER").then(|| w.courier_id.clone());
    send(
        &w.app,
        request(
            "POST",
            &format!("/shipments/{id}/transitions"),
            who,
            Some(json!({ "status": status, "courier_id": courier_id })),
        ),
    )
    .await
}

async fn deliver(w: &World, id: &str) {
    let courier = Identity::courier(&w.courier_id);
    for (who, status) in [
        (&w.admin, "PACKAGED_AND_WAITING_FOR_ASSIGNMENT"),
        (&w.admin, "ASSIGNED_TO_COURIER"),
        (&courier, "IN_TRANSIT"),
        (&courier, "OUT_FOR_DELIVERY"),
        (&courier, "DELIVERED"),
    ] {
        let (code, body) = transition(w, who, id, status).await;
        assert_eq!(code, StatusCode::OK, "{status}: {body}");
    }
}

#[tokio::test]
async fn health_is_public_and_counts_collections() {
    let app = setup();
    let response = app.oneshot(anonymous_get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["clients"], 0);
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["shipments"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(anonymous_get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("pending_payouts"));
}

#[tokio::test]
async fn missing_identity_is_forbidden() {
    let app = setup();
    let response = app.oneshot(anonymous_get("/shipments")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "permission_denied");
}

#[tokio::test]
async fn delivery_scenario_stamps_fees_and_credits_courier() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;

    let (status, created) =
        send(&w.app, request("GET", &format!("/shipments/{id}"), &w.admin, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "WAITING_FOR_PACKAGING");
    assert!(created["client_flat_rate_fee"].is_null());
    assert!(created["delivery_date"].is_null());

    deliver(&w, &id).await;

    let (_, shipment) =
        send(&w.app, request("GET", &format!("/shipments/{id}"), &w.admin, None)).await;
    assert_eq!(shipment["status"], "DELIVERED");
    assert_eq!(money(&shipment["client_flat_rate_fee"]), dec!(15));
    assert_eq!(money(&shipment["courier_commission"]), dec!(10));
    assert_eq!(money(&shipment["net_profit"]), dec!(5));
    assert!(!shipment["delivery_date"].is_null());
    assert_eq!(shipment["status_history"].as_array().unwrap().len(), 6);

    let (status, stats) = send(
        &w.app,
        request(
            "GET",
            &format!("/couriers/{}", w.courier_id),
            &Identity::courier(&w.courier_id),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&stats["current_balance"]), dec!(10));
    assert_eq!(money(&stats["total_earnings"]), dec!(10));
    assert_eq!(stats["deliveries_completed"], 1);

    let (_, report) = send(&w.app, request("GET", "/reports/financials", &w.admin, None)).await;
    assert_eq!(money(&report["gross_revenue"]), dec!(100));
    assert_eq!(money(&report["total_client_fees"]), dec!(15));
    assert_eq!(money(&report["total_courier_payouts"]), dec!(10));
    assert_eq!(money(&report["net_revenue"]), dec!(5));
    assert_eq!(report["total_orders"], 1);
}

#[tokio::test]
async fn invalid_transition_returns_409() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;

    let (status, body) = transition(&w, &w.admin, &id, "DELIVERED").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");
}

#[tokio::test]
async fn restricted_courier_assignment_returns_422() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;

    let (status, _) = send(
        &w.app,
        request(
            "PATCH",
            &format!("/couriers/{}/restriction", w.courier_id),
            &w.admin,
            Some(json!({ "is_restricted": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    transition(&w, &w.admin, &id, "PACKAGED_AND_WAITING_FOR_ASSIGNMENT").await;
    let (status, body) = transition(&w, &w.admin, &id, "ASSIGNED_TO_COURIER").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "courier_restricted");
}

#[tokio::test]
async fn fee_edit_locked_after_delivery() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;
    deliver(&w, &id).await;

    let (status, body) = send(
        &w.app,
        request(
            "PATCH",
            &format!("/shipments/{id}/fees"),
            &w.admin,
            Some(json!({ "courier_commission": "3" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "shipment_locked");
}

#[tokio::test]
async fn fee_edit_in_transit_is_reflected_in_reads() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;
    let courier = Identity::courier(&w.courier_id);
    transition(&w, &w.admin, &id, "PACKAGED_AND_WAITING_FOR_ASSIGNMENT").await;
    transition(&w, &w.admin, &id, "ASSIGNED_TO_COURIER").await;
    transition(&w, &courier, &id, "IN_TRANSIT").await;

    let (status, _) = send(
        &w.app,
        request(
            "PATCH",
            &format!("/shipments/{id}/fees"),
            &w.admin,
            Some(json!({ "client_flat_rate_fee": "18.50" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, shipment) =
        send(&w.app, request("GET", &format!("/shipments/{id}"), &w.admin, None)).await;
    assert_eq!(money(&shipment["client_flat_rate_fee"]), dec!(18.50));
}

#[tokio::test]
async fn super_user_sees_rows_without_fees() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;
    deliver(&w, &id).await;

    let super_user = Identity::super_user();
    let (status, rows) = send(&w.app, request("GET", "/shipments", &super_user, None)).await;

    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["client_flat_rate_fee"].is_null());
    assert!(rows[0]["courier_commission"].is_null());
    assert!(rows[0]["net_profit"].is_null());

    let (status, _) =
        send(&w.app, request("GET", "/reports/financials", &super_user, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn shipment_list_filters_by_status() {
    let w = world().await;
    let delivered = create_shipment(&w, "100").await;
    create_shipment(&w, "50").await;
    deliver(&w, &delivered).await;

    let (status, rows) =
        send(&w.app, request("GET", "/shipments?status=DELIVERED", &w.admin, None)).await;

    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], delivered);
}

#[tokio::test]
async fn penalty_and_payout_flow() {
    let w = world().await;
    for _ in 0..5 {
        let id = create_shipment(&w, "100").await;
        deliver(&w, &id).await;
    }
    let courier = Identity::courier(&w.courier_id);

    let (status, penalty) = send(
        &w.app,
        request(
            "POST",
            &format!("/couriers/{}/penalties", w.courier_id),
            &w.admin,
            Some(json!({ "amount": "20", "reason": "damaged item" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(penalty["type"], "PENALTY");
    assert_eq!(money(&penalty["amount"]), dec!(-20));

    let (status, payout) = send(
        &w.app,
        request(
            "POST",
            &format!("/couriers/{}/payouts", w.courier_id),
            &courier,
            Some(json!({ "amount": "30" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payout["status"], "PENDING");
    let payout_id = payout["id"].as_str().unwrap().to_string();

    let (_, pending) = send(&w.app, request("GET", "/transactions/pending", &w.admin, None)).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, processed) = send(
        &w.app,
        request("POST", &format!("/transactions/{payout_id}/process"), &w.admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["status"], "PROCESSED");

    let (status, again) = send(
        &w.app,
        request("POST", &format!("/transactions/{payout_id}/process"), &w.admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["kind"], "transaction_already_processed");

    let stats_uri = format!("/couriers/{}", w.courier_id);
    let (_, stats) = send(&w.app, request("GET", &stats_uri, &w.admin, None)).await;
    assert_eq!(money(&stats["current_balance"]), dec!(0));
    assert_eq!(money(&stats["total_earnings"]), dec!(50));

    let (_, history) = send(
        &w.app,
        request("GET", &format!("/couriers/{}/transactions", w.courier_id), &courier, None),
    )
    .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 7);
    let balance: Decimal = history
        .iter()
        .filter(|tx| tx["status"] == "PROCESSED")
        .map(|tx| money(&tx["amount"]))
        .sum();
    assert_eq!(balance, Decimal::ZERO);
}

#[tokio::test]
async fn penalty_without_reason_returns_400() {
    let w = world().await;

    let (status, body) = send(
        &w.app,
        request(
            "POST",
            &format!("/couriers/{}/penalties", w.courier_id),
            &w.admin,
            Some(json!({ "amount": "5", "reason": "" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_amount");
}

#[tokio::test]
async fn unknown_transaction_returns_404() {
    let w = world().await;
    let fake_id = "00000000-0000-0000-0000-000000000000";

    let (status, body) = send(
        &w.app,
        request("POST", &format!("/transactions/{fake_id}/process"), &w.admin, None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "transaction_not_found");
}

#[tokio::test]
async fn client_financials_report_current_fee() {
    let w = world().await;
    create_shipment(&w, "100").await;
    create_shipment(&w, "40").await;

    let (status, _) = send(
        &w.app,
        request(
            "PATCH",
            &format!("/clients/{}/fee", w.client_id),
            &w.admin,
            Some(json!({ "flat_rate_fee": "20" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rows) = send(&w.app, request("GET", "/clients/financials", &w.admin, None)).await;

    assert_eq!(status, StatusCode::OK);
    let row = &rows.as_array().unwrap()[0];
    assert_eq!(row["total_orders"], 2);
    assert_eq!(money(&row["order_sum"]), dec!(140));
    assert_eq!(money(&row["flat_rate_fee"]), dec!(20));
}

#[tokio::test]
async fn status_report_buckets_packaged_shipments() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;
    transition(&w, &w.admin, &id, "PACKAGED_AND_WAITING_FOR_ASSIGNMENT").await;

    let super_user = Identity::super_user();
    let (status, report) =
        send(&w.app, request("GET", "/reports/status", &super_user, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["buckets"]["PENDING_ASSIGNMENT"], 1);
    assert_eq!(report["total"], 1);
    assert_eq!(report["overdue"], 0);
}

#[tokio::test]
async fn client_fee_change_does_not_touch_stamped_shipments() {
    let w = world().await;
    let id = create_shipment(&w, "100").await;
    transition(&w, &w.admin, &id, "PACKAGED_AND_WAITING_FOR_ASSIGNMENT").await;
    let (status, assigned) = transition(&w, &w.admin, &id, "ASSIGNED_TO_COURIER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&assigned["client_flat_rate_fee"]), dec!(15));

    let (status, _) = send(
        &w.app,
        request(
            "PATCH",
            &format!("/clients/{}/fee", w.client_id),
            &w.admin,
            Some(json!({ "flat_rate_fee": "20" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let courier = Identity::courier(&w.courier_id);
    for status in ["IN_TRANSIT", "OUT_FOR_DELIVERY", "DELIVERED"] {
        let (code, body) = transition(&w, &courier, &id, status).await;
        assert_eq!(code, StatusCode::OK, "{status}: {body}");
    }

    let (_, shipment) =
        send(&w.app, request("GET", &format!("/shipments/{id}"), &w.admin, None)).await;
    assert_eq!(money(&shipment["client_flat_rate_fee"]), dec!(15));

    let (_, report) = send(&w.app, request("GET", "/reports/financials", &w.admin, None)).await;
    assert_eq!(money(&report["total_client_fees"]), dec!(15));
}

async fn spawn_server() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, setup()).await.unwrap();
    });
    addr
}

async fn ws_handshake_status(addr: std::net::SocketAddr, who: &Identity) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let handshake = format!(
        "GET /ws HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         x-caller-role: {}\r\n\
         x-caller-id: {}\r\n\r\n",
        who.role, who.id
    );
    stream.write_all(handshake.as_bytes()).await.unwrap();

    let mut received = Vec::new();
    let mut chunk = [0u8; 512];
    while !received.windows(2).any(|pair| pair == b"\r\n") {
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before status line");
        received.extend_from_slice(&chunk[..read]);
    }

    let text = String::from_utf8_lossy(&received);
    text.lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn event_stream_rejects_non_admin_callers() {
    let addr = spawn_server().await;

    for who in [
        Identity::super_user(),
        Identity::courier(&Uuid::new_v4().to_string()),
        Identity::client(&Uuid::new_v4().to_string()),
    ] {
        let status_line = ws_handshake_status(addr, &who).await;
        assert!(status_line.starts_with("HTTP/1.1 403"), "{}: {status_line}", who.role);
    }
}

#[tokio::test]
async fn event_stream_upgrades_for_admin() {
    let addr = spawn_server().await;

    let status_line = ws_handshake_status(addr, &Identity::admin()).await;

    assert!(status_line.starts_with("HTTP/1.1 101"), "{status_line}");
}
