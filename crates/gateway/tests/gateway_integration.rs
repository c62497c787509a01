//! Integration tests for the gateway.
//!
//! Protected routes run against a static verifier; forwarding routes run
//! against real collaborator servers bound to ephemeral ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::UserId;
use gateway::auth::StaticTokenVerifier;
use gateway::invoice::StaticInvoiceGenerator;
use gateway::proxy::UpstreamClient;
use gateway::state::AppState;
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::{InMemoryJournal, ReservationCoordinator};
use serde_json::{Value, json};
use stock_ledger::InMemoryStockLedger;
use tower::ServiceExt;

const TOKEN: &str = "valid-token";

// The process-global metrics recorder can only be installed once; every
// test harness shares this handle.
static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

fn prometheus_handle() -> PrometheusHandle {
    PROMETHEUS
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// An address nothing listens on: the discard port on localhost.
const DEAD_UPSTREAM: &str = "http://127.0.0.1:9";

struct Harness {
    app: Router,
    invoices: StaticInvoiceGenerator,
}

fn setup_with_upstreams(auth_url: &str, orders_url: &str) -> Harness {
    let ledger = InMemoryStockLedger::new();
    let journal = InMemoryJournal::new();
    let coordinator = ReservationCoordinator::new(ledger.clone(), journal);

    let verifier = StaticTokenVerifier::new();
    verifier.insert(TOKEN, UserId::new(7));
    let invoices = StaticInvoiceGenerator::new();

    let state = Arc::new(AppState {
        ledger,
        coordinator,
        verifier,
        invoices: invoices.clone(),
        auth_upstream: UpstreamClient::new(auth_url, Duration::from_secs(2)),
        orders_upstream: UpstreamClient::new(orders_url, Duration::from_secs(2)),
    });

    Harness {
        app: gateway::create_app(state, prometheus_handle()),
        invoices,
    }
}

fn setup() -> Harness {
    setup_with_upstreams(DEAD_UPSTREAM, DEAD_UPSTREAM)
}

/// Binds an ephemeral port and serves the given router on it.
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind upstream listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "gateway");
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request("GET", "/api/stock", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_rejected_without_contacting_upstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream_hits = hits.clone();
    let upstream = Router::new().route(
        "/api/orders",
        get(move || {
            let hits = upstream_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!([]))
            }
        }),
    );
    let orders_url = spawn_upstream(upstream).await;
    let harness = setup_with_upstreams(DEAD_UPSTREAM, &orders_url);

    let response = harness
        .app
        .oneshot(request("GET", "/api/orders", Some("expired-token"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stock_upsert_and_read_round_trip() {
    let harness = setup();

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/stock",
            Some(TOKEN),
            Some(json!({"product_id": "sku-1", "quantity": 10})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["available"], 10);

    let response = harness
        .app
        .clone()
        .oneshot(request("GET", "/api/stock/sku-1", Some(TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["quantity"], 10);
    assert_eq!(json["reserved"], 0);

    let response = harness
        .app
        .oneshot(request("GET", "/api/stock", Some(TOKEN), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stock_get_unknown_product() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request("GET", "/api/stock/ghost", Some(TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserve_and_release_round_trip() {
    let harness = setup();

    harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/stock",
            Some(TOKEN),
            Some(json!({"product_id": "sku-1", "quantity": 10})),
        ))
        .await
        .unwrap();

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/reserve",
            Some(TOKEN),
            Some(json!({"order_id": "order-1", "product_id": "sku-1", "quantity": 4})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["entry_id"].as_str().is_some());

    let response = harness
        .app
        .clone()
        .oneshot(request("GET", "/api/stock/sku-1", Some(TOKEN), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["reserved"], 4);
    assert_eq!(json["available"], 6);

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/release",
            Some(TOKEN),
            Some(json!({"order_id": "order-1"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["released_entries"], 1);
    assert_eq!(json["restored_quantity"], 4);

    // Releasing again restores nothing.
    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/release",
            Some(TOKEN),
            Some(json!({"order_id": "order-1"})),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["released_entries"], 0);

    let response = harness
        .app
        .oneshot(request("GET", "/api/stock/sku-1", Some(TOKEN), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["reserved"], 0);
    assert_eq!(json["available"], 10);
}

#[tokio::test]
async fn test_reserve_insufficient_stock() {
    let harness = setup();

    harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/stock",
            Some(TOKEN),
            Some(json!({"product_id": "sku-1", "quantity": 2})),
        ))
        .await
        .unwrap();

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/reserve",
            Some(TOKEN),
            Some(json!({"order_id": "order-1", "product_id": "sku-1", "quantity": 3})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reserve_unknown_product() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/reserve",
            Some(TOKEN),
            Some(json!({"order_id": "order-1", "product_id": "ghost", "quantity": 1})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserve_zero_quantity() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/reserve",
            Some(TOKEN),
            Some(json!({"order_id": "order-1", "product_id": "sku-1", "quantity": 0})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_release_requires_order_id() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request("POST", "/api/release", Some(TOKEN), Some(json!({}))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_not_found_relayed_verbatim() {
    let upstream = Router::new().route(
        "/api/orders/{id}",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": "Order not found"})),
            )
        }),
    );
    let orders_url = spawn_upstream(upstream).await;
    let harness = setup_with_upstreams(DEAD_UPSTREAM, &orders_url);

    let response = harness
        .app
        .oneshot(request("GET", "/api/orders/999", Some(TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "Order not found");
}

#[tokio::test]
async fn test_order_create_injects_user_id() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let upstream_captured = captured.clone();
    let upstream = Router::new().route(
        "/api/orders",
        post(move |Json(body): Json<Value>| {
            let captured = upstream_captured.clone();
            async move {
                *captured.lock().unwrap() = Some(body);
                (StatusCode::CREATED, Json(json!({"id": 1})))
            }
        }),
    );
    let orders_url = spawn_upstream(upstream).await;
    let harness = setup_with_upstreams(DEAD_UPSTREAM, &orders_url);

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(TOKEN),
            Some(json!({"items": [{"product_id": "sku-1", "quantity": 1, "unit_price": "9.99"}]})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let forwarded = captured.lock().unwrap().clone().unwrap();
    assert_eq!(forwarded["user_id"], 7);
    assert_eq!(forwarded["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_list_injects_user_id() {
    let captured: Arc<Mutex<Option<HashMap<String, String>>>> = Arc::new(Mutex::new(None));
    let upstream_captured = captured.clone();
    let upstream = Router::new().route(
        "/api/orders",
        get(
            move |axum::extract::Query(params): axum::extract::Query<HashMap<String, String>>| {
                let captured = upstream_captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(params);
                    Json(json!([]))
                }
            },
        ),
    );
    let orders_url = spawn_upstream(upstream).await;
    let harness = setup_with_upstreams(DEAD_UPSTREAM, &orders_url);

    let response = harness
        .app
        .oneshot(request("GET", "/api/orders", Some(TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let params = captured.lock().unwrap().clone().unwrap();
    assert_eq!(params.get("user_id").map(String::as_str), Some("7"));
}

#[tokio::test]
async fn test_unreachable_upstream_returns_bad_gateway() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request("GET", "/api/orders/1", Some(TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().is_some());
}

#[tokio::test]
async fn test_login_passthrough_is_unauthenticated() {
    let upstream = Router::new().route(
        "/api/login",
        post(|Json(body): Json<Value>| async move {
            if body["username"] == "alice" {
                Json(json!({"access": "a", "refresh": "r", "user_id": 7})).into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"detail": "Invalid credentials"})),
                )
                    .into_response()
            }
        }),
    );
    let auth_url = spawn_upstream(upstream).await;
    let harness = setup_with_upstreams(&auth_url, DEAD_UPSTREAM);

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "pw"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user_id"], 7);

    // A rejected login is relayed with its original status and body.
    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "mallory", "password": "pw"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "Invalid credentials");
}

#[tokio::test]
async fn test_invoice_bridge_success() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/orders/42/invoice",
            Some(TOKEN),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["invoice_id"], "inv-42");
    assert!(json["invoice_url"].as_str().unwrap().ends_with(".pdf"));
    assert_eq!(harness.invoices.generated_count(), 1);
}

#[tokio::test]
async fn test_invoice_failure_status_propagated() {
    let harness = setup();
    harness.invoices.set_fail_status(Some(500));

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/api/orders/42/invoice",
            Some(TOKEN),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.invoices.generated_count(), 0);
}
