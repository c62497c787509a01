//! API gateway for the order fulfillment system.
//!
//! Mediates authentication by delegation (the gateway holds no credentials),
//! fronts the in-process reservation engine, forwards order and auth traffic
//! to their owning collaborators, and bridges to the invoice compute
//! function — with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod invoice;
pub mod proxy;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::{InMemoryJournal, ReservationCoordinator, ReservationJournal};
use stock_ledger::{InMemoryStockLedger, StockLedger};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::{AuthServiceVerifier, TokenVerifier};
use config::Config;
use invoice::{HttpInvoiceClient, InvoiceGenerator};
use proxy::UpstreamClient;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, J, V, G>(
    state: Arc<AppState<L, J, V, G>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    // Prometheus scrape endpoint; counters come from the ledger and
    // coordinator, so there is nothing gateway-specific to add here.
    let metrics_router = Router::new()
        .route(
            "/metrics",
            get(|State(handle): State<PrometheusHandle>| async move {
                (
                    [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                    handle.render(),
                )
            }),
        )
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/auth/register", post(routes::auth::register::<L, J, V, G>))
        .route("/api/auth/login", post(routes::auth::login::<L, J, V, G>))
        .route("/api/auth/refresh", post(routes::auth::refresh::<L, J, V, G>))
        .route("/api/orders", get(routes::orders::list::<L, J, V, G>))
        .route("/api/orders", post(routes::orders::create::<L, J, V, G>))
        .route("/api/orders/{id}", get(routes::orders::get::<L, J, V, G>))
        .route("/api/orders/{id}", patch(routes::orders::update::<L, J, V, G>))
        .route("/api/stock", get(routes::stock::list::<L, J, V, G>))
        .route("/api/stock", post(routes::stock::create::<L, J, V, G>))
        .route("/api/stock/{product_id}", get(routes::stock::get::<L, J, V, G>))
        .route("/api/reserve", post(routes::reserve::reserve::<L, J, V, G>))
        .route("/api/release", post(routes::reserve::release::<L, J, V, G>))
        .route(
            "/api/orders/{order_id}/invoice",
            post(routes::invoice::create::<L, J, V, G>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: in-memory reservation engine,
/// HTTP-delegating verifier, and reqwest-backed collaborator clients.
pub fn create_default_state(
    config: &Config,
) -> Arc<AppState<InMemoryStockLedger, InMemoryJournal, AuthServiceVerifier, HttpInvoiceClient>> {
    let ledger = InMemoryStockLedger::new();
    let journal = InMemoryJournal::new();
    let coordinator = ReservationCoordinator::new(ledger.clone(), journal);

    Arc::new(AppState {
        ledger,
        coordinator,
        verifier: AuthServiceVerifier::new(&config.auth_service_url, config.verify_timeout),
        invoices: HttpInvoiceClient::new(&config.invoice_function_url, config.invoice_timeout),
        auth_upstream: UpstreamClient::new(&config.auth_service_url, config.upstream_timeout),
        orders_upstream: UpstreamClient::new(&config.orders_service_url, config.upstream_timeout),
    })
}
