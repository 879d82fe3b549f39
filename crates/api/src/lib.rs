//! HTTP API server for the marketplace order workflow.
//!
//! Exposes order placement, cancellation and shipment under `/pedidos`, the
//! notification inbox and live stream under `/notificaciones`, plus health
//! and Prometheus metrics endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use domain::MessageSet;
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketplaceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::NotificationBus;

use auth::IdentityVerifier;
use config::Config;
use routes::metrics::MetricsState;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketplaceStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(MetricsState {
            handle: metrics_handle,
            bus: state.bus.clone(),
        });

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/pedidos", post(routes::orders::create::<S>))
        // Segments at the same position share one parameter name; here `{id}`
        // carries the user type.
        .route("/pedidos/{id}", get(routes::orders::list::<S>))
        .route("/pedidos/detalle/{id}", get(routes::orders::detail::<S>))
        .route("/pedidos/{id}/cancelacion", put(routes::orders::cancel::<S>))
        .route(
            "/pedidos/{id}/enviar/{usuario_id}",
            patch(routes::orders::ship::<S>),
        )
        .route("/notificaciones", post(routes::notifications::create::<S>))
        .route(
            "/notificaciones/usuario/{id}",
            get(routes::notifications::list_for_user::<S>),
        )
        .route(
            "/notificaciones/no-leidas/{id}",
            get(routes::notifications::list_unread::<S>),
        )
        .route(
            "/notificaciones/leidas/{id}",
            get(routes::notifications::list_read::<S>),
        )
        .route(
            "/notificaciones/{id}/leida",
            patch(routes::notifications::mark_read::<S>),
        )
        .route(
            "/notificaciones/stream/{id}",
            get(routes::notifications::stream::<S>),
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

/// Creates the application state around `store` using the configured
/// notification language and token table.
pub fn create_state<S: MarketplaceStore>(store: S, config: &Config) -> Arc<AppState<S>> {
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(config.auth_tokens.clone());
    Arc::new(AppState::new(
        store,
        MessageSet::new(config.notification_language),
        NotificationBus::default(),
        verifier,
    ))
}
