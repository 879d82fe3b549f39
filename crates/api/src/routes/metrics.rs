//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use workflow::NotificationBus;

/// State of the metrics router, separate from the application state.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub bus: NotificationBus,
}

/// GET /metrics: Prometheus text exposition.
///
/// Point-in-time gauges are refreshed right before rendering.
pub async fn get(State(state): State<MetricsState>) -> impl IntoResponse {
    metrics::gauge!("notification_stream_subscribers").set(state.bus.subscriber_count() as f64);

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}
