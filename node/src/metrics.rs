//! # Prometheus Metrics
//!
//! Per-endpoint request counters and latency, plus a counter per Rosetta
//! error code. Served as text at `/metrics` on the metrics port, from a
//! dedicated [`prometheus::Registry`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Requests served, by endpoint and HTTP status.
    pub requests_total: IntCounterVec,
    /// Handler latency in seconds, by endpoint.
    pub request_duration_seconds: HistogramVec,
    /// Rosetta errors returned, by error code.
    pub errors_total: IntCounterVec,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("stacks_rosetta".into()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Rosetta API requests served"),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Rosetta API handler latency in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Rosetta errors returned, by code"),
            &["code"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            errors_total,
        })
    }

    /// Records one finished request.
    pub fn observe(&self, endpoint: &str, status: StatusCode, elapsed: Duration, error_code: Option<u32>) {
        self.requests_total
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
        if let Some(code) = error_code {
            self.errors_total.with_label_values(&[&code.to_string()]).inc();
        }
    }

    /// Encodes every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
