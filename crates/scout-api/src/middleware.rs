//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware; domain-level gauges are refreshed on each `/metrics`
//! scrape (pull model) by the metrics handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, refreshed on scrape) --
    businesses_total: IntGauge,
    businesses_no_website: IntGauge,
    domains_total: GaugeVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("scout_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "scout_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("scout_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let businesses_total =
            IntGauge::new("scout_businesses_total", "Total imported businesses")
                .expect("metric can be created");
        let businesses_no_website = IntGauge::new(
            "scout_businesses_no_website",
            "Businesses without a known website",
        )
        .expect("metric can be created");
        let domains_total = GaugeVec::new(
            Opts::new("scout_domains_total", "Domains by classification status"),
            &["status"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(businesses_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(businesses_no_website.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(domains_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                businesses_total,
                businesses_no_website,
                domains_total,
            }),
        }
    }

    fn record(&self, method: &str, path: &str, status: u16, elapsed_secs: f64) {
        let status_label = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_label])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(elapsed_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_label])
                .inc();
        }
    }

    /// Refresh the pull-model gauges before a scrape.
    pub async fn refresh_gauges(&self, pool: &sqlx::PgPool) {
        if let Ok((total, no_website, _, _)) = scout_store::businesses::totals(pool).await {
            self.inner.businesses_total.set(total);
            self.inner.businesses_no_website.set(no_website);
        }
        if let Ok(counts) = scout_store::domains::status_counts(pool).await {
            for (status, count) in counts {
                self.inner
                    .domains_total
                    .with_label_values(&[&status])
                    .set(count as f64);
            }
        }
    }

    /// Encode the registry in Prometheus text format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Tower middleware recording per-request metrics.
pub async fn metrics_middleware(
    axum::Extension(metrics): axum::Extension<ApiMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    metrics.record(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_recorded_requests() {
        let metrics = ApiMetrics::new();
        metrics.record("GET", "/api/metrics", 200, 0.01);
        metrics.record("POST", "/api/actions/pipeline-run", 401, 0.002);

        let text = metrics.encode();
        assert!(text.contains("scout_http_requests_total"));
        assert!(text.contains("scout_http_errors_total"));
        assert!(text.contains("pipeline-run"));
    }

    #[test]
    fn non_error_statuses_do_not_count_as_errors() {
        let metrics = ApiMetrics::new();
        metrics.record("GET", "/health", 200, 0.001);
        let text = metrics.encode();
        // The errors counter family exists but has no samples yet.
        assert!(!text.contains("scout_http_errors_total{"));
    }
}
