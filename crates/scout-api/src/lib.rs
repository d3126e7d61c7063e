//! # scout-api — HTTP Surface for the Lead Pipeline
//!
//! ## API Surface
//!
//! | Prefix                  | Module              | Access        |
//! |-------------------------|---------------------|---------------|
//! | `/health`               | here                | public        |
//! | `/metrics`              | [`routes::metrics`] | public        |
//! | `/api/metrics`          | [`routes::metrics`] | public        |
//! | `/api/jobs`             | [`routes::jobs`]    | public        |
//! | `/api/leads/*`          | [`routes::leads`]   | public        |
//! | `/api/exports*`         | [`routes::files`]   | public        |
//! | `/api/actions/*`        | [`routes::actions`] | auth gate     |
//! | `/openapi.json`         | [`openapi`]         | public        |
//!
//! ## Middleware stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → MetricsMiddleware → [AuthMiddleware on /api/actions] → Handler
//! ```
//!
//! The server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()` — the auth
//! gate's loopback bypass reads the peer address from `ConnectInfo`.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Liveness probe.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("x-api-key"),
        ])
}

/// Assemble the full application router.
///
/// Health and the read surface stay outside the auth gate; only
/// `/api/actions/*` mutations require credentials.
pub fn app(state: AppState) -> Router {
    let auth_gate = auth::AuthGate::from_config(state.config);
    let metrics = state.metrics.clone();

    let actions = routes::actions::router().layer(from_fn(auth::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(routes::metrics::router())
        .merge(routes::jobs::router())
        .merge(routes::leads::router())
        .merge(routes::files::router())
        .merge(openapi::router())
        .merge(actions)
        .layer(from_fn(middleware::metrics_middleware))
        .layer(cors_layer(&state.config.frontend_origins))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_gate))
        .layer(axum::Extension(metrics))
        .with_state(state)
}

/// Bind and serve until shutdown. Starts the automation loops first:
/// the verification loop always, the pipeline loop when auto-start is
/// enabled.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    if state.controller.auto_start_enabled() {
        state.controller.start();
    }
    state.controller.start_verification();

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = scout_clients::Config::load();
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost:5432/webscout_test")
            .expect("lazy pool");
        let controller = scout_sched::AutomationController::new(pool.clone(), config);
        AppState::new(pool, config, controller)
    }

    fn with_peer(mut request: Request<Body>, addr: [u8; 4]) -> Request<Body> {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((addr, 40000))));
        request
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app(test_state());
        let request = with_peer(
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
            [10, 0, 0, 9],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = app(test_state());
        let request = with_peer(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
            [10, 0, 0, 9],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn actions_are_gated_for_remote_callers() {
        // MUTATION_LOCALHOST_BYPASS defaults on, but this caller is not
        // loopback and no key is configured → 401 without touching the
        // database.
        let app = app(test_state());
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/api/actions/automation/settings")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
            [10, 0, 0, 9],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn loopback_caller_passes_the_gate() {
        let app = app(test_state());
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/api/actions/automation/settings")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
            [127, 0, 0, 1],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
