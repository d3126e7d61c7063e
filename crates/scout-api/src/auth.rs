//! The mutation auth gate.
//!
//! Every mutating route passes through this single middleware. If the
//! loopback bypass is enabled and the caller connected from localhost,
//! the request proceeds; otherwise the caller must present the
//! configured API key in `X-API-Key` or as a bearer token, compared in
//! constant time. No configured key means every non-loopback mutation
//! is rejected.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// The gate's configuration, injected as a request extension.
#[derive(Debug, Clone)]
pub struct AuthGate {
    pub api_key: Option<String>,
    pub localhost_bypass: bool,
}

impl AuthGate {
    pub fn from_config(config: &scout_clients::Config) -> Self {
        Self {
            api_key: config.mutation_api_key.clone(),
            localhost_bypass: config.mutation_localhost_bypass,
        }
    }
}

fn is_loopback(addr: &SocketAddr) -> bool {
    addr.ip().is_loopback()
}

/// Extract the presented token: `X-API-Key` first, then
/// `Authorization: Bearer`.
fn presented_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get("x-api-key") {
        if let Ok(token) = value.to_str() {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    let auth = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = auth.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    } else {
        None
    }
}

/// Constant-time equality; length differences still return false, but
/// the comparison over the shared prefix never short-circuits.
fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    if presented.len() != expected.len() {
        return false;
    }
    presented.ct_eq(expected).into()
}

/// Gate middleware. Mounted only on mutating routes.
pub async fn auth_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::Extension(gate): axum::Extension<AuthGate>,
    request: Request,
    next: Next,
) -> Response {
    if gate.localhost_bypass && is_loopback(&addr) {
        return next.run(request).await;
    }

    let Some(expected) = gate.api_key.as_deref() else {
        return AppError::Unauthorized("mutation API key is required".to_string())
            .into_response();
    };

    match presented_token(&request) {
        Some(token) if keys_match(&token, expected) => next.run(request).await,
        _ => AppError::Unauthorized("invalid mutation API key".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn test_app(gate: AuthGate) -> Router {
        Router::new()
            .route("/mutate", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn(auth_middleware))
            .layer(axum::Extension(gate))
    }

    fn request(addr: [u8; 4], headers: &[(&str, &str)]) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method("POST").uri("/mutate");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((addr, 40000))));
        request
    }

    #[tokio::test]
    async fn loopback_bypass_allows_localhost() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: true,
        });
        let response = app.oneshot(request([127, 0, 0, 1], &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn remote_caller_needs_the_key() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: true,
        });
        let response = app.oneshot(request([10, 1, 2, 3], &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn x_api_key_header_is_accepted() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: false,
        });
        let response = app
            .oneshot(request([10, 1, 2, 3], &[("x-api-key", "secret")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_token_is_accepted() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: false,
        });
        let response = app
            .oneshot(request([10, 1, 2, 3], &[("authorization", "Bearer secret")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: false,
        });
        let response = app
            .oneshot(request([10, 1, 2, 3], &[("x-api-key", "nope")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_configured_key_rejects_everyone() {
        let app = test_app(AuthGate {
            api_key: None,
            localhost_bypass: false,
        });
        let response = app
            .oneshot(request([127, 0, 0, 1], &[("x-api-key", "anything")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bypass_disabled_applies_to_loopback_too() {
        let app = test_app(AuthGate {
            api_key: Some("secret".into()),
            localhost_bypass: false,
        });
        let response = app.oneshot(request([127, 0, 0, 1], &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn constant_time_compare_matches_exactly() {
        assert!(keys_match("abc", "abc"));
        assert!(!keys_match("abc", "abd"));
        assert!(!keys_match("abc", "abcd"));
        assert!(!keys_match("", "abc"));
    }
}
