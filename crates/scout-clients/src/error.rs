//! Client error taxonomy.
//!
//! Workers branch on these variants: `RateLimited` feeds the
//! consecutive-429 bail-out counters, `BadResponse` becomes an `error`
//! verdict, and transport failures are either retried or recorded in
//! diagnostics depending on the caller's policy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, TLS, or timeout failure at the transport layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered HTTP 429.
    #[error("rate limited by upstream")]
    RateLimited,

    /// A non-success status that is not a typed data-absence signal.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    BadResponse(String),

    /// The client needs an API key or URL that is not configured.
    #[error("client not configured: {0}")]
    NotConfigured(&'static str),
}

impl ClientError {
    /// Whether this failure is a 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
            || matches!(self, Self::Status { status: 429, .. })
    }
}
