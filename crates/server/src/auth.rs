//! Bearer authentication and per-key rate limiting for the API routes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::warn;

const ANONYMOUS_KEY: &str = "anonymous";

#[derive(Clone)]
pub struct AuthState {
    api_key: Option<Arc<SecretString>>,
}

impl AuthState {
    /// No key configured means every request is allowed.
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self { api_key: api_key.map(Arc::new) }
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn allows(&self, token: Option<&str>) -> bool {
        match (&self.api_key, token) {
            (None, _) => true,
            (Some(expected), Some(token)) => {
                expected.expose_secret().as_bytes().ct_eq(token.as_bytes()).into()
            }
            (Some(_), None) => false,
        }
    }
}

struct RateLimitWindow {
    started_at: Instant,
    count: u32,
}

/// Rate-limit key of a request whose bearer token passed authentication.
#[derive(Clone, Debug)]
struct CallerKey(String);

/// Fixed window per caller key. Authenticated callers are told apart by bearer token; every
/// other request shares the anonymous window.
#[derive(Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, windows: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    async fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, window| now.duration_since(window.started_at) < self.window);

        let window = windows
            .entry(key.to_owned())
            .or_insert(RateLimitWindow { started_at: now, count: 0 });
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = bearer_token(req.headers()).map(str::to_owned);
    if auth.allows(token.as_deref()) {
        if let Some(token) = token.filter(|_| auth.enabled()) {
            req.extensions_mut().insert(CallerKey(token));
        }
        return next.run(req).await;
    }

    warn!(event_name = "http.auth.rejected", path = %req.uri().path(), "bearer token rejected");
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = req.extensions().get::<CallerKey>().map_or(ANONYMOUS_KEY, |key| key.0.as_str());
    if rate_limit.admit(key).await {
        return next.run(req).await;
    }

    warn!(event_name = "http.rate_limited", path = %req.uri().path(), "rate limit exceeded");
    (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": "rate_limited" }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}
