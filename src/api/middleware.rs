//! Rate limiting middleware.
//!
//! A fixed-window counter keyed by `operation:principal`, where the
//! principal is the authenticated user id when a valid bearer token is
//! present and the client IP otherwise. The limiter is plain state injected
//! through [`AppState`](super::AppState); nothing here is process-global.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use super::AppState;
use crate::auth;
use crate::error::AppError;

/// In-memory fixed-window rate limiter.
///
/// Counters reset when their window has lapsed, checked against the wall
/// clock on each hit. Expired entries are swept opportunistically (roughly
/// one check in 128) rather than on a timer. State is per-process: it is
/// lost on restart and not shared between instances.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    inner: Arc<Mutex<LimiterState>>,
}

#[derive(Debug, Default)]
struct LimiterState {
    counters: HashMap<String, WindowCounter>,
    checks: u64,
}

#[derive(Debug)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            inner: Arc::new(Mutex::new(LimiterState::default())),
        }
    }

    /// Limiter configured from `POMOTRACK_RATE_LIMIT` (requests per minute,
    /// default 100). Returns `None` when set to 0, disabling limiting.
    pub fn from_env() -> Option<Self> {
        let max = std::env::var("POMOTRACK_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(100);
        (max > 0).then(|| Self::new(max, Duration::from_secs(60)))
    }

    /// Record a hit for `key`. Returns false when the key is over its
    /// budget for the current window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.inner.lock().expect("rate limiter lock poisoned");

        state.checks += 1;
        if state.checks % 128 == 0 {
            let window = self.window;
            state
                .counters
                .retain(|_, c| now.duration_since(c.window_start) < window);
        }

        let counter = state
            .counters
            .entry(key.to_string())
            .or_insert(WindowCounter {
                window_start: now,
                count: 0,
            });

        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.count = 0;
        }

        if counter.count < self.max_requests {
            counter.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(limiter) = &state.limiter else {
        return Ok(next.run(request).await);
    };

    let key = format!(
        "{}:{}",
        operation_of(request.uri().path()),
        principal_of(&state, &request)
    );

    if limiter.check(&key) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for {}", key);
        Err(AppError::RateLimited)
    }
}

/// The resource segment after the API prefix, e.g. `tasks` for
/// `/api/v1/tasks/{id}/complete`.
fn operation_of(path: &str) -> &str {
    path.strip_prefix("/api/v1/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("root")
}

/// Authenticated user id when the bearer token verifies, client IP
/// otherwise. Verification failures fall back to IP; the auth extractor
/// rejects them properly further in.
fn principal_of(state: &AppState, request: &Request<Body>) -> String {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Ok(claims) = auth::verify_jwt(&state.auth, token) {
            return claims.sub.to_string();
        }
    }

    extract_client_ip(request).to_string()
}

/// Extract client IP from request.
fn extract_client_ip(request: &Request<Body>) -> IpAddr {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip_str) = value.split(',').next() {
                if let Ok(ip) = ip_str.trim().parse() {
                    return ip;
                }
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = request.headers().get("X-Real-IP") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse() {
                return ip;
            }
        }
    }

    // Default to localhost for local development
    "127.0.0.1".parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.check("tasks:alice"));
        }
    }

    #[test]
    fn blocks_requests_over_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("tasks:alice"));
        assert!(limiter.check("tasks:alice"));
        assert!(limiter.check("tasks:alice"));
        assert!(!limiter.check("tasks:alice"));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("tasks:alice"));
        assert!(limiter.check("tasks:alice"));
        assert!(!limiter.check("tasks:alice"));

        // Same user, different operation: separate budget.
        assert!(limiter.check("pomodoros:alice"));
        // Same operation, different principal: separate budget.
        assert!(limiter.check("tasks:bob"));
    }

    #[test]
    fn window_lapse_resets_the_counter() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("tasks:alice"));
        assert!(!limiter.check("tasks:alice"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("tasks:alice"));
    }

    #[test]
    fn operation_of_strips_prefix_and_ids() {
        assert_eq!(operation_of("/api/v1/tasks/abc/complete"), "tasks");
        assert_eq!(operation_of("/api/v1/health"), "health");
        assert_eq!(operation_of("/other"), "root");
    }
}
