use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::{config::AppConfig, error::ApiError};

/// Above this many tracked clients, stale entries are swept on the next request.
const SWEEP_THRESHOLD: usize = 1024;

/// RateLimitPolicy
///
/// How many requests one client may make inside a sliding window, and the error
/// code/message it gets once the budget is spent.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub window: Duration,
    pub code: &'static str,
    pub message: &'static str,
    /// Successful (2xx) responses give their slot back, so only failures count.
    pub skip_successful: bool,
}

impl RateLimitPolicy {
    /// Failed logins per client, sized from `LOGIN_RATE_LIMIT_MAX` and `RATE_LIMIT_WINDOW_MS`.
    pub fn login(config: &AppConfig) -> Self {
        Self {
            max_requests: config.login_rate_limit_max,
            window: config.rate_limit_window,
            code: "LOGIN_RATE_LIMIT_EXCEEDED",
            message: "Too many login attempts, please try again later",
            skip_successful: true,
        }
    }

    /// Password reset requests: three per client per hour.
    pub fn password_reset() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60 * 60),
            code: "PASSWORD_RESET_RATE_LIMIT_EXCEEDED",
            message: "Too many password reset requests, please try again later",
            skip_successful: false,
        }
    }
}

/// RateLimiter
///
/// Sliding-window counter keyed by client address. Clones share the same counters,
/// so one limiter can sit in front of a route for the lifetime of a router.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: Arc<RateLimitPolicy>,
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            hits: Arc::default(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Records a hit for `key` and returns its timestamp, or the time until the oldest
    /// hit leaves the window when the budget is already spent.
    pub fn try_acquire(&self, key: &str, now: Instant) -> Result<Instant, Duration> {
        let window = self.policy.window;
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        if hits.len() > SWEEP_THRESHOLD {
            hits.retain(|_, stamps| {
                prune(stamps, now, window);
                !stamps.is_empty()
            });
        }

        let stamps = hits.entry(key.to_string()).or_default();
        prune(stamps, now, window);
        if stamps.len() >= self.policy.max_requests {
            let retry_after = stamps
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Err(retry_after);
        }
        stamps.push_back(now);
        Ok(now)
    }

    /// Gives back a slot taken by `try_acquire`.
    pub fn release(&self, key: &str, stamp: Instant) {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stamps) = hits.get_mut(key)
            && let Some(position) = stamps.iter().rposition(|hit| *hit == stamp)
        {
            stamps.remove(position);
        }
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while stamps
        .front()
        .is_some_and(|oldest| now.duration_since(*oldest) >= window)
    {
        stamps.pop_front();
    }
}

/// client_key
///
/// Address a request is counted against: the first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the peer address of the connection.
pub fn client_key(request: &Request) -> String {
    let headers = request.headers();
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return forwarded.to_string();
    }
    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// rate_limit
///
/// Route middleware. Rejects with 429 and a `Retry-After` header once the client has
/// spent its budget.
pub async fn rate_limit(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    let policy = limiter.policy();

    let stamp = match limiter.try_acquire(&key, Instant::now()) {
        Ok(stamp) => stamp,
        Err(retry_after) => {
            tracing::warn!(client = %key, code = policy.code, "rate limit exceeded");
            let mut response = ApiError::too_many_requests(policy.code, policy.message).into_response();
            let seconds = retry_after.as_secs().max(1);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            return response;
        }
    };

    let response = next.run(request).await;
    if policy.skip_successful && response.status().is_success() {
        limiter.release(&key, stamp);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn limiter(max_requests: usize, window: Duration) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy {
            max_requests,
            window,
            code: "TEST_LIMIT",
            message: "slow down",
            skip_successful: false,
        })
    }

    #[test]
    fn budget_is_per_client_and_window() {
        let limiter = limiter(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.try_acquire("10.0.0.1", start).is_ok());
        assert!(limiter.try_acquire("10.0.0.1", start).is_ok());
        let retry_after = limiter.try_acquire("10.0.0.1", start).unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(60));
        assert!(limiter.try_acquire("10.0.0.2", start).is_ok());

        let later = start + Duration::from_secs(60);
        assert!(limiter.try_acquire("10.0.0.1", later).is_ok());
    }

    #[test]
    fn released_slots_can_be_reused() {
        let limiter = limiter(1, Duration::from_secs(60));
        let now = Instant::now();

        let stamp = limiter.try_acquire("10.0.0.1", now).unwrap();
        assert!(limiter.try_acquire("10.0.0.1", now).is_err());
        limiter.release("10.0.0.1", stamp);
        assert!(limiter.try_acquire("10.0.0.1", now).is_ok());
    }

    #[test]
    fn client_key_prefers_forwarded_headers() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.195, 70.41.3.18")
            .header("X-Real-IP", "198.51.100.42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.195");

        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "198.51.100.42");

        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4242))));
        assert_eq!(client_key(&request), "192.0.2.7");
    }
}
