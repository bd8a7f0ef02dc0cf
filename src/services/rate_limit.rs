use std::{
    net::SocketAddr,
    sync::{Mutex, PoisonError},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    config::RateLimitConfig,
    error::{AppError, ServiceError},
    state::SharedState,
};

/// Map size above which expired windows are swept, at most once per window length.
const SWEEP_THRESHOLD: usize = 1024;

struct Window {
    started: Instant,
    used: u32,
}

/// Fixed-window limiter: each key gets `points` events per `window`.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    next_sweep: Mutex<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given budget.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            next_sweep: Mutex::new(Instant::now() + config.window),
            config,
            windows: DashMap::new(),
        }
    }

    /// Consume one point for `key`.
    pub fn check(&self, key: &str) -> Result<(), ServiceError> {
        let now = Instant::now();
        self.sweep_expired(now);

        let mut window = self.windows.entry(key.to_owned()).or_insert(Window {
            started: now,
            used: 0,
        });

        if now.duration_since(window.started) >= self.config.window {
            window.started = now;
            window.used = 0;
        }

        if window.used >= self.config.points {
            return Err(ServiceError::RateLimited);
        }
        window.used += 1;
        Ok(())
    }

    /// Drop the window of `key`, e.g. when its connection closes.
    pub fn forget(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop windows that ended; an expired window would be reset on its next use anyway.
    ///
    /// Must not run while an entry of `windows` is borrowed.
    fn sweep_expired(&self, now: Instant) {
        if self.windows.len() < SWEEP_THRESHOLD {
            return;
        }
        {
            let mut next_sweep = self.next_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            if now < *next_sweep {
                return;
            }
            *next_sweep = now + self.config.window;
        }

        let window = self.config.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, entry| now.duration_since(entry.started) < window);
        debug!(
            evicted = before.saturating_sub(self.windows.len()),
            "expired rate limit windows swept"
        );
    }
}

/// Axum middleware applying the REST budget per caller IP.
pub async fn limit_by_ip(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if let Err(err) = state.api_limiter().check(&key) {
        warn!(caller = %key, path = %request.uri().path(), "api rate limit exceeded");
        return AppError::from(err).into_response();
    }

    next.run(request).await
}
