//! Per-client request throttling.
//!
//! Every client IP gets one token bucket per [`RouteClass`]. Upload
//! endpoints draw from their own, smaller bucket so a burst of file uploads
//! cannot starve the JSON API for the same client. Health checks and CORS
//! preflights are never throttled.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Uploads get this fraction of the API quota.
const UPLOAD_SHARE: f64 = 0.25;

/// Which bucket a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Api,
    Upload,
}

impl RouteClass {
    /// `None` for requests that are never throttled.
    pub fn of(method: &Method, path: &str) -> Option<Self> {
        if method == Method::OPTIONS || path == "/health" {
            None
        } else if path.ends_with("/upload") {
            Some(Self::Upload)
        } else {
            Some(Self::Api)
        }
    }
}

/// Refill rate and capacity of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    pub per_sec: f64,
    pub burst: f64,
}

impl Quota {
    fn scaled(self, share: f64) -> Self {
        Self {
            per_sec: self.per_sec * share,
            burst: (self.burst * share).max(1.0),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    seen: Instant,
}

impl Bucket {
    fn take(&mut self, quota: Quota, now: Instant) -> bool {
        let idle = now.saturating_duration_since(self.seen).as_secs_f64();
        self.tokens = quota.burst.min(self.tokens + idle * quota.per_sec);
        self.seen = now;
        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<(IpAddr, RouteClass), Bucket>>>,
    api: Quota,
    upload: Quota,
}

impl RateLimiter {
    pub fn new(api: Quota) -> Self {
        Self {
            buckets: Arc::default(),
            api,
            upload: api.scaled(UPLOAD_SHARE),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(Quota {
            per_sec: config.rate_limit_per_sec,
            burst: config.rate_limit_burst,
        })
    }

    pub fn quota(&self, class: RouteClass) -> Quota {
        match class {
            RouteClass::Api => self.api,
            RouteClass::Upload => self.upload,
        }
    }

    /// Spend one token from the client's bucket for `class`.
    pub async fn allow(&self, ip: IpAddr, class: RouteClass) -> bool {
        self.allow_at(ip, class, Instant::now()).await
    }

    async fn allow_at(&self, ip: IpAddr, class: RouteClass, now: Instant) -> bool {
        let quota = self.quota(class);
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry((ip, class))
            .or_insert(Bucket {
                tokens: quota.burst,
                seen: now,
            })
            .take(quota, now)
    }

    /// Forget clients not seen for `max_idle`.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .await
            .retain(|_, bucket| now.saturating_duration_since(bucket.seen) < max_idle);
    }
}

pub async fn throttle(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let class = RouteClass::of(req.method(), req.uri().path());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let (Some(class), Some(ip)) = (class, peer.or_else(|| forwarded_ip(req.headers()))) {
        if !limiter.allow(ip, class).await {
            warn!(%ip, ?class, path = req.uri().path(), "Rate limit exceeded");
            return Err(ServerError::RateLimited);
        }
    }

    Ok(next.run(req).await)
}

/// Client address reported by a reverse proxy, first hop wins.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    ["x-forwarded-for", "x-real-ip"].iter().find_map(|name| {
        headers
            .get(*name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_sec: f64, burst: f64) -> RateLimiter {
        RateLimiter::new(Quota { per_sec, burst })
    }

    #[test]
    fn routes_are_classified() {
        assert_eq!(RouteClass::of(&Method::GET, "/health"), None);
        assert_eq!(RouteClass::of(&Method::OPTIONS, "/messages"), None);
        assert_eq!(RouteClass::of(&Method::GET, "/messages"), Some(RouteClass::Api));
        assert_eq!(
            RouteClass::of(&Method::POST, "/files/upload"),
            Some(RouteClass::Upload)
        );
        assert_eq!(
            RouteClass::of(&Method::POST, "/users/upload"),
            Some(RouteClass::Upload)
        );
        assert_eq!(RouteClass::of(&Method::GET, "/files/abc"), Some(RouteClass::Api));
    }

    #[test]
    fn upload_quota_is_a_share_of_the_api_quota() {
        let limiter = limiter(20.0, 60.0);
        assert_eq!(
            limiter.quota(RouteClass::Upload),
            Quota {
                per_sec: 5.0,
                burst: 15.0
            }
        );
        // never below one request
        assert_eq!(self::limiter(1.0, 2.0).quota(RouteClass::Upload).burst, 1.0);
    }

    #[tokio::test]
    async fn burst_then_refill() {
        let limiter = limiter(2.0, 3.0);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.allow_at(ip, RouteClass::Api, start).await);
        }
        assert!(!limiter.allow_at(ip, RouteClass::Api, start).await);

        // half a second at 2/s buys exactly one request
        let later = start + Duration::from_millis(500);
        assert!(limiter.allow_at(ip, RouteClass::Api, later).await);
        assert!(!limiter.allow_at(ip, RouteClass::Api, later).await);
    }

    #[tokio::test]
    async fn classes_and_clients_have_separate_buckets() {
        let limiter = limiter(1.0, 4.0);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        let now = Instant::now();

        // upload burst is 1
        assert!(limiter.allow_at(a, RouteClass::Upload, now).await);
        assert!(!limiter.allow_at(a, RouteClass::Upload, now).await);

        assert!(limiter.allow_at(a, RouteClass::Api, now).await);
        assert!(limiter.allow_at(b, RouteClass::Upload, now).await);
    }

    #[tokio::test]
    async fn idle_clients_are_purged() {
        let limiter = limiter(10.0, 5.0);
        assert!(limiter.allow("192.168.1.1".parse().unwrap(), RouteClass::Api).await);

        limiter.purge_stale(Duration::ZERO).await;
        assert!(limiter.buckets.lock().await.is_empty());
    }

    #[test]
    fn proxy_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_ip(&headers), None);

        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(forwarded_ip(&headers), Some("198.51.100.2".parse().unwrap()));

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(forwarded_ip(&headers), Some("203.0.113.7".parse().unwrap()));

        headers.insert("x-forwarded-for", "garbage".parse().unwrap());
        assert_eq!(forwarded_ip(&headers), Some("198.51.100.2".parse().unwrap()));
    }
}
