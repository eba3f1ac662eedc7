//! Request throttling and CORS settings for the public API.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Allowed CORS origins (from CONFESS_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
    /// Limits confession creation per client IP (from CONFESS_RATE_LIMIT)
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    /// Load security configuration from environment variables.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CONFESS_CORS_ORIGINS").ok().map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let trust_proxy = std::env::var("CONFESS_TRUST_PROXY")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let rate_limiter = std::env::var("CONFESS_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|max| {
                let limiter = RateLimiter::new(max, Duration::from_secs(60));
                if trust_proxy {
                    limiter.trusting_proxy_headers()
                } else {
                    limiter
                }
            });

        Self {
            cors_origins,
            rate_limiter,
        }
    }

    /// No CORS restrictions and no throttling (local development/testing).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
            rate_limiter: None,
        }
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        Self {
            cors_origins: None,
            rate_limiter: Some(RateLimiter::new(max_requests, Duration::from_secs(60))),
        }
    }

    /// Key the rate limiter on proxy headers. Only for deployments behind a
    /// reverse proxy that overwrites them.
    pub fn trusting_proxy_headers(mut self) -> Self {
        self.rate_limiter = self.rate_limiter.map(RateLimiter::trusting_proxy_headers);
        self
    }
}

/// In-memory sliding window rate limiter keyed by client IP.
///
/// Clients whose window has emptied are swept at most once per window, so
/// the table only holds clients seen within the last window.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
    state: Arc<Mutex<LimiterState>>,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<IpAddr, Vec<Instant>>,
    last_sweep: Instant,
}

impl LimiterState {
    fn sweep(&mut self, now: Instant, window: Duration) {
        self.clients.retain(|_, timestamps| {
            timestamps.retain(|&t| now.duration_since(t) < window);
            !timestamps.is_empty()
        });
        self.last_sweep = now;
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy_headers: false,
            state: Arc::new(Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    pub fn trusting_proxy_headers(mut self) -> Self {
        self.trust_proxy_headers = true;
        self
    }

    /// Record a request from `ip`. Returns false once the window is full.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();

        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        if now.duration_since(state.last_sweep) >= self.window {
            state.sweep(now, self.window);
        }

        let entry = state.clients.entry(ip).or_default();
        entry.retain(|&t| now.duration_since(t) < self.window);

        if entry.len() < self.max_requests as usize {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Forget clients with no requests inside the current window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.state
            .lock()
            .expect("rate limiter lock poisoned")
            .sweep(now, self.window);
    }

    fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .expect("rate limiter lock poisoned")
            .clients
            .len()
    }
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = extract_client_ip(&request, rate_limiter.trust_proxy_headers);

    if rate_limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Client IP from the peer address, or from proxy headers when the
/// deployment trusts them. Falls back to localhost.
fn extract_client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn forwarded_ip(request: &Request<Body>) -> Option<IpAddr> {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip_str) = value.split(',').next() {
                if let Ok(ip) = ip_str.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }

    let real_ip = request.headers().get("X-Real-IP")?;
    real_ip.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_requests_under_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for _ in 0..5 {
            assert!(limiter.check(ip));
        }
    }

    #[test]
    fn rate_limiter_blocks_requests_over_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));

        assert!(!limiter.check(ip));
    }

    #[test]
    fn rate_limiter_tracks_ips_independently() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let ip1: IpAddr = "192.168.1.1".parse().unwrap();
        let ip2: IpAddr = "192.168.1.2".parse().unwrap();

        assert!(limiter.check(ip1));
        assert!(limiter.check(ip1));
        assert!(!limiter.check(ip1));

        assert!(limiter.check(ip2));
        assert!(limiter.check(ip2));
        assert!(!limiter.check(ip2));
    }

    #[test]
    fn cleanup_forgets_expired_clients() {
        let limiter = RateLimiter::new(2, Duration::from_millis(1));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(limiter.check(ip));

        std::thread::sleep(Duration::from_millis(5));
        limiter.cleanup();

        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn idle_clients_are_swept_on_later_checks() {
        let limiter = RateLimiter::new(100, Duration::from_millis(1));
        for i in 0..5000u32 {
            assert!(limiter.check(IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + i))));
        }

        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check("192.0.2.1".parse().unwrap()));

        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn proxy_headers_are_ignored_unless_trusted() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            extract_client_ip(&request, true),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            extract_client_ip(&request, false),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn peer_address_is_used_when_headers_are_untrusted() {
        let peer: SocketAddr = "198.51.100.4:5555".parse().unwrap();
        let mut request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        assert_eq!(extract_client_ip(&request, false), peer.ip());
    }

    #[test]
    fn real_ip_header_is_used_when_trusted() {
        let request = Request::builder()
            .header("X-Real-IP", " 203.0.113.9 ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn security_config_disabled_has_no_limits() {
        let config = SecurityConfig::disabled();
        assert!(config.cors_origins.is_none());
        assert!(config.rate_limiter.is_none());
    }
}
