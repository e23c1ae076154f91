use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use chrono::{DateTime, Duration, Utc};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    pub max_requests: u32,
    /// Key clients by `Forwarded` / `X-Forwarded-For` instead of the socket
    /// peer. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::minutes(5),
            max_requests: 30,
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    pub fn rejection_message(&self) -> String {
        let minutes = self.window_size.num_minutes().max(1);
        format!(
            "Too many requests, please try again after {} minute{}",
            minutes,
            if minutes == 1 { "" } else { "s" }
        )
    }
}

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: i64 },
}

#[derive(Debug)]
struct RequestWindow {
    started_at: DateTime<Utc>,
    count: u32,
}

impl RequestWindow {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            count: 0,
        }
    }

    fn has_elapsed(&self, window_size: Duration, now: DateTime<Utc>) -> bool {
        now >= self.started_at + window_size
    }
}

/// Fixed-window request counter keyed by client address.
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, RequestWindow>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub async fn check_rate_limit(&self, client: &str) -> RateDecision {
        self.check_at(client, Utc::now()).await
    }

    pub async fn check_at(&self, client: &str, now: DateTime<Utc>) -> RateDecision {
        let mut windows = self.windows.write().await;

        let window = windows
            .entry(client.to_string())
            .or_insert_with(|| RequestWindow::new(now));

        // Reset fully at the window boundary
        if window.has_elapsed(self.config.window_size, now) {
            *window = RequestWindow::new(now);
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            RateDecision::Allowed {
                remaining: self.config.max_requests - window.count,
            }
        } else {
            let reset_at = window.started_at + self.config.window_size;
            RateDecision::Limited {
                retry_after_secs: (reset_at - now).num_seconds().max(0),
            }
        }
    }

    /// Drops windows that have already elapsed.
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, window| !window.has_elapsed(self.config.window_size, now));
        before - windows.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }
}

fn client_key(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware applying a shared [`RateLimiter`] to every request of the
/// scope it wraps.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let client = client_key(&req, limiter.config().trust_proxy_headers);

            match limiter.check_rate_limit(&client).await {
                RateDecision::Allowed { .. } => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                RateDecision::Limited { retry_after_secs } => {
                    warn!(client = %client, retry_after_secs, "Rate limit exceeded");
                    let message = limiter.config().rejection_message();
                    let response = AppError::RateLimited(message).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64, seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(RateLimitConfig::default());

        for i in 0..30 {
            assert!(matches!(
                limiter.check_at("10.0.0.1", at(0, i)).await,
                RateDecision::Allowed { .. }
            ));
        }

        // 31st request inside the window
        assert_eq!(
            limiter.check_at("10.0.0.1", at(4, 0)).await,
            RateDecision::Limited { retry_after_secs: 60 }
        );

        // First request after the window resets
        assert_eq!(
            limiter.check_at("10.0.0.1", at(5, 0)).await,
            RateDecision::Allowed { remaining: 29 }
        );
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let config = RateLimitConfig {
            window_size: Duration::minutes(5),
            max_requests: 1,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(config);
        assert!(matches!(limiter.check_at("a", at(0, 0)).await, RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("a", at(0, 1)).await, RateDecision::Limited { .. }));
        assert!(matches!(limiter.check_at("b", at(0, 1)).await, RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_cleanup_drops_elapsed_windows() {
        let config = RateLimitConfig {
            window_size: Duration::minutes(5),
            max_requests: 30,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(config);
        tokio_test::block_on(async {
            limiter.check_at("stale", Utc::now() - Duration::minutes(10)).await;
            limiter.check_rate_limit("fresh").await;
            assert_eq!(limiter.cleanup().await, 1);
            assert_eq!(limiter.tracked_clients().await, 1);
        });
    }

    #[test]
    fn test_client_key_ignores_forwarded_headers_by_default() {
        use actix_web::test::TestRequest;

        let req = TestRequest::default()
            .peer_addr("10.1.2.3:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.7"))
            .to_srv_request();
        assert_eq!(client_key(&req, false), "10.1.2.3");
        assert_eq!(client_key(&req, true), "203.0.113.7");
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(
            RateLimitConfig::default().rejection_message(),
            "Too many requests, please try again after 5 minutes"
        );
    }
}
