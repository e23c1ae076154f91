pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod routes;
pub mod validation;

use actix_web::HttpResponse;
use chrono::Duration;
use std::sync::Arc;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::{Settings, StoreBackend};

pub use auth::{AuthService, CookiePolicy, GuardConfig, RateLimitConfig, RateLimiter, RouteGuard, TokenCodec};
pub use db::{DbOperations, MemoryStore, Store};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub guard: Arc<RouteGuard>,
    pub cookies: CookiePolicy,
    postgres: Option<DbOperations>,
}

impl AppState {
    /// Connects the configured backend and runs pending migrations.
    pub async fn new(config: Settings) -> Result<Self> {
        match config.database.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Ok(Self::with_store(config, Arc::new(MemoryStore::new())))
            }
            StoreBackend::Postgres => {
                let db = DbOperations::new_with_options(
                    &config.database.url,
                    config.database.max_connections,
                    std::time::Duration::from_secs(5),
                )
                .await?;
                db.migrate().await?;
                info!("Database connected and migrated");

                let mut state = Self::with_store(config, Arc::new(db.clone()));
                state.postgres = Some(db);
                Ok(state)
            }
        }
    }

    pub fn with_store(config: Settings, store: Arc<dyn Store>) -> Self {
        let codec = TokenCodec::new(
            &config.auth.jwt_secret,
            Duration::minutes(config.auth.access_token_minutes),
            Duration::days(config.auth.refresh_token_days),
        );
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            window_size: Duration::seconds(config.rate_limit.window_seconds),
            max_requests: config.rate_limit.max_requests,
            trust_proxy_headers: config.rate_limit.trust_proxy_headers,
        });

        Self {
            auth_service: Arc::new(AuthService::new(store.clone(), codec.clone())),
            rate_limiter: Arc::new(rate_limiter),
            guard: Arc::new(RouteGuard::new(GuardConfig::default(), codec)),
            cookies: CookiePolicy::new(config.secure_cookies()),
            config: Arc::new(config),
            store,
            postgres: None,
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(db) = &self.postgres {
            db.close().await;
        }
        Ok(())
    }
}
