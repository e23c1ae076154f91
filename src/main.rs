use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use melotiket_server::auth::RouteGuardLayer;
use melotiket_server::config::CorsConfig;
use melotiket_server::{jobs, routes, AppState, Settings};
use std::net::TcpListener;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
    };

    // Session cookies travel with every request
    cors.supports_credentials().max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new().context("failed to load configuration")?;
    info!(environment = %config.environment, "Configuration loaded successfully");

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialise application state")?;

    let expiry = jobs::spawn_expiry(
        state.store.clone(),
        Duration::from_secs(config.expiry.interval_seconds),
    );

    // Drop rate-limit windows that have run out
    let limiter = state.rate_limiter.clone();
    let cleanup = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let dropped = limiter.cleanup().await;
            if dropped > 0 {
                info!(dropped, "Cleaned up rate limit windows");
            }
        }
    });

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
        .context("failed to bind listener")?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let data = web::Data::new(state.clone());
    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RouteGuardLayer::new(data.guard.clone()))
            .wrap(cors(&server_config.cors))
            .app_data(data.clone())
            .configure(routes::configure(data.rate_limiter.clone()))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await?;

    expiry.abort();
    cleanup.abort();
    state.shutdown().await?;
    info!("Server stopped");
    Ok(())
}
