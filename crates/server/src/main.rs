//! Bailiff server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
};
use bailiff_api::{AppState, auth_middleware, router as api_router};
use bailiff_common::{Config, SharedClock, SystemClock};
use bailiff_core::{EmailService, sms_sender_from_config};
use bailiff_db::repositories::{HearingRepository, SettingsRepository};
use bailiff_scheduler::{DbReminderExecutor, ReminderScheduler, SchedulerConfig};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// `BAILIFF_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bailiff=debug,tower_http=debug".into());
    let json = std::env::var("BAILIFF_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Any origin when none are configured; otherwise the listed origins with
/// credentials so the session cookie is sent.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    info!("Starting bailiff server...");

    let config = Config::load().context("Failed to load configuration")?;

    let db = bailiff_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    bailiff_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let clock: SharedClock = Arc::new(SystemClock);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.notifications.request_timeout_secs))
        .user_agent(format!("bailiff/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let sms = sms_sender_from_config(&config.sms, &http_client)?;
    let email = EmailService::from_settings(&config.email, &http_client)?;
    info!(
        sms = sms.is_some(),
        email = email.is_some(),
        "Notification channels configured"
    );

    let state = AppState::new(Arc::clone(&db), &config, clock.clone(), sms, email)?;

    if config.scheduler.enabled {
        let scheduler_config = SchedulerConfig::from_settings(&config.scheduler)?;
        let executor = DbReminderExecutor::new(
            HearingRepository::new(Arc::clone(&db)),
            SettingsRepository::new(Arc::clone(&db)),
            state.hearing_notification_service.clone(),
        );
        Arc::new(ReminderScheduler::new(
            scheduler_config,
            Arc::new(executor),
            clock,
        ))
        .spawn();
        info!(timezone = %config.scheduler.timezone, "Reminder scheduler started");
    } else {
        info!("Reminder scheduler disabled");
    }

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins)?)
        .with_state(state);

    let ip = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
