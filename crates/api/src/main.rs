use std::net::SocketAddr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use keystone_api::config::ServerConfig;
use keystone_api::router::build_app_router;
use keystone_api::state::AppState;
use keystone_db::repositories::SessionRepo;
use keystone_db::DbPool;

const DEFAULT_LOG_FILTER: &str = "keystone_api=debug,keystone_core=info,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        language = %config.language,
        origins = ?config.cors_origins,
        "Configuration loaded"
    );

    let pool = prepare_database().await;
    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let app = build_app_router(AppState::new(pool, config.clone()), &config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
    tracing::info!("Server stopped");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect, verify, migrate, then drop sessions that can no longer be redeemed.
async fn prepare_database() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = keystone_db::create_pool(&url)
        .await
        .expect("Failed to create database pool");
    keystone_db::health_check(&pool)
        .await
        .expect("Database is unreachable");
    keystone_db::run_migrations(&pool)
        .await
        .expect("Database migrations failed");
    tracing::info!("Database ready");

    match SessionRepo::purge_stale(&pool).await {
        Ok(removed) => tracing::info!(removed, "Stale sessions purged"),
        Err(e) => tracing::warn!(error = %e, "Stale session purge failed"),
    }
    pool
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, draining connections"),
        () = terminate => tracing::info!("SIGTERM received, draining connections"),
    }
}
