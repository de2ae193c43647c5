use std::sync::Arc;

use jspoc::config::Config;
use jspoc::db::PgConnector;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.server.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let connector = Arc::new(PgConnector::from_config(&cfg));
    info!(
        environment = %cfg.server.environment,
        database_host = %cfg.database.host,
        database = %cfg.database.db,
        topology = ?connector.topology(),
        loglevel = %cfg.server.loglevel
    );
    if cfg.server.insecure_cookie {
        warn!("session cookie is sent without the Secure attribute");
    }

    let addr = cfg.bind_address();
    let state = jspoc::AppState::new(cfg, connector)?;
    let app = jspoc::app_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
