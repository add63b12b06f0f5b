use anyhow::Context;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signalboard_core::warehouse::postgres::{self, PgWarehouse, TableRef};
use signalboard_core::PredictionService;

mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = signalboard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(e) = run(&settings).await {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %format!("{e:#}"), "api stopped");
        return Err(e);
    }
    Ok(())
}

async fn run(settings: &signalboard_core::config::Settings) -> anyhow::Result<()> {
    let config = settings.load_app_config()?;
    let table = TableRef::from_config(&config.warehouse)?;

    let pool = postgres::connect(&config.warehouse).await?;
    tracing::info!(
        host = %config.warehouse.account,
        database = %config.warehouse.database,
        table = %table.qualified(),
        "warehouse connected"
    );

    let service = PredictionService::new(
        PgWarehouse::new(pool.clone(), table),
        config.dashboard.cache_ttl(),
    );
    let state = routes::AppState {
        service: Arc::new(service),
        default_start: config.dashboard.default_start_date,
    };

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr} failed"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &signalboard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
