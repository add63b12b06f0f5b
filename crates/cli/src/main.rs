use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signalboard_core::config::{AppConfig, DashboardConfig, Settings};
use signalboard_core::dashboard::Dashboard;
use signalboard_core::time::calendar::parse_calendar_date;
use signalboard_core::warehouse::memory::InMemorySource;
use signalboard_core::warehouse::postgres::{self, PgWarehouse, TableRef};
use signalboard_core::{PredictionService, PredictionSource};

mod render;

#[derive(Debug, Parser)]
#[command(name = "signalboard")]
struct Args {
    /// Print the known symbols and exit.
    #[arg(long)]
    list_symbols: bool,

    /// Symbol to report on. Defaults to the first known symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Start of the date range (YYYY-MM-DD; timestamps are truncated to their date).
    #[arg(long)]
    start: Option<String>,

    /// End of the date range, inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Print the dashboard view as JSON.
    #[arg(long)]
    json: bool,

    /// Read rows from a JSON dump of the table instead of the warehouse.
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "report failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    if let Some(path) = &args.fixture {
        let dashboard_cfg = fixture_dashboard_config(&settings.config_path)?;
        let source = InMemorySource::from_json_file(path)?;
        let service = PredictionService::new(source, dashboard_cfg.cache_ttl());
        return report(&service, args, &dashboard_cfg).await;
    }

    let config = settings.load_app_config()?;
    let table = TableRef::from_config(&config.warehouse)?;
    let pool = postgres::connect(&config.warehouse).await?;
    tracing::debug!(table = %table.qualified(), "warehouse connected");

    let service = PredictionService::new(
        PgWarehouse::new(pool.clone(), table),
        config.dashboard.cache_ttl(),
    );
    let res = report(&service, args, &config.dashboard).await;
    pool.close().await;
    res
}

/// Offline runs need no warehouse, so a missing config file means defaults. A config file
/// that exists must still load cleanly.
fn fixture_dashboard_config(path: &Path) -> anyhow::Result<DashboardConfig> {
    if !path.try_exists().with_context(|| format!("stat {} failed", path.display()))? {
        tracing::debug!(path = %path.display(), "no config file, using dashboard defaults");
        return Ok(DashboardConfig::default());
    }
    Ok(AppConfig::load(path)?.dashboard)
}

async fn report<S: PredictionSource>(
    service: &PredictionService<S>,
    args: &Args,
    dashboard_cfg: &DashboardConfig,
) -> anyhow::Result<()> {
    let mut dash = Dashboard::open(service, dashboard_cfg.default_start_date).await?;

    if args.list_symbols {
        for symbol in dash.symbols() {
            println!("{symbol}");
        }
        return Ok(());
    }

    // Replay the control changes the way a user would make them.
    let mut view = None;
    if let Some(symbol) = args.symbol.as_deref() {
        view = Some(dash.on_symbol_selected(symbol).await?);
    }
    if args.start.is_some() || args.end.is_some() {
        let start = match args.start.as_deref() {
            Some(s) => parse_calendar_date(s).context("invalid --start")?,
            None => dash.selection().start_date,
        };
        let end = match args.end.as_deref() {
            Some(s) => parse_calendar_date(s).context("invalid --end")?,
            None => dash.selection().end_date,
        };
        view = Some(dash.on_date_range_changed(start, end).await?);
    }
    let view = match view {
        Some(v) => v,
        None => dash.render().await?,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("serialize dashboard view failed")?
        );
    } else {
        print!("{}", render::render_text(&view));
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
