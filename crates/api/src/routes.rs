use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use signalboard_core::dashboard::initial_selection;
use signalboard_core::time::calendar::parse_calendar_date;
use signalboard_core::view::DashboardView;
use signalboard_core::{
    compute_metrics, DateBounds, MetricsSummary, PredictionService, PredictionSource, PricePoint,
    QueryError, Selection,
};

pub struct AppState<S> {
    pub service: Arc<PredictionService<S>>,
    pub default_start: NaiveDate,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            default_start: self.default_start,
        }
    }
}

pub fn router<S: PredictionSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/symbols", get(get_symbols::<S>))
        .route("/date-range", get(get_date_range::<S>))
        .route("/dashboard", get(get_dashboard::<S>))
        .route("/predictions", get(get_predictions::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/cache/invalidate", post(invalidate_cache::<S>))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<QueryError>() {
            Some(QueryError::UnknownSymbol(_)) | Some(QueryError::NoData) => StatusCode::NOT_FOUND,
            Some(_) => StatusCode::BAD_REQUEST,
            None => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "request failed");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal error".to_string(),
                };
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Control values shared by the data routes. Omitted values fall back to the dashboard's
/// initial selection.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    symbol: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Serialize)]
struct SymbolsResponse {
    symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DateRangeResponse {
    #[serde(flatten)]
    bounds: DateBounds,
    default_start: NaiveDate,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_symbols<S: PredictionSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<SymbolsResponse>, ApiError> {
    let symbols = state.service.list_known_symbols().await?;
    Ok(Json(SymbolsResponse {
        symbols: symbols.into_iter().collect(),
    }))
}

async fn get_date_range<S: PredictionSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<DateRangeResponse>, ApiError> {
    let bounds = load_bounds(&state).await?;
    Ok(Json(DateRangeResponse {
        bounds,
        default_start: bounds.clamp(state.default_start),
    }))
}

async fn get_dashboard<S: PredictionSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<DashboardView>, ApiError> {
    let selection = resolve_selection(&state, params).await?;
    let rows = fetch(&state, &selection).await?;
    let metrics = compute_metrics(&rows);
    Ok(Json(DashboardView::build(selection, rows, metrics)))
}

async fn get_predictions<S: PredictionSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<Vec<PricePoint>>, ApiError> {
    let selection = resolve_selection(&state, params).await?;
    Ok(Json(fetch(&state, &selection).await?))
}

async fn get_metrics<S: PredictionSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<Option<MetricsSummary>>, ApiError> {
    let selection = resolve_selection(&state, params).await?;
    let rows = fetch(&state, &selection).await?;
    Ok(Json(compute_metrics(&rows)))
}

async fn invalidate_cache<S: PredictionSource>(State(state): State<AppState<S>>) -> StatusCode {
    state.service.invalidate_cache().await;
    StatusCode::NO_CONTENT
}

async fn fetch<S: PredictionSource>(
    state: &AppState<S>,
    selection: &Selection,
) -> anyhow::Result<Vec<PricePoint>> {
    state
        .service
        .fetch_predictions(&selection.symbol, selection.start_date, selection.end_date)
        .await
}

async fn load_bounds<S: PredictionSource>(state: &AppState<S>) -> anyhow::Result<DateBounds> {
    Ok(state.service.date_bounds().await?.ok_or(QueryError::NoData)?)
}

async fn resolve_selection<S: PredictionSource>(
    state: &AppState<S>,
    params: SelectionParams,
) -> anyhow::Result<Selection> {
    let start = params.start.as_deref().map(parse_param_date).transpose()?;
    let end = params.end.as_deref().map(parse_param_date).transpose()?;

    let symbol = match params.symbol {
        Some(s) if !s.trim().is_empty() => s,
        _ => state
            .service
            .list_known_symbols()
            .await?
            .into_iter()
            .next()
            .ok_or(QueryError::NoData)?,
    };

    let (start_date, end_date) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let bounds = load_bounds(state).await?;
            let defaults = initial_selection(symbol.clone(), &bounds, state.default_start);
            (
                start.unwrap_or(defaults.start_date),
                end.unwrap_or(defaults.end_date),
            )
        }
    };

    Ok(Selection {
        symbol,
        start_date,
        end_date,
    })
}

fn parse_param_date(raw: &str) -> anyhow::Result<NaiveDate> {
    parse_calendar_date(raw)
        .map_err(|_| anyhow::Error::new(QueryError::InvalidDate(raw.to_string())))
}
