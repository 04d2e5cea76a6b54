use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetcast_core::domain::features::RawFeatures;
use fleetcast_core::error::ForecastError;
use fleetcast_core::forecast::{generator, ForecastGenerator};
use fleetcast_core::models::ModelRegistry;
use fleetcast_core::storage::history::{self, TripDayStat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fleetcast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let registry = ModelRegistry::load_from_dir(std::path::Path::new(settings.model_dir()));

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API without historical data");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; starting API without historical data");
            None
        }
    };

    let state = AppState {
        generator: Arc::new(ForecastGenerator::new(registry)),
        pool,
    };

    // The dashboard is served from another origin; mirror its permissive
    // cross-origin policy.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/forecast/peak", post(forecast_peak))
        .route("/daily_forecast", get(daily_forecast))
        .route("/hourly_forecast", get(hourly_forecast))
        .route("/yearly_daily", get(yearly_daily))
        .route("/forecast/timeseries", post(forecast_timeseries))
        .route("/forecast/historical", get(historical))
        .route("/forecast/retrain", post(retrain))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let port: u16 = std::env::var("FORECASTING_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "forecasting api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    generator: Arc<ForecastGenerator>,
    pool: Option<PgPool>,
}

enum ApiError {
    Forecast(ForecastError),
    DatabaseUnavailable,
    Internal(anyhow::Error),
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        Self::Forecast(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forecast(ForecastError::Validation(detail)) => {
                (StatusCode::BAD_REQUEST, detail)
            }
            ApiError::Forecast(ForecastError::Internal(err)) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "forecast operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
            ApiError::DatabaseUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "database unavailable".to_string(),
            ),
            ApiError::Internal(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    models_loaded: usize,
    timestamp: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        models_loaded: state.generator.registry().loaded_count(),
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
struct PeakRequest {
    features: Option<RawFeatures>,
}

#[derive(Debug, Serialize)]
struct PeakResponse {
    prediction: f64,
    confidence: f64,
    model_used: &'static str,
    timestamp: DateTime<Utc>,
}

async fn forecast_peak(
    State(state): State<AppState>,
    Json(req): Json<PeakRequest>,
) -> Result<Json<PeakResponse>, ApiError> {
    let raw = req
        .features
        .ok_or_else(|| ForecastError::validation("Features data required"))?;
    let features = raw.validate_into_features()?;
    let peak = state.generator.predict_peak(&features)?;

    Ok(Json(PeakResponse {
        prediction: peak.prediction,
        confidence: peak.confidence,
        model_used: peak.model_used,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct DailyForecastResponse {
    dates: Vec<NaiveDate>,
    predictions: Vec<f64>,
    model_used: &'static str,
    forecast_type: &'static str,
    timestamp: DateTime<Utc>,
}

async fn daily_forecast(
    State(state): State<AppState>,
) -> Result<Json<DailyForecastResponse>, ApiError> {
    let weekly = state.generator.weekly_forecast(Utc::now())?;

    Ok(Json(DailyForecastResponse {
        dates: weekly.dates,
        predictions: weekly.predictions,
        model_used: weekly.model_used,
        forecast_type: "weekly_sunday_to_saturday",
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct HourlyForecastResponse {
    hours: Vec<u32>,
    predictions: Vec<f64>,
    peak_hour: u32,
    peak_value: f64,
    model_used: &'static str,
    operational_hours: &'static str,
    timestamp: DateTime<Utc>,
}

async fn hourly_forecast(
    State(state): State<AppState>,
) -> Result<Json<HourlyForecastResponse>, ApiError> {
    let hourly = state.generator.hourly_forecast(Utc::now())?;

    Ok(Json(HourlyForecastResponse {
        hours: hourly.hours,
        predictions: hourly.predictions,
        peak_hour: hourly.peak_hour,
        peak_value: hourly.peak_value,
        model_used: hourly.model_used,
        operational_hours: "4:00 AM - 8:00 PM",
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct YearlyParams {
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct YearlyDailyResponse {
    year: i32,
    months: Vec<u32>,
    days: Vec<u32>,
    grid: Vec<Vec<Option<f64>>>,
    model_used: &'static str,
    timestamp: DateTime<Utc>,
}

async fn yearly_daily(
    State(state): State<AppState>,
    Query(params): Query<YearlyParams>,
) -> Result<Json<YearlyDailyResponse>, ApiError> {
    let year = params.year.unwrap_or_else(|| Utc::now().year());
    let yearly = state.generator.yearly_daily_forecast(year)?;

    Ok(Json(YearlyDailyResponse {
        year: yearly.year,
        months: (1..=12).collect(),
        days: (1..=31).collect(),
        grid: yearly.grid,
        model_used: yearly.model_used,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct TimeseriesRequest {
    periods: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TimeseriesResponse {
    predictions: Vec<f64>,
    dates: Vec<NaiveDate>,
    confidence: f64,
    model_used: &'static str,
    timestamp: DateTime<Utc>,
}

async fn forecast_timeseries(
    State(state): State<AppState>,
    Json(req): Json<TimeseriesRequest>,
) -> Result<Json<TimeseriesResponse>, ApiError> {
    let periods = generator::validate_periods(req.periods)?;
    let ts = state.generator.timeseries_forecast(periods, Utc::now())?;

    Ok(Json(TimeseriesResponse {
        predictions: ts.predictions,
        dates: ts.dates,
        confidence: ts.confidence,
        model_used: ts.model_used,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct HistoricalResponse {
    historical_data: Vec<TripDayStat>,
    total_records: usize,
    timestamp: DateTime<Utc>,
}

async fn historical(State(state): State<AppState>) -> Result<Json<HistoricalResponse>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::DatabaseUnavailable);
    };

    let historical_data = history::fetch_daily_trip_stats(pool)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(HistoricalResponse {
        total_records: historical_data.len(),
        historical_data,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct RetrainResponse {
    message: &'static str,
    status: &'static str,
    timestamp: DateTime<Utc>,
}

// Retraining runs out-of-band; the endpoint only acknowledges the request.
async fn retrain() -> Json<RetrainResponse> {
    Json(RetrainResponse {
        message: "Model retraining initiated",
        status: "success",
        timestamp: Utc::now(),
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fleetcast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
