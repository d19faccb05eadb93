use std::sync::Arc;

use airtime::Error;
use airtime::cache::ScheduleCache;
use airtime::clock::{Clock, SystemClock};
use airtime::config::get_config;
use airtime::duration::format_elapsed;
use airtime::live::{elapsed_seconds, resolve_live};
use airtime::schedule::{Entry, Schedule};
use airtime::source::HttpSource;
use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    cache: Arc<ScheduleCache>,
    clock: Arc<dyn Clock>,
}

#[derive(Serialize)]
struct Live {
    entry: Option<Entry>,
    elapsed: Option<f64>,
    elapsed_text: Option<String>,
    error: Option<String>,
}

impl Live {
    fn none(error: Option<String>) -> Self {
        Self {
            entry: None,
            elapsed: None,
            elapsed_text: None,
            error,
        }
    }
}

struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::ScheduleFetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

async fn schedule(State(state): State<AppState>) -> Result<Json<Schedule>, ApiError> {
    let schedule = state.cache.get().await.map_err(ApiError)?;
    Ok(Json(Schedule::clone(&schedule)))
}

async fn live(State(state): State<AppState>) -> Result<Json<Live>, ApiError> {
    let schedule = state.cache.get().await.map_err(ApiError)?;
    let now = state.clock.now();
    let live = match resolve_live(&schedule, now) {
        Ok(Some(entry)) => match elapsed_seconds(entry, now) {
            Ok(elapsed) => Live {
                entry: Some(entry.clone()),
                elapsed: Some(elapsed),
                elapsed_text: Some(format_elapsed(elapsed)),
                error: None,
            },
            Err(err) => Live::none(Some(err.to_string())),
        },
        Ok(None) => Live::none(None),
        Err(err) => {
            warn!(error = %err, "schedule is malformed");
            Live::none(Some(err.to_string()))
        }
    };
    Ok(Json(live))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    airtime::init_tracing();
    let config = get_config();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = HttpSource::new(&config.schedule_url, config.request_timeout())?;
    let state = AppState {
        cache: Arc::new(ScheduleCache::new(Arc::new(source), clock.clone())),
        clock,
    };

    let app = Router::new()
        .route("/api/schedule", get(schedule))
        .route("/api/live", get(live))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address.as_str())
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(address = %config.bind_address, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
