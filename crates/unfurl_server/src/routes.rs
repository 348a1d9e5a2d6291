use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use engine_logging::{engine_debug, engine_error};
use serde::{Deserialize, Serialize};
use unfurl_engine::{UnfurlResult, Unfurler};

const NO_STORE: &str = "no-store, max-age=0";

pub struct AppState {
    pub unfurler: Arc<Unfurler>,
}

#[derive(Debug, Deserialize)]
pub struct UnfurlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct DataBody {
    data: UnfurlResult,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        no_store((status, Json(ErrorBody { error })).into_response())
    }
}

/// Build the axum router with the unfurl and health routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/unfurl", get(unfurl))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

async fn unfurl(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UnfurlQuery>,
) -> Result<Response, ApiError> {
    let raw = query.url.unwrap_or_default();

    // Run on its own task so a panic inside the pipeline becomes a 500.
    let unfurler = state.unfurler.clone();
    let outcome = tokio::spawn(async move { unfurler.unfurl(&raw).await })
        .await
        .map_err(|err| {
            engine_error!("Unfurl task failed: {}", err);
            ApiError::Internal("unfurl error".into())
        })?;

    match outcome {
        Ok(data) => Ok(no_store((StatusCode::OK, Json(DataBody { data })).into_response())),
        Err(err) => {
            engine_debug!("Rejected unfurl target: {}", err);
            Err(ApiError::BadRequest(err.to_string()))
        }
    }
}

fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}
