//! HTTP Surface (§4.9, §6.3): a thin axum service exposing `GET /search`,
//! `POST /classify`, and `GET /`. Holds shared, swappable read-only handles
//! to the index and classifier — no hot-reload requirement is in scope, so
//! a plain `RwLock<Option<_>>` is enough; `arc-swap` isn't pulled in.

use crate::classify::Classifier;
use crate::error::CoreError;
use crate::index::Index;
use crate::query::Planner;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};

const MIN_QUERY_LEN: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RwLock<Option<Arc<Index>>>>,
    pub classifier: Arc<RwLock<Option<Arc<Classifier>>>>,
}

impl AppState {
    pub fn empty() -> Self {
        AppState {
            index: Arc::new(RwLock::new(None)),
            classifier: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_index(index: Index) -> Self {
        let state = AppState::empty();
        *state.index.write().expect("index lock poisoned") = Some(Arc::new(index));
        state
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoreError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            CoreError::Corrupt { .. } | CoreError::Fatal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    results: Vec<crate::models::Result>,
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, CoreError> {
    if params.q.len() < MIN_QUERY_LEN {
        return Err(CoreError::invalid_query(format!(
            "query must be at least {MIN_QUERY_LEN} characters"
        )));
    }

    let index = state
        .index
        .read()
        .expect("index lock poisoned")
        .clone()
        .ok_or_else(|| CoreError::not_ready("index", "no index is currently loaded"))?;

    let planner = Planner::new(index);
    let results = planner.search(&params.q, crate::query::DEFAULT_TOP_K);
    Ok(Json(SearchResponse {
        query: params.q,
        results,
    }))
}

#[derive(Deserialize)]
struct ClassifyRequest {
    text: String,
}

#[derive(Serialize)]
struct ClassifyResponse {
    category: String,
    confidence: f32,
}

async fn classify_handler(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, CoreError> {
    let classifier = state
        .classifier
        .read()
        .expect("classifier lock poisoned")
        .clone()
        .ok_or_else(|| CoreError::not_ready("classifier", "no classifier is currently loaded"))?;

    let probs = classifier.predict_proba(&body.text);
    let (category, confidence) = probs
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(("unknown".to_string(), 0.0));

    Ok(Json(ClassifyResponse { category, confidence }))
}

async fn banner_handler() -> &'static str {
    "scholarctl academic publication search engine"
}

/// Builds the router. `allowed_origins` is the CORS allow-list (§6.3);
/// an empty list disables cross-origin requests rather than defaulting to
/// wildcard, which the credentials-permitted contract forbids anyway.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<axum::http::HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(banner_handler))
        .route("/search", get(search_handler))
        .route("/classify", post(classify_handler))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
