use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine::{
    result_statistics, ComparisonReport, ComparisonRequest, EmbeddingStatus, MethodInfo, ResultStatistics,
    SearchEngine, SearchError, SearchRequest, SearchResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub num_docs: usize,
    pub methods: Vec<engine::Method>,
    pub courses: Vec<String>,
}

#[derive(Serialize)]
pub struct MethodsResponse {
    pub methods: Vec<MethodInfo>,
    pub courses: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine_ready: bool,
    pub num_docs: usize,
    pub embeddings: EmbeddingStatus,
}

#[derive(Serialize)]
pub struct SearchPayload {
    #[serde(flatten)]
    pub response: SearchResponse,
    pub statistics: ResultStatistics,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

/// `SearchError` rendered as an HTTP response.
pub struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_fatal() {
            tracing::error!(error = %self.0, "request hit an integrity error");
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(ErrorBody { error: self.0.kind(), detail: self.0.to_string() })).into_response()
    }
}

pub fn build_app(engine: Arc<SearchEngine>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        .route("/methods", get(methods_handler))
        .route("/search", post(search_handler))
        .route("/compare", post(compare_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { engine })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn info_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        num_docs: state.engine.corpus().len(),
        methods: state.engine.available_methods(),
        courses: state.engine.available_courses(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.engine.status();
    Json(HealthResponse {
        status: if status.ready { "healthy" } else { "unhealthy" },
        engine_ready: status.ready,
        num_docs: status.num_docs,
        embeddings: status.embeddings,
    })
}

async fn methods_handler(State(state): State<AppState>) -> Json<MethodsResponse> {
    Json(MethodsResponse { methods: state.engine.method_catalog(), courses: state.engine.available_courses() })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchPayload>, ApiError> {
    let response = state.engine.search(&request)?;
    tracing::info!(
        method = %response.method,
        hits = response.total_results,
        took_s = response.execution_time,
        "search served"
    );
    let statistics = result_statistics(&response.results);
    Ok(Json(SearchPayload { response, statistics }))
}

pub async fn compare_handler(
    State(state): State<AppState>,
    Json(request): Json<ComparisonRequest>,
) -> Json<ComparisonReport> {
    Json(state.engine.compare(&request))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Response {
    match state.engine.document(&doc_id) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody { error: "not_found", detail: format!("no document with id {doc_id}") }),
        )
            .into_response(),
    }
}
