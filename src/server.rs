use crate::attributes::AttributeDescriptor;
use crate::config::AppConfig;
use crate::query::SymbolIndex;
use crate::scene::{MarkerId, Scene};
use crate::types::Direction;
use crate::viewer::MapViewer;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub enum MapState {
    Ready { viewer: MapViewer<Scene>, index: SymbolIndex },
    /// Loading failed; the message is reported by every API call.
    Failed(String),
}

impl MapState {
    pub fn ready(viewer: MapViewer<Scene>, zoom: u8) -> Self {
        let index = SymbolIndex::build(viewer.adapter(), zoom);
        MapState::Ready { viewer, index }
    }
}

pub struct AppState {
    pub map: Mutex<MapState>,
    pub config: AppConfig,
}

#[derive(Debug)]
pub enum ApiError {
    Unavailable(String),
    BadRequest(String),
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Deserialize)]
pub struct StepRequest {
    direction: Direction,
}

#[derive(Deserialize)]
pub struct IndexRequest {
    index: usize,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
pub struct HoverRequest {
    marker: MarkerId,
    entered: bool,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    marker: MarkerId,
}

#[derive(Serialize)]
pub struct AttributesResponse<'a> {
    attributes: &'a [AttributeDescriptor],
    index: usize,
}

#[derive(Serialize)]
pub struct QueryResponse {
    marker: MarkerId,
    feature: usize,
    popup: Option<String>,
}

#[derive(Serialize)]
pub struct PanelResponse<'a> {
    panel: Option<&'a str>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/state", get(state_handler))
        .route("/api/attributes", get(attributes_handler))
        .route("/api/sequence/step", post(step_handler))
        .route("/api/sequence/index", post(index_handler))
        .route("/api/legend.svg", get(legend_handler))
        .route("/api/query", get(query_handler))
        .route("/api/hover", post(hover_handler))
        .route("/api/select", post(select_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, map: MapState) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let state = Arc::new(AppState { map: Mutex::new(map), config });
    let app = create_router(state);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn ready(map: &mut MapState) -> Result<(&mut MapViewer<Scene>, &mut SymbolIndex), ApiError> {
    match map {
        MapState::Ready { viewer, index } => Ok((viewer, index)),
        MapState::Failed(msg) => Err(ApiError::Unavailable(msg.clone())),
    }
}

async fn state_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, _) = ready(&mut map)?;
    Ok(Json(viewer.snapshot()).into_response())
}

async fn attributes_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, _) = ready(&mut map)?;
    let body = AttributesResponse {
        attributes: viewer.sequence().attributes(),
        index: viewer.sequence().index(),
    };
    Ok(Json(body).into_response())
}

async fn step_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StepRequest>,
) -> Result<Response, ApiError> {
    let zoom = state.config.map.zoom;
    let mut map = state.map.lock().await;
    let (viewer, index) = ready(&mut map)?;

    viewer.step(request.direction);
    *index = SymbolIndex::build(viewer.adapter(), zoom);
    Ok(Json(viewer.snapshot()).into_response())
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IndexRequest>,
) -> Result<Response, ApiError> {
    let zoom = state.config.map.zoom;
    let mut map = state.map.lock().await;
    let (viewer, index) = ready(&mut map)?;

    viewer
        .set_index(request.index)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    *index = SymbolIndex::build(viewer.adapter(), zoom);
    Ok(Json(viewer.snapshot()).into_response())
}

async fn legend_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, _) = ready(&mut map)?;
    let svg = viewer.legend().to_svg();
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Option<QueryResponse>>, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, index) = ready(&mut map)?;

    let hit = index.locate(params.lat, params.lon).and_then(|marker| {
        viewer.adapter().marker(marker).map(|m| QueryResponse {
            marker,
            feature: m.feature,
            popup: m.popup.as_ref().map(|p| p.content.clone()),
        })
    });
    Ok(Json(hit))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HoverRequest>,
) -> Result<Response, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, _) = ready(&mut map)?;

    if !viewer.hover(request.marker, request.entered) {
        return Err(ApiError::NotFound(format!("no marker {}", request.marker.0)));
    }
    Ok(Json(viewer.snapshot()).into_response())
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Response, ApiError> {
    let mut map = state.map.lock().await;
    let (viewer, _) = ready(&mut map)?;

    if !viewer.select(request.marker) {
        return Err(ApiError::NotFound(format!("no marker {}", request.marker.0)));
    }
    Ok(Json(PanelResponse { panel: viewer.panel() }).into_response())
}
