//! Axum REST API handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
    extract::{Path, State, Multipart, Query, DefaultBodyLimit},
    extract::multipart::Field,
    http::StatusCode,
    response::Json,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::engine::ModelKind;
use crate::service::{CompareService, FaceService};

use super::dto::*;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state shared across handlers
pub struct AppState {
    pub compare: Arc<CompareService>,
    /// `None` when the inference models are not loaded
    pub faces: Option<Arc<FaceService>>,
    pub start_time: Instant,
}

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/items/:item_id", get(read_item_handler))
        .route("/compare", post(compare_handler))
        .route("/faces", post(faces_handler))
        .route("/health", get(health_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(error: impl std::fmt::Display, code: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&error.to_string(), code)))
}

async fn read_field(field: Field<'_>) -> Result<Vec<u8>, ApiError> {
    field
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| bad_request(e, "READ_ERROR"))
}

/// Greeting
async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello World"))
}

/// Echo an item id and optional query string
async fn read_item_handler(
    Path(item_id): Path<String>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id: i64 = item_id.parse().map_err(|_| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(
                &format!("item_id must be an integer, got {:?}", item_id),
                "INVALID_ITEM_ID",
            )),
        )
    })?;

    Ok(Json(ItemResponse { item_id, q: query.q }))
}

/// Compare two uploaded images
async fn compare_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, ApiError> {
    let mut image1_data: Option<Vec<u8>> = None;
    let mut image2_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e, "MULTIPART_ERROR"))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image1" => image1_data = Some(read_field(field).await?),
            "image2" => image2_data = Some(read_field(field).await?),
            _ => {}
        }
    }

    let image1_data = image1_data.ok_or_else(|| bad_request("Missing image1 field", "MISSING_IMAGE1"))?;
    let image2_data = image2_data.ok_or_else(|| bad_request("Missing image2 field", "MISSING_IMAGE2"))?;

    let result = state.compare.compare_bytes(image1_data, image2_data).await.map_err(|e| {
        error!("Comparison failed: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(&format!("{:#}", e), "COMPARISON_FAILED")),
        )
    })?;

    Ok(Json(CompareResponse {
        message: COMPARE_SUCCESS_MESSAGE.to_string(),
        result,
    }))
}

/// Locate faces and estimate their ages
async fn faces_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FacesResponse>, ApiError> {
    let service = state.faces.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Inference models are not loaded", "MODELS_UNAVAILABLE")),
        )
    })?;

    let mut image_data: Option<Vec<u8>> = None;
    let mut confidence_threshold: Option<f32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e, "MULTIPART_ERROR"))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => image_data = Some(read_field(field).await?),
            "confidence_threshold" => {
                let text = field.text().await.unwrap_or_default();
                confidence_threshold = Some(text.trim().parse().map_err(|_| {
                    bad_request(format!("Invalid confidence_threshold {:?}", text), "INVALID_THRESHOLD")
                })?);
            }
            _ => {}
        }
    }

    let image_data = image_data.ok_or_else(|| bad_request("Missing image field", "MISSING_IMAGE"))?;

    let result = service.analyze(image_data, confidence_threshold).await.map_err(|e| {
        error!("Face analysis failed: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(&format!("{:#}", e), "ANALYSIS_FAILED")),
        )
    })?;

    Ok(Json(FacesResponse {
        faces: result.faces,
        inference_time_ms: result.inference_time_ms,
    }))
}

/// Health check
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let (version, models_loaded) = match &state.faces {
        Some(service) => {
            let health = service.health();
            (health.version, health.models_loaded)
        }
        None => (
            env!("CARGO_PKG_VERSION").to_string(),
            ModelKind::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), false))
                .collect(),
        ),
    };

    Json(HealthResponse {
        healthy: true,
        version,
        models_loaded,
        uptime_seconds,
    })
}
