//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::service::{ComparisonReport, FaceAge};

/// Literal acknowledgment returned by a successful comparison
pub const COMPARE_SUCCESS_MESSAGE: &str = "Images compared successfully.";

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Item query parameters
#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub q: Option<String>,
}

/// Item response
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item_id: i64,
    pub q: Option<String>,
}

/// Compare response
///
/// `message` is always the fixed acknowledgment; the verdict lives in
/// `result`.
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub message: String,
    pub result: ComparisonReport,
}

/// Face analysis response
#[derive(Debug, Serialize)]
pub struct FacesResponse {
    pub faces: Vec<FaceAge>,
    pub inference_time_ms: u64,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: HashMap<String, bool>,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}
