//! Face Service
//!
//! Locates faces in an uploaded image and estimates the age range of each.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::DetectionConfig;
use crate::engine::preprocess::decode_image;
use crate::engine::{AgeEstimator, FaceLocator, ModelPool};

use super::types::{FaceAge, FaceAnalysis, HealthResult};

/// Face detection and age estimation service
pub struct FaceService {
    pool: Arc<ModelPool>,
    config: DetectionConfig,
}

impl FaceService {
    /// Create a new face service
    pub fn new(pool: Arc<ModelPool>, config: DetectionConfig) -> Self {
        Self { pool, config }
    }

    /// Locate every face and estimate its age.
    ///
    /// `confidence_threshold` overrides the configured detection threshold
    /// for this call only.
    pub async fn analyze(&self, image_data: Vec<u8>, confidence_threshold: Option<f32>) -> Result<FaceAnalysis> {
        let start = Instant::now();

        let threshold = confidence_threshold.unwrap_or(self.config.confidence_threshold);
        let padding = self.config.padding;
        let pool = self.pool.clone();

        let faces = tokio::task::spawn_blocking(move || -> Result<Vec<FaceAge>> {
            let image = decode_image(&image_data).context("Failed to decode image")?;

            let locator = FaceLocator::new(pool.clone(), threshold);
            let estimator = AgeEstimator::new(pool, padding);

            let boxes = locator.locate(&image)?;
            boxes
                .into_iter()
                .map(|bbox| -> Result<FaceAge> {
                    let age = estimator.estimate(&image, &bbox)?;
                    Ok(FaceAge { bbox, age })
                })
                .collect()
        })
        .await??;

        let inference_time_ms = start.elapsed().as_millis() as u64;
        info!("Analyzed {} faces in {}ms", faces.len(), inference_time_ms);

        Ok(FaceAnalysis {
            faces,
            inference_time_ms,
        })
    }

    /// Loaded status of every model in the pool
    pub fn models_loaded(&self) -> HashMap<String, bool> {
        self.pool
            .kinds()
            .iter()
            .map(|kind| (kind.as_str().to_string(), true))
            .collect()
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        HealthResult {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            models_loaded: self.models_loaded(),
        }
    }
}
