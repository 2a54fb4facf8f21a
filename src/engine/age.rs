//! Age Estimator
//!
//! Crops a padded face region, runs the 8-bucket age classifier and maps the
//! strongest output to a fixed age-range label.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use anyhow::{Context, Result};
use serde::{Serialize, Serializer};

use super::detector::BoundingBox;
use super::pool::{ModelKind, ModelPool};
use super::preprocess::{blob_from_image, padded_crop_bounds, AGE_INPUT_SIZE, AGE_MEAN};
use crate::utils::math::argmax;

/// Age range predicted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeLabel {
    Infant,
    EarlyChild,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
}

impl AgeLabel {
    /// Classifier output order
    pub const ALL: [AgeLabel; 8] = [
        AgeLabel::Infant,
        AgeLabel::EarlyChild,
        AgeLabel::Child,
        AgeLabel::Teen,
        AgeLabel::YoungAdult,
        AgeLabel::Adult,
        AgeLabel::MiddleAged,
        AgeLabel::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeLabel::Infant => "(0-2)",
            AgeLabel::EarlyChild => "(4-6)",
            AgeLabel::Child => "(8-12)",
            AgeLabel::Teen => "(15-20)",
            AgeLabel::YoungAdult => "(25-32)",
            AgeLabel::Adult => "(38-43)",
            AgeLabel::MiddleAged => "(48-53)",
            AgeLabel::Senior => "(60-100)",
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl std::fmt::Display for AgeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AgeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Age Estimator
pub struct AgeEstimator {
    pool: Arc<ModelPool>,
    padding: u32,
}

impl AgeEstimator {
    /// Create a new age estimator
    pub fn new(pool: Arc<ModelPool>, padding: u32) -> Self {
        Self { pool, padding }
    }

    /// Estimate the age range of the face inside `bbox`
    pub fn estimate(&self, image: &DynamicImage, bbox: &BoundingBox) -> Result<AgeLabel> {
        let (x, y, w, h) = padded_crop_bounds(bbox, self.padding, image.dimensions())
            .with_context(|| format!("Face region {:?} is empty after clamping", bbox))?;
        let face = image.crop_imm(x, y, w, h);

        let blob = blob_from_image(&face, AGE_INPUT_SIZE, AGE_MEAN);
        let scores = self.pool.infer(ModelKind::AgeClassifier, &blob)?;

        tracing::debug!("Age classifier raw output: {:?}", scores);

        label_from_scores(&scores)
    }
}

/// Pick the label with the highest score; ties go to the lower index.
pub fn label_from_scores(scores: &[f32]) -> Result<AgeLabel> {
    if scores.len() != AgeLabel::ALL.len() {
        anyhow::bail!(
            "Age classifier produced {} scores, expected {}",
            scores.len(),
            AgeLabel::ALL.len()
        );
    }

    let idx = argmax(scores).context("Age classifier produced no scores")?;
    AgeLabel::from_index(idx).context("Age classifier index out of range")
}
