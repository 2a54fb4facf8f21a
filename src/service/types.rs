//! Service layer types

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::{AgeLabel, BoundingBox};

/// Outcome of a collection comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// At least one checked pair scored above the threshold
    LikelyLegitimate,
    /// No checked pair scored above the threshold
    PossibleMismatch,
}

/// Similarity of one positional pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScore {
    /// 1-based position of the pair in both collections
    pub index: usize,
    pub score: f64,
}

/// Scores, unmatched counts and verdict of one comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub pairs: Vec<PairScore>,
    /// Incoming images with no outgoing counterpart
    pub unmatched_in: usize,
    /// Outgoing images with no incoming counterpart
    pub unmatched_out: usize,
    pub threshold: f64,
    pub checked_pairs: usize,
    pub verdict: Verdict,
}

/// One located face with its estimated age range
#[derive(Debug, Clone, Serialize)]
pub struct FaceAge {
    pub bbox: BoundingBox,
    pub age: AgeLabel,
}

/// Face analysis result
#[derive(Debug, Clone, Serialize)]
pub struct FaceAnalysis {
    pub faces: Vec<FaceAge>,
    pub inference_time_ms: u64,
}

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: HashMap<String, bool>,
}
