//! Inference and image-scoring engine
//!
//! - Model pool holding the pretrained networks loaded at startup
//! - SSD face locator and 8-bucket age estimator
//! - Structural-similarity scoring

pub mod pool;
pub mod detector;
pub mod age;
pub mod preprocess;
pub mod similarity;

pub use pool::{ModelKind, ModelPool};
pub use detector::{BoundingBox, FaceLocator};
pub use age::{AgeEstimator, AgeLabel};
pub use similarity::SimilarityScorer;
