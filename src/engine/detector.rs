//! SSD Face Locator
//!
//! Runs the OpenCV res10 SSD face network and returns the boxes whose
//! confidence clears a threshold. Boxes come back in the detector's own
//! order: no sorting, deduplication or overlap suppression is applied.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::pool::{ModelKind, ModelPool};
use super::preprocess::{blob_from_image, DETECTOR_INPUT_SIZE, DETECTOR_MEAN};

/// Values per detection row: image_id, label, confidence, x1, y1, x2, y2
const DETECTION_ROW_LEN: usize = 7;

/// Face bounding box in source image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Face Locator
pub struct FaceLocator {
    pool: Arc<ModelPool>,
    confidence_threshold: f32,
}

impl FaceLocator {
    /// Create a new face locator
    pub fn new(pool: Arc<ModelPool>, confidence_threshold: f32) -> Self {
        Self {
            pool,
            confidence_threshold,
        }
    }

    /// Get the confidence threshold
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Locate faces using the configured threshold
    pub fn locate(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>> {
        self.locate_with_threshold(image, self.confidence_threshold)
    }

    /// Locate faces keeping detections scoring strictly above `threshold`
    pub fn locate_with_threshold(&self, image: &DynamicImage, threshold: f32) -> Result<Vec<BoundingBox>> {
        let blob = blob_from_image(image, DETECTOR_INPUT_SIZE, DETECTOR_MEAN);
        let raw = self.pool.infer(ModelKind::FaceDetector, &blob)?;

        let boxes = parse_detections(&raw, image.dimensions(), threshold);
        tracing::debug!("Located {} faces above {:.2}", boxes.len(), threshold);

        Ok(boxes)
    }
}

/// Turn the flattened `[1, 1, N, 7]` detector output into pixel boxes.
///
/// Coordinates are normalized in the model output; they are scaled by the
/// frame size and truncated toward zero. A trailing partial row is ignored.
pub fn parse_detections(raw: &[f32], frame_size: (u32, u32), threshold: f32) -> Vec<BoundingBox> {
    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);

    raw.chunks_exact(DETECTION_ROW_LEN)
        .filter(|row| row[2] > threshold)
        .map(|row| BoundingBox {
            x1: (row[3] * frame_w) as i32,
            y1: (row[4] * frame_h) as i32,
            x2: (row[5] * frame_w) as i32,
            y2: (row[6] * frame_h) as i32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(confidence: f32, coords: [f32; 4]) -> Vec<f32> {
        vec![0.0, 1.0, confidence, coords[0], coords[1], coords[2], coords[3]]
    }

    fn sample_output() -> Vec<f32> {
        let mut raw = Vec::new();
        raw.extend(row(0.95, [0.125, 0.25, 0.375, 0.5]));
        raw.extend(row(0.50, [0.50, 0.50, 0.60, 0.60]));
        raw.extend(row(0.71, [0.5, 0.0625, 0.75, 0.5]));
        raw.extend(row(0.70, [0.00, 0.00, 0.10, 0.10]));
        raw
    }

    #[test]
    fn test_threshold_is_strict_and_order_preserved() {
        let boxes = parse_detections(&sample_output(), (200, 100), 0.7);

        assert_eq!(
            boxes,
            vec![
                BoundingBox { x1: 25, y1: 25, x2: 75, y2: 50 },
                BoundingBox { x1: 100, y1: 6, x2: 150, y2: 50 },
            ]
        );
    }

    #[test]
    fn test_threshold_above_one_yields_nothing() {
        let mut raw = sample_output();
        raw.extend(row(1.0, [0.0, 0.0, 1.0, 1.0]));

        assert!(parse_detections(&raw, (640, 480), 1.01).is_empty());
    }

    #[test]
    fn test_overlapping_boxes_are_not_suppressed() {
        let mut raw = row(0.9, [0.1, 0.1, 0.5, 0.5]);
        raw.extend(row(0.8, [0.1, 0.1, 0.5, 0.5]));

        let boxes = parse_detections(&raw, (100, 100), 0.7);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0], boxes[1]);
    }

    #[test]
    fn test_partial_row_is_ignored() {
        let mut raw = row(0.9, [0.1, 0.1, 0.2, 0.2]);
        raw.extend([0.0, 1.0, 0.99]);

        assert_eq!(parse_detections(&raw, (10, 10), 0.5).len(), 1);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_detections(&[], (10, 10), 0.0).is_empty());
    }
}
