//! Comparison Service
//!
//! Pairs two image collections by position, scores every pair and decides
//! whether the child appears with a parent.

use std::collections::HashMap;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{info, warn};

use crate::config::ComparisonConfig;
use crate::engine::preprocess::decode_image;
use crate::engine::SimilarityScorer;

use super::types::{ComparisonReport, PairScore, Verdict};

/// Key under which child crops are grouped
pub const CHILD_KEY: &str = "child";

/// Named groups of decoded images, fixed once built
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    groups: HashMap<String, Vec<DynamicImage>>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding `images` under the child key
    pub fn child(images: Vec<DynamicImage>) -> Self {
        Self::new().with_group(CHILD_KEY, images)
    }

    pub fn with_group(mut self, key: &str, images: Vec<DynamicImage>) -> Self {
        self.groups.insert(key.to_string(), images);
        self
    }

    /// Images under `key`, empty when the key is absent
    pub fn get(&self, key: &str) -> &[DynamicImage] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Collection comparison service
#[derive(Debug, Clone)]
pub struct CompareService {
    scorer: SimilarityScorer,
    config: ComparisonConfig,
}

impl CompareService {
    /// Create a new comparison service
    pub fn new(config: ComparisonConfig) -> Self {
        Self {
            scorer: SimilarityScorer::new(config.canvas_size),
            config,
        }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Compare the child groups of two collections.
    ///
    /// Images are paired strictly by position up to the shorter group. The
    /// surplus of the longer group is logged and left out of every score.
    pub fn compare_collections(
        &self,
        incoming: &ImageCollection,
        outgoing: &ImageCollection,
    ) -> Result<ComparisonReport> {
        let images_in = incoming.get(CHILD_KEY);
        let images_out = outgoing.get(CHILD_KEY);
        let paired = images_in.len().min(images_out.len());

        let mut pairs = Vec::with_capacity(paired);
        for (i, (img_in, img_out)) in images_in.iter().zip(images_out).enumerate() {
            let score = self
                .scorer
                .score(img_in, img_out)
                .with_context(|| format!("Failed to score pair {}", i + 1))?;
            info!(
                "Similarity between image {} of the incoming set and image {} of the outgoing set: {:.2}",
                i + 1,
                i + 1,
                score
            );
            pairs.push(PairScore { index: i + 1, score });
        }

        for i in paired..images_in.len() {
            warn!("No matching image for image {} of the incoming set in the outgoing set", i + 1);
        }
        for i in paired..images_out.len() {
            warn!("No matching image for image {} of the outgoing set in the incoming set", i + 1);
        }

        let threshold = self.config.similarity_threshold;
        let found_similar = pairs
            .iter()
            .take(self.config.checked_pairs)
            .any(|pair| pair.score > threshold);

        let verdict = if found_similar {
            info!("The child is present with one of the parents");
            Verdict::LikelyLegitimate
        } else {
            warn!("Warning: possible mismatch, the child may not be with a parent");
            Verdict::PossibleMismatch
        };

        Ok(ComparisonReport {
            pairs,
            unmatched_in: images_in.len() - paired,
            unmatched_out: images_out.len() - paired,
            threshold,
            checked_pairs: self.config.checked_pairs,
            verdict,
        })
    }

    /// Decode two uploads and compare them as single-image child collections.
    ///
    /// Decoding and scoring run on a blocking worker that inherits the
    /// caller's tracing dispatcher.
    pub async fn compare_bytes(&self, image1: Vec<u8>, image2: Vec<u8>) -> Result<ComparisonReport> {
        let service = self.clone();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                let first = decode_image(&image1).context("Failed to decode image1")?;
                let second = decode_image(&image2).context("Failed to decode image2")?;

                let incoming = ImageCollection::child(vec![first]);
                let outgoing = ImageCollection::child(vec![second]);

                service.compare_collections(&incoming, &outgoing)
            })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::{Luma, GrayImage, Rgb, RgbImage};

    use crate::test_support::{png_bytes, CapturedLogs};

    fn pattern(seed: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(96, 64, move |x, y| {
            Luma([((x * (seed + 3) + y * (seed * 5 + 1)) % 256) as u8])
        }))
    }

    fn solid(color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb(color)))
    }

    fn service() -> CompareService {
        CompareService::new(ComparisonConfig::default())
    }

    #[test]
    fn test_missing_key_is_empty() {
        let collection = ImageCollection::new().with_group("parent", vec![pattern(1)]);
        assert!(collection.get(CHILD_KEY).is_empty());
        assert_eq!(collection.get("parent").len(), 1);
    }

    #[test]
    fn test_identical_pair_is_legitimate() {
        let report = service()
            .compare_collections(
                &ImageCollection::child(vec![pattern(1)]),
                &ImageCollection::child(vec![pattern(1)]),
            )
            .unwrap();

        assert_eq!(report.pairs.len(), 1);
        assert!((report.pairs[0].score - 1.0).abs() < 1e-9);
        assert_eq!(report.verdict, Verdict::LikelyLegitimate);
        assert_eq!((report.unmatched_in, report.unmatched_out), (0, 0));
    }

    #[test]
    fn test_pairs_are_positional() {
        let report = service()
            .compare_collections(
                &ImageCollection::child(vec![pattern(1), pattern(2)]),
                &ImageCollection::child(vec![pattern(2), pattern(1)]),
            )
            .unwrap();

        // Cross-pairing would find perfect matches; positional pairing must not
        assert_eq!(report.pairs.len(), 2);
        assert!(report.pairs.iter().all(|p| p.score < 0.99));
        assert_eq!(report.pairs[0].index, 1);
        assert_eq!(report.pairs[1].index, 2);
    }

    #[test]
    fn test_only_first_three_pairs_count() {
        let incoming = ImageCollection::child(vec![
            solid([0, 0, 0]),
            solid([0, 0, 0]),
            solid([0, 0, 0]),
            pattern(4),
        ]);
        let outgoing = ImageCollection::child(vec![
            solid([255, 255, 255]),
            solid([255, 255, 255]),
            solid([255, 255, 255]),
            pattern(4),
        ]);

        let report = service().compare_collections(&incoming, &outgoing).unwrap();
        assert!((report.pairs[3].score - 1.0).abs() < 1e-9);
        assert_eq!(report.verdict, Verdict::PossibleMismatch);

        let mut config = ComparisonConfig::default();
        config.checked_pairs = 4;
        let report = CompareService::new(config)
            .compare_collections(&incoming, &outgoing)
            .unwrap();
        assert_eq!(report.verdict, Verdict::LikelyLegitimate);
    }

    #[test]
    fn test_empty_collections_are_mismatch() {
        let report = service()
            .compare_collections(&ImageCollection::new(), &ImageCollection::new())
            .unwrap();
        assert!(report.pairs.is_empty());
        assert_eq!(report.verdict, Verdict::PossibleMismatch);
    }

    #[test]
    fn test_unmatched_images_are_logged_once_each() {
        let logs = CapturedLogs::default();

        let report = tracing::subscriber::with_default(logs.subscriber(), || {
            service().compare_collections(
                &ImageCollection::child(vec![pattern(1), pattern(2), pattern(3), pattern(5), pattern(6)]),
                &ImageCollection::child(vec![pattern(1), pattern(2)]),
            )
        })
        .unwrap();

        assert_eq!(report.unmatched_in, 3);
        assert_eq!(report.unmatched_out, 0);
        assert_eq!(logs.count("No matching image"), 3);
        assert_eq!(logs.count("Similarity between image"), 2);
    }

    #[test]
    fn test_unmatched_outgoing_images_are_logged() {
        let logs = CapturedLogs::default();

        let report = tracing::subscriber::with_default(logs.subscriber(), || {
            service().compare_collections(
                &ImageCollection::child(vec![pattern(1)]),
                &ImageCollection::child(vec![pattern(1), pattern(2), pattern(3)]),
            )
        })
        .unwrap();

        assert_eq!(report.unmatched_out, 2);
        assert_eq!(logs.count("No matching image"), 2);
        assert_eq!(logs.count("of the outgoing set in the incoming set"), 2);
    }

    #[test]
    fn test_verdict_is_logged() {
        let logs = CapturedLogs::default();

        tracing::subscriber::with_default(logs.subscriber(), || {
            service()
                .compare_collections(
                    &ImageCollection::child(vec![solid([0, 0, 0])]),
                    &ImageCollection::child(vec![solid([255, 255, 255])]),
                )
                .unwrap();
        });

        assert_eq!(logs.count("possible mismatch"), 1);
    }

    #[tokio::test]
    async fn test_compare_bytes_decodes_uploads() {
        let image = pattern(7);
        let report = service()
            .compare_bytes(png_bytes(&image), png_bytes(&image))
            .await
            .unwrap();

        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.verdict, Verdict::LikelyLegitimate);
    }

    #[tokio::test]
    async fn test_compare_bytes_rejects_garbage() {
        let result = service()
            .compare_bytes(b"not an image".to_vec(), png_bytes(&pattern(1)))
            .await;
        assert!(result.is_err());
    }
}
