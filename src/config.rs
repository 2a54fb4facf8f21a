//! Service configuration

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub comparison: ComparisonConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a request body, in megabytes
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// OpenVINO device name ("CPU", "GPU", ...)
    pub device: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub object_detector: PathBuf,
    pub face_detector: PathBuf,
    pub age_classifier: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detections must score strictly above this to be kept
    pub confidence_threshold: f32,
    /// Pixels added on every side of a face box before age estimation
    pub padding: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// A pair scoring strictly above this counts as a match
    pub similarity_threshold: f64,
    /// Only the first N positional pairs take part in the verdict
    pub checked_pairs: usize,
    /// Side of the square canvas both images are resized to
    pub canvas_size: u32,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.comparison.canvas_size < 7 {
            anyhow::bail!(
                "comparison.canvas_size must be at least 7 pixels, got {}",
                self.comparison.canvas_size
            );
        }
        if self.comparison.checked_pairs == 0 {
            anyhow::bail!("comparison.checked_pairs must be at least 1");
        }
        if !(-1.0..=1.0).contains(&self.comparison.similarity_threshold) {
            anyhow::bail!(
                "comparison.similarity_threshold must lie in [-1, 1], got {}",
                self.comparison.similarity_threshold
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_mb: 20,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: "CPU".to_string(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            object_detector: PathBuf::from("models/yolov5s.onnx"),
            face_detector: PathBuf::from("models/opencv_face_detector.onnx"),
            age_classifier: PathBuf::from("models/age_net.onnx"),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            padding: 20,
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            checked_pairs: 3,
            canvas_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.detection.padding, 20);
        assert!((config.detection.confidence_threshold - 0.7).abs() < 1e-6);
        assert!((config.comparison.similarity_threshold - 0.8).abs() < 1e-12);
        assert_eq!(config.comparison.checked_pairs, 3);
        assert_eq!(config.comparison.canvas_size, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [comparison]
            similarity_threshold = 0.65
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!((config.comparison.similarity_threshold - 0.65).abs() < 1e-12);
        assert_eq!(config.comparison.checked_pairs, 3);
        assert_eq!(config.inference.device, "CPU");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.comparison.checked_pairs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.comparison.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.comparison.canvas_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }
}
