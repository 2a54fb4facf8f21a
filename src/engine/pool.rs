//! Model Pool
//!
//! Loads the three pretrained networks once at startup and keeps them
//! compiled for the lifetime of the process. The pool is never mutated after
//! construction; handlers share it through an `Arc`.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use ndarray::Array4;
use openvino::{CompiledModel, Core, ElementType, Shape, Tensor};
use parking_lot::Mutex;
use tracing::info;

use crate::config::{InferenceConfig, ModelsConfig};

/// Wrapper for OpenVINO Core that implements Send + Sync
struct SafeCore(#[allow(dead_code)] Core);
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync
///
/// The Rust bindings take `&mut self` to create an inference request, so the
/// model sits behind a mutex. The lock is only held while the request is
/// created; the forward pass runs on the request itself.
pub struct SafeCompiledModel(Mutex<CompiledModel>);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    /// Create an inference request
    pub fn create_infer_request(&self) -> Result<openvino::InferRequest> {
        let mut model = self.0.lock();
        model.create_infer_request().map_err(|e| e.into())
    }
}

/// Model kinds loaded at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    ObjectDetector,
    FaceDetector,
    AgeClassifier,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::ObjectDetector,
        ModelKind::FaceDetector,
        ModelKind::AgeClassifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::ObjectDetector => "object_detector",
            ModelKind::FaceDetector => "face_detector",
            ModelKind::AgeClassifier => "age_classifier",
        }
    }
}

/// Compiled inference handles, one per model kind
pub struct ModelPool {
    // Compiled models are kept alongside the runtime that built them
    _core: SafeCore,
    object_detector: SafeCompiledModel,
    face_detector: SafeCompiledModel,
    age_classifier: SafeCompiledModel,
}

impl ModelPool {
    /// Read and compile every configured model.
    ///
    /// Fails on the first model that cannot be read; the error names the
    /// model kind and path.
    pub fn load(inference: &InferenceConfig, models: &ModelsConfig) -> Result<Self> {
        let mut core = Core::new().context("Failed to initialize OpenVINO runtime")?;
        let device = inference.device.as_str();

        let object_detector =
            Self::compile(&mut core, device, ModelKind::ObjectDetector, &models.object_detector)?;
        let face_detector =
            Self::compile(&mut core, device, ModelKind::FaceDetector, &models.face_detector)?;
        let age_classifier =
            Self::compile(&mut core, device, ModelKind::AgeClassifier, &models.age_classifier)?;

        Ok(Self {
            _core: SafeCore(core),
            object_detector,
            face_detector,
            age_classifier,
        })
    }

    fn compile(core: &mut Core, device: &str, kind: ModelKind, path: &Path) -> Result<SafeCompiledModel> {
        if !path.exists() {
            anyhow::bail!("{} model not found at {}", kind.as_str(), path.display());
        }
        let path_str = path
            .to_str()
            .with_context(|| format!("{} model path is not valid UTF-8", kind.as_str()))?;

        info!("Loading model: {} from {}", kind.as_str(), path_str);
        let start = Instant::now();

        let model = core
            .read_model_from_file(path_str, "")
            .with_context(|| format!("Failed to read {} model", kind.as_str()))?;
        let compiled = core
            .compile_model(&model, device.into())
            .with_context(|| format!("Failed to compile {} model for {}", kind.as_str(), device))?;

        info!("Model {} loaded in {:?}", kind.as_str(), start.elapsed());
        Ok(SafeCompiledModel(Mutex::new(compiled)))
    }

    fn model(&self, kind: ModelKind) -> &SafeCompiledModel {
        match kind {
            ModelKind::ObjectDetector => &self.object_detector,
            ModelKind::FaceDetector => &self.face_detector,
            ModelKind::AgeClassifier => &self.age_classifier,
        }
    }

    /// Every kind held by the pool
    pub fn kinds(&self) -> &'static [ModelKind] {
        &ModelKind::ALL
    }

    /// Run one forward pass and return the first output, flattened.
    pub fn infer(&self, kind: ModelKind, input: &Array4<f32>) -> Result<Vec<f32>> {
        let mut request = self.model(kind).create_infer_request()?;

        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let shape = Shape::new(&dims)?;
        let mut tensor = Tensor::new(ElementType::F32, &shape)?;

        let input_data = input
            .as_slice()
            .context("Input tensor is not in standard layout")?;
        let raw = tensor.get_raw_data_mut()?;
        if raw.len() != input_data.len() * std::mem::size_of::<f32>() {
            anyhow::bail!(
                "{} input size mismatch: tensor holds {} bytes, input has {} floats",
                kind.as_str(),
                raw.len(),
                input_data.len()
            );
        }
        unsafe {
            std::ptr::copy_nonoverlapping(
                input_data.as_ptr(),
                raw.as_mut_ptr() as *mut f32,
                input_data.len(),
            );
        }

        request.set_input_tensor(&tensor)?;
        request.infer()?;

        let output = request.get_output_tensor()?;
        read_tensor_f32(&output)
    }
}

/// Read tensor data as f32 vector
fn read_tensor_f32(tensor: &Tensor) -> Result<Vec<f32>> {
    let shape = tensor.get_shape()?;
    let total_elements: i64 = shape.get_dimensions().iter().product();
    let raw = tensor.get_raw_data()?;
    let count = total_elements as usize;

    if raw.len() < count * std::mem::size_of::<f32>() {
        anyhow::bail!("Output tensor holds fewer bytes than its shape implies");
    }

    let data: Vec<f32> = raw
        .chunks_exact(4)
        .take(count)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(data)
}
