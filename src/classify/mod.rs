//! Binary X-ray screening boundary: an opaque model behind a trait, plus
//! the fixed thresholding rule that turns a raw probability into a label
//! and a reported confidence.

use image::imageops::FilterType;
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::CANONICAL_RESOLUTION;

/// Raw model probabilities at or below this threshold are read as Healthy.
pub const UNHEALTHY_THRESHOLD: f32 = 0.4;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("could not read uploaded image: {0}")]
    UnreadableImage(String),

    #[error("model file not found: {0}")]
    ModelNotFound(std::path::PathBuf),

    #[error("model initialization failed: {0}")]
    ModelInit(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Healthy,
    PotentiallyUnhealthy,
}

/// A screening verdict. The confidence is asymmetric on purpose: it is
/// `1 - p` for Healthy and `p` for PotentiallyUnhealthy, so it always
/// reads as "confidence in the reported label".
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f32,
}

impl Prediction {
    /// Apply the fixed thresholding rule to a raw model probability of the
    /// unhealthy class.
    pub fn from_probability(probability: f32) -> Self {
        if probability <= UNHEALTHY_THRESHOLD {
            Self {
                label: Label::Healthy,
                confidence: 1.0 - probability,
            }
        } else {
            Self {
                label: Label::PotentiallyUnhealthy,
                confidence: probability,
            }
        }
    }
}

/// The trained model, treated as opaque: canonical-resolution RGB in, raw
/// probability of the unhealthy class in [0, 1] out.
///
/// Implementations own their value scaling (the ONNX model divides by 255
/// before inference).
pub trait XrayModel: Send + Sync {
    fn predict(&self, input: &RgbImage) -> Result<f32, ClassifyError>;
}

/// Classify one uploaded X-ray photograph.
///
/// The image is decoded from its encoded bytes, resampled to the
/// canonical resolution in RGB, run through the model, and thresholded.
pub fn classify(model: &dyn XrayModel, image_bytes: &[u8]) -> Result<Prediction, ClassifyError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ClassifyError::UnreadableImage(e.to_string()))?;
    let input = image::imageops::resize(
        &decoded.to_rgb8(),
        CANONICAL_RESOLUTION,
        CANONICAL_RESOLUTION,
        FilterType::Triangle,
    );

    let probability = model.predict(&input)?.clamp(0.0, 1.0);
    Ok(Prediction::from_probability(probability))
}

// ═══════════════════════════════════════════════════════════
// ONNX model, behind the `onnx-model` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-model")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use image::RgbImage;
    use ort::session::Session;

    use super::{ClassifyError, XrayModel};
    use crate::config::CANONICAL_RESOLUTION;

    /// The trained classifier loaded through ONNX Runtime.
    ///
    /// Input layout is NHWC `[1, 512, 512, 3]` float32 scaled to [0, 1];
    /// output is a single sigmoid probability.
    ///
    /// Uses interior mutability (Mutex) because `ort::Session::run` takes
    /// `&mut self` while the `XrayModel` trait exposes `&self` for shared
    /// usage across request handlers.
    pub struct OnnxXrayModel {
        session: Mutex<Session>,
    }

    impl OnnxXrayModel {
        pub fn load(model_path: &Path) -> Result<Self, ClassifyError> {
            if !model_path.exists() {
                return Err(ClassifyError::ModelNotFound(model_path.to_path_buf()));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| ClassifyError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| ClassifyError::ModelInit(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e: ort::Error| ClassifyError::ModelInit(format!("ONNX load failed: {e}")))?;

            tracing::info!("X-ray model loaded from {}", model_path.display());

            Ok(Self {
                session: Mutex::new(session),
            })
        }
    }

    impl XrayModel for OnnxXrayModel {
        fn predict(&self, input: &RgbImage) -> Result<f32, ClassifyError> {
            use ort::value::TensorRef;

            let side = CANONICAL_RESOLUTION as usize;
            let mut array = ndarray::Array4::<f32>::zeros((1, side, side, 3));
            for (x, y, pixel) in input.enumerate_pixels() {
                for c in 0..3 {
                    array[[0, y as usize, x as usize, c]] = pixel.0[c] as f32 / 255.0;
                }
            }

            let tensor = TensorRef::from_array_view(&array)
                .map_err(|e| ClassifyError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| ClassifyError::Inference("session lock poisoned".into()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| ClassifyError::Inference(format!("ONNX inference failed: {e}")))?;

            let (_, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifyError::Inference(format!("output extraction: {e}")))?;

            data.first()
                .copied()
                .ok_or_else(|| ClassifyError::Inference("model produced no output".into()))
        }
    }
}

#[cfg(feature = "onnx-model")]
pub use onnx::OnnxXrayModel;

/// Model stub for testing: always reports the same raw probability.
pub struct FixedProbabilityModel(pub f32);

impl XrayModel for FixedProbabilityModel {
    fn predict(&self, _input: &RgbImage) -> Result<f32, ClassifyError> {
        Ok(self.0)
    }
}
