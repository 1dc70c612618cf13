//! ONNX session construction and single-image inference.

use std::fmt::Write as _;
use std::path::Path;

use ndarray::{Array4, ArrayD, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use tracing::info;

use crate::error::DetectError;

/// Execution-provider choice, decided once at startup.
pub struct OnnxModel {
    provider: [ort::execution_providers::ExecutionProviderDispatch; 1],
}

impl OnnxModel {
    /// CUDA is opt-in and fails loudly instead of silently falling back to
    /// the CPU.
    pub fn new(cuda: bool) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self { provider }
    }

    /// Build a session from an `.onnx` file on disk.
    pub fn load(&self, model_path: &Path) -> Result<VestModel, DetectError> {
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        info!("loaded model {}", model_path.display());
        Ok(VestModel { session })
    }
}

/// A loaded classifier graph.
pub struct VestModel {
    session: Session,
}

impl VestModel {
    /// Run one preprocessed tensor through the graph and return the first
    /// output as an owned array. Shape checks happen downstream.
    pub fn infer(&self, input: Array4<f32>) -> Result<ArrayD<f32>, DetectError> {
        let input = CowArray::from(input);
        let outputs = self.session.run(ort::inputs![input.view()]?)?;
        let (_name, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| DetectError::UnsupportedOutputShape(Vec::new()))?;
        Ok(value.try_extract_tensor::<f32>()?.into_owned())
    }

    /// One line per graph input and output, for startup diagnostics.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for input in &self.session.inputs {
            let _ = writeln!(out, "  input  {}: {:?}", input.name, input.input_type);
        }
        for output in &self.session.outputs {
            let _ = writeln!(out, "  output {}: {:?}", output.name, output.output_type);
        }
        out
    }
}
