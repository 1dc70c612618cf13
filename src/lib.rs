//! Support toolkit for the vest/no_vest image classifier.
//!
//! The trained graph only sees `(1, 224, 224, 3)` f32 tensors and only
//! emits a `(1, 1)` or `(1, 2)` probability head, so a handful of
//! conventions decide whether a deployment works at all: the resize filter,
//! the normalization arithmetic, the label order and the tie rules. This
//! crate pins those conventions down once and the binaries reuse them.
//!
//! - [`preprocess`] turns image files into model input tensors
//! - [`model`] loads the ONNX graph and runs it
//! - [`interpret`] maps raw output tensors to detection verdicts
//! - [`labels`] loads the two-line class name file

pub mod cli;
pub mod error;
pub mod interpret;
pub mod labels;
pub mod model;
pub mod preprocess;

pub use error::DetectError;
pub use interpret::{Classification, LabelScore, interpret};
pub use labels::LabelSet;
pub use model::{OnnxModel, VestModel};
pub use preprocess::{Normalization, PreprocessConfig, Preprocessor};
