use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of the classifier pipeline.
///
/// Every failure is deterministic for a given input, so none of them is
/// worth retrying. Batch callers are expected to treat [`ImageDecode`]
/// as fatal for that one image only and keep going; everything else
/// aborts the run.
///
/// [`ImageDecode`]: DetectError::ImageDecode
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unknown normalization method {0:?} (expected centered, unit or imagenet)")]
    UnknownNormalization(String),

    #[error("unsupported model output shape {0:?} (expected [1, 1] or [1, 2])")]
    UnsupportedOutputShape(Vec<usize>),

    #[error("failed to read label file {}: {source}", path.display())]
    LabelRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("label file {} must hold exactly 2 non-empty labels, found {count}", path.display())]
    LabelCount { path: PathBuf, count: usize },

    #[error("image resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),
}
