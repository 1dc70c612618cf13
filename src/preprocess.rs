//! Image-to-tensor preprocessing shared by every consumer of the classifier.
//!
//! The training pipeline, the post-conversion check and the test bench must
//! feed the graph identical tensors for identical files. A different resize
//! filter or a re-derived normalization formula would not fail loudly, it
//! would just quietly cost accuracy, so the arithmetic lives here and only
//! here.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use ndarray::Array4;
use tracing::debug;

use crate::error::DetectError;

/// Per-channel mean of the `imagenet` policy.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel std of the `imagenet` policy.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Pixel normalization applied after the resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// `(pixel - 127.5) / 127.5`, range [-1, 1]. What the trained graph was
    /// fed during training.
    Centered,
    /// `pixel / 255.0`, range [0, 1].
    Unit,
    /// `(pixel / 255.0 - mean) / std` with the ImageNet statistics.
    Imagenet,
}

impl Normalization {
    /// Apply the policy to a single sample of `channel`, already widened
    /// to f32.
    pub fn apply(self, value: f32, channel: usize) -> f32 {
        match self {
            Normalization::Centered => (value - 127.5) / 127.5,
            Normalization::Unit => value / 255.0,
            Normalization::Imagenet => {
                (value / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
            }
        }
    }
}

impl FromStr for Normalization {
    type Err = DetectError;

    /// Accepts exactly `centered`, `unit` or `imagenet`. There is no
    /// fallback for anything else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "centered" => Ok(Normalization::Centered),
            "unit" => Ok(Normalization::Unit),
            "imagenet" => Ok(Normalization::Imagenet),
            other => Err(DetectError::UnknownNormalization(other.to_string())),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::Centered => "centered",
            Normalization::Unit => "unit",
            Normalization::Imagenet => "imagenet",
        };
        f.write_str(name)
    }
}

/// Geometry and normalization of the model input.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessConfig {
    pub width: usize,
    pub height: usize,
    pub normalization: Normalization,
}

impl PreprocessConfig {
    /// The classifier's fixed 224x224 input under the given policy.
    pub fn new(normalization: Normalization) -> Self {
        Self {
            width: 224,
            height: 224,
            normalization,
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::new(Normalization::Centered)
    }
}

/// Turns image files into model input tensors of shape `(1, H, W, 3)`.
#[derive(Debug)]
pub struct Preprocessor {
    pub config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Decode `path` and preprocess it.
    pub fn load(&self, path: &Path) -> Result<Array4<f32>, DetectError> {
        let img = image::open(path).map_err(|source| DetectError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("decoded {} ({}x{})", path.display(), img.width(), img.height());
        self.preprocess(&img)
    }

    /// Resize, normalize and add the leading batch dimension.
    ///
    /// The output shape is always `(1, height, width, 3)` no matter what is
    /// fed in; aspect ratio is stretched away rather than cropped.
    pub fn preprocess(&self, img: &DynamicImage) -> Result<Array4<f32>, DetectError> {
        let (width, height) = (self.config.width, self.config.height);

        // Alpha is dropped and grayscale replicated before the resize so the
        // filter always runs over three channels.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut resized = Image::new(width as u32, height as u32, PixelType::U8x3);
        let mut resizer = Resizer::new();
        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
        resizer.resize(&rgb, &mut resized, Some(&options))?;

        let pixels = resized.buffer();
        debug!(
            "resized to {}x{}, pixel range [{}, {}]",
            width,
            height,
            pixels.iter().min().copied().unwrap_or(0),
            pixels.iter().max().copied().unwrap_or(0),
        );

        // Each sample is widened to f32 before any arithmetic touches it.
        let normalization = self.config.normalization;
        let mut tensor = Array4::<f32>::zeros((1, height, width, 3));
        for (i, px) in pixels.chunks_exact(3).enumerate() {
            let y = i / width;
            let x = i % width;
            for c in 0..3 {
                tensor[[0, y, x, c]] = normalization.apply(px[c] as f32, c);
            }
        }

        let (lo, hi) = value_range(&tensor);
        debug!("normalized ({normalization}) range [{lo:.3}, {hi:.3}]");

        Ok(tensor)
    }
}

/// Min and max over the whole tensor, for diagnostics.
fn value_range(tensor: &Array4<f32>) -> (f32, f32) {
    tensor
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
