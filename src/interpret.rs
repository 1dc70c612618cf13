//! Turns raw classifier output into a detection verdict.
//!
//! The converted graph has shipped with two different heads over time: a
//! single sigmoid unit `(1, 1)` and a two-unit head `(1, 2)` that is
//! sometimes softmaxed inside the graph and sometimes not. Everything here
//! exists to make those variants indistinguishable to callers.

use ndarray::{Array1, ArrayD};
use serde::Serialize;
use tracing::debug;

use crate::error::DetectError;
use crate::labels::LabelSet;

/// Probability assigned to one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

/// Final verdict for one image.
///
/// `results` is always ordered negative class first, matching the label
/// file. `confidence` is the probability of whichever class won.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub detected: bool,
    pub confidence: f32,
    pub results: [LabelScore; 2],
}

impl Classification {
    /// Name of the winning class.
    pub fn prediction(&self) -> &str {
        let idx = if self.detected { 1 } else { 0 };
        &self.results[idx].label
    }
}

/// Numerically stable softmax over a 1D array.
pub fn softmax(slice: &Array1<f32>) -> Array1<f32> {
    let max_val = slice.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Array1<f32> = slice.mapv(|x| (x - max_val).exp());
    let sum_exp: f32 = exp_vals.sum();
    exp_vals.mapv(|v| v / sum_exp)
}

/// Interpret a raw output tensor.
///
/// Accepts `(1, 1)` and `(1, 2)` outputs; anything else is an error. A
/// `(1, 2)` output carrying values outside `[0, 1]` is treated as logits
/// and softmaxed first. Exact ties resolve to not-detected.
pub fn interpret(output: &ArrayD<f32>, labels: &LabelSet) -> Result<Classification, DetectError> {
    match output.shape() {
        [1, 1] => {
            let vest = output[[0, 0]];
            let no_vest = 1.0 - vest;
            debug!("single-unit output, raw value {vest:.6}");
            Ok(verdict(vest > 0.5, no_vest, vest, labels))
        }
        [1, 2] => {
            let row = Array1::from_iter(output.iter().copied());
            // NaN compares false on both sides, same as the comparison a
            // numpy mask would make, so it never triggers the softmax.
            let logits = row.iter().any(|&v| v < 0.0 || v > 1.0);
            let probs = if logits { softmax(&row) } else { row };
            debug!(
                "two-unit output, logits={logits}, probabilities [{:.6}, {:.6}]",
                probs[0], probs[1]
            );
            Ok(verdict(probs[1] > probs[0], probs[0], probs[1], labels))
        }
        shape => Err(DetectError::UnsupportedOutputShape(shape.to_vec())),
    }
}

fn verdict(detected: bool, no_vest: f32, vest: f32, labels: &LabelSet) -> Classification {
    Classification {
        detected,
        confidence: if detected { vest } else { no_vest },
        results: [
            LabelScore {
                label: labels.negative().to_string(),
                confidence: no_vest,
            },
            LabelScore {
                label: labels.positive().to_string(),
                confidence: vest,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, arr3};

    fn labels() -> LabelSet {
        LabelSet::new("no_vest", "vest")
    }

    #[test]
    fn single_unit_over_half_is_detected() {
        let out = arr2(&[[0.87f32]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(c.detected);
        assert!((c.confidence - 0.87).abs() < 1e-6);
        assert_eq!(c.prediction(), "vest");
        assert!((c.results[0].confidence - 0.13).abs() < 1e-6);
    }

    #[test]
    fn single_unit_at_exactly_half_is_not_detected() {
        let out = arr2(&[[0.5f32]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(!c.detected);
        assert!((c.confidence - 0.5).abs() < 1e-6);
        assert_eq!(c.prediction(), "no_vest");
    }

    #[test]
    fn two_unit_logits_are_softmaxed() {
        let out = arr2(&[[2.0f32, -1.0]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(!c.detected);
        assert!((c.confidence - 0.952_574).abs() < 1e-3);
        let sum: f32 = c.results.iter().map(|r| r.confidence).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn two_unit_probabilities_pass_through_untouched() {
        let out = arr2(&[[0.3f32, 0.7]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(c.detected);
        assert_eq!(c.confidence, 0.7);
        assert_eq!(c.results[0].confidence, 0.3);
    }

    #[test]
    fn two_unit_tie_is_not_detected() {
        let out = arr2(&[[0.5f32, 0.5]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(!c.detected);
        assert_eq!(c.prediction(), "no_vest");
    }

    #[test]
    fn huge_logits_stay_finite() {
        let out = arr2(&[[1000.0f32, 1001.0]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        assert!(c.detected);
        assert!(c.confidence.is_finite());
        let sum: f32 = c.results.iter().map(|r| r.confidence).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn nan_values_do_not_trigger_softmax() {
        let out = arr2(&[[f32::NAN, 0.4]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        // NaN comparisons are false, so nothing wins over the negative class.
        assert!(!c.detected);
    }

    #[test]
    fn unexpected_shapes_are_rejected() {
        let three = arr2(&[[0.1f32, 0.2, 0.7]]).into_dyn();
        match interpret(&three, &labels()) {
            Err(DetectError::UnsupportedOutputShape(shape)) => assert_eq!(shape, vec![1, 3]),
            other => panic!("expected UnsupportedOutputShape, got {other:?}"),
        }

        let batched = arr3(&[[[0.1f32], [0.9]]]).into_dyn();
        assert!(matches!(
            interpret(&batched, &labels()),
            Err(DetectError::UnsupportedOutputShape(_))
        ));
    }

    #[test]
    fn report_serializes_in_label_order() {
        let out = arr2(&[[0.3f32, 0.7]]).into_dyn();
        let c = interpret(&out, &labels()).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["detected"], serde_json::Value::Bool(true));
        assert_eq!(json["results"][0]["label"], "no_vest");
        assert_eq!(json["results"][1]["label"], "vest");
    }
}
