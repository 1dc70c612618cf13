use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::DetectError;

/// The classifier's two class labels, in file order.
///
/// Index 0 is the negative class and index 1 the positive class; the
/// output interpretation leans on that order, so the label file must not
/// be reshuffled independently of the trained graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: [String; 2],
}

impl LabelSet {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self {
            labels: [negative.into(), positive.into()],
        }
    }

    /// Load the label pair from a plain text file, one label per line.
    ///
    /// Surrounding whitespace is trimmed and blank lines are skipped;
    /// anything other than exactly two labels is rejected.
    pub fn load(path: &Path) -> Result<Self, DetectError> {
        let file = File::open(path).map_err(|source| DetectError::LabelRead {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);

        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| DetectError::LabelRead {
                path: path.to_path_buf(),
                source,
            })?;
            let label = line.trim();
            if !label.is_empty() {
                labels.push(label.to_string());
            }
        }

        match <[String; 2]>::try_from(labels) {
            Ok(labels) => Ok(Self { labels }),
            Err(labels) => Err(DetectError::LabelCount {
                path: path.to_path_buf(),
                count: labels.len(),
            }),
        }
    }

    /// Label of the negative class (index 0).
    pub fn negative(&self) -> &str {
        &self.labels[0]
    }

    /// Label of the positive class (index 1).
    pub fn positive(&self) -> &str {
        &self.labels[1]
    }
}
