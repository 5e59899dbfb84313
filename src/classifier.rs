//! Model artifact loading and inference.
//!
//! The training pipeline exports its model as a JSON document
//! (`personality-model/v1`) declaring the feature order, the class order and
//! one estimator. The artifact is validated once at load time so that
//! inference itself cannot fail on a well-formed feature row.

use crate::preprocessing::FeatureRow;
use crate::schema::{feature_names, Personality, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Format tag every supported artifact carries.
pub const ARTIFACT_FORMAT: &str = "personality-model/v1";

/// Errors raised while loading a model or running inference.
#[derive(Debug)]
pub enum ModelError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(String),
    Invalid(String),
    ChecksumMismatch { expected: String, actual: String },
    UnknownClass(u8),
    OutputLength { expected: usize, actual: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io { path, source } => {
                write!(f, "failed to read model artifact {}: {}", path.display(), source)
            }
            ModelError::Parse(msg) => write!(f, "failed to parse model artifact: {}", msg),
            ModelError::Invalid(msg) => write!(f, "invalid model artifact: {}", msg),
            ModelError::ChecksumMismatch { expected, actual } => write!(
                f,
                "model artifact checksum mismatch: expected {}, got {}",
                expected, actual
            ),
            ModelError::UnknownClass(code) => {
                write!(f, "model produced unknown class code {}", code)
            }
            ModelError::OutputLength { expected, actual } => write!(
                f,
                "model returned {} predictions for {} rows",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A trained binary classifier over preprocessed feature rows.
///
/// Implementations are shared across request handlers without locking, so
/// `predict` must be safe to call concurrently.
pub trait Classifier: Send + Sync {
    /// Returns one class code per input row, in input order.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError>;

    /// Short identifier for logs (e.g. the artifact digest).
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Runs the classifier and maps its codes to labels.
///
/// Fails if the classifier returns the wrong number of predictions or a code
/// outside the label mapping; no partial result is returned.
pub fn predict_labels(
    classifier: &dyn Classifier,
    rows: &[FeatureRow],
) -> Result<Vec<Personality>, ModelError> {
    let codes = classifier.predict(rows)?;
    if codes.len() != rows.len() {
        return Err(ModelError::OutputLength {
            expected: rows.len(),
            actual: codes.len(),
        });
    }

    codes
        .into_iter()
        .map(|code| Personality::from_code(code).ok_or(ModelError::UnknownClass(code)))
        .collect()
}

// ============ Artifact Format ============

/// Serialized model as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    /// Feature names in the order the estimator expects them.
    pub feature_names: Vec<String>,
    /// Class labels indexed by class code.
    pub classes: Vec<String>,
    pub estimator: Estimator,
    /// Free-form training metadata; logged, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    /// Majority vote over decision trees. Ties go to class 0.
    RandomForest { trees: Vec<DecisionTree> },
    /// `sigmoid(intercept + coefficients · x) >= threshold` → class 1.
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_threshold() -> f64 {
    0.5
}

/// Binary decision tree stored as a flat node list; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go to `left`, the rest to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { class: u8 },
}

impl DecisionTree {
    fn validate(&self, index: usize, class_count: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {} has no nodes", index)));
        }

        for (position, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(ModelError::Invalid(format!(
                            "tree {} node {} splits on feature {} (only {} features)",
                            index, position, feature, FEATURE_COUNT
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelError::Invalid(format!(
                            "tree {} node {} has a non-finite threshold",
                            index, position
                        )));
                    }
                    // Children must point forward so traversal always terminates.
                    for child in [left, right] {
                        if child <= position || child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "tree {} node {} has invalid child {}",
                                index, position, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { class } => {
                    if class as usize >= class_count {
                        return Err(ModelError::Invalid(format!(
                            "tree {} node {} predicts unknown class {}",
                            index, position, class
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &FeatureRow) -> u8 {
        let mut position = 0;
        loop {
            match self.nodes[position] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    position = if row[feature] <= threshold { left } else { right };
                }
                TreeNode::Leaf { class } => return class,
            }
        }
    }
}

impl Estimator {
    fn validate(&self, class_count: usize) -> Result<(), ModelError> {
        match self {
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid("random forest has no trees".to_string()));
                }
                for (index, tree) in trees.iter().enumerate() {
                    tree.validate(index, class_count)?;
                }
                Ok(())
            }
            Estimator::LogisticRegression {
                coefficients,
                intercept,
                threshold,
            } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(ModelError::Invalid(format!(
                        "expected {} coefficients, found {}",
                        FEATURE_COUNT,
                        coefficients.len()
                    )));
                }
                if !coefficients.iter().all(|c| c.is_finite()) || !intercept.is_finite() {
                    return Err(ModelError::Invalid(
                        "logistic regression weights must be finite".to_string(),
                    ));
                }
                if !(0.0..=1.0).contains(threshold) {
                    return Err(ModelError::Invalid(format!(
                        "decision threshold {} outside [0, 1]",
                        threshold
                    )));
                }
                Ok(())
            }
        }
    }

    fn predict_row(&self, row: &FeatureRow) -> u8 {
        match self {
            Estimator::RandomForest { trees } => {
                let extrovert_votes = trees.iter().filter(|tree| tree.predict_row(row) == 1).count();
                let introvert_votes = trees.len() - extrovert_votes;
                u8::from(extrovert_votes > introvert_votes)
            }
            Estimator::LogisticRegression {
                coefficients,
                intercept,
                threshold,
            } => {
                let z = intercept
                    + coefficients
                        .iter()
                        .zip(row.iter())
                        .map(|(w, x)| w * x)
                        .sum::<f64>();
                let probability = 1.0 / (1.0 + (-z).exp());
                u8::from(probability >= *threshold)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Estimator::RandomForest { .. } => "random_forest",
            Estimator::LogisticRegression { .. } => "logistic_regression",
        }
    }
}

impl ModelArtifact {
    /// Checks that the artifact matches the fixed schema and label mapping.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ModelError::Invalid(format!(
                "unsupported format '{}', expected '{}'",
                self.format, ARTIFACT_FORMAT
            )));
        }

        let expected_features = feature_names();
        if self.feature_names.len() != expected_features.len()
            || self
                .feature_names
                .iter()
                .zip(expected_features.iter())
                .any(|(found, expected)| found != expected)
        {
            return Err(ModelError::Invalid(format!(
                "feature order {:?} does not match schema {:?}",
                self.feature_names, expected_features
            )));
        }

        let expected_classes: Vec<&str> = Personality::ALL.iter().map(|p| p.as_str()).collect();
        if self.classes != expected_classes {
            return Err(ModelError::Invalid(format!(
                "class order {:?} does not match label mapping {:?}",
                self.classes, expected_classes
            )));
        }

        self.estimator.validate(self.classes.len())
    }
}

/// A validated model artifact ready for inference.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    artifact: ModelArtifact,
    sha256: String,
}

impl LoadedModel {
    /// Parses and validates an artifact from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Parse(e.to_string()))?;
        artifact.validate()?;

        Ok(Self {
            artifact,
            sha256: sha256_hex(bytes),
        })
    }

    /// Loads the artifact at `path`.
    ///
    /// When `expected_sha256` is set, the file digest must match it
    /// (case-insensitive hex).
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(expected) = expected_sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(ModelError::ChecksumMismatch {
                    expected: expected.trim().to_lowercase(),
                    actual,
                });
            }
        }

        let model = Self::from_bytes(&bytes)?;
        tracing::info!(
            "Loaded {} model from {} (sha256 {})",
            model.artifact.estimator.kind(),
            path.display(),
            model.sha256
        );
        if let Some(metadata) = &model.artifact.metadata {
            tracing::debug!("Model metadata: {}", metadata);
        }
        Ok(model)
    }

    /// Hex SHA-256 digest of the artifact bytes.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl Classifier for LoadedModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
        Ok(rows
            .iter()
            .map(|row| self.artifact.estimator.predict_row(row))
            .collect())
    }

    fn describe(&self) -> String {
        format!(
            "{} ({})",
            self.artifact.estimator.kind(),
            &self.sha256[..12.min(self.sha256.len())]
        )
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
