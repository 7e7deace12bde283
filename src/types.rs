use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An inclusive (lower, upper) optimizer constraint for one free scalar
/// parameter. Unbounded-above is represented as `f64::INFINITY`.
pub type BoundPair = (f64, f64);

/// Broadcast target for scalar parameters within a kernel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionMode {
    /// Scalar parameters stay one-dimensional.
    Single,
    /// Scalar parameters broadcast across the feature dimensions.
    Features,
}

/// A kernel parameter that may be supplied as a single scalar or as one value
/// per feature dimension. Normalization rewrites scalars to broadcast vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl HyperValue {
    /// Number of stored values, or `None` for an un-broadcast scalar.
    pub fn dim(&self) -> Option<usize> {
        match self {
            HyperValue::Scalar(_) => None,
            HyperValue::Vector(v) => Some(v.len()),
        }
    }

    /// Materialize against a concrete dimension, replicating a scalar.
    pub fn broadcast_to(&self, dim: usize) -> Vec<f64> {
        match self {
            HyperValue::Scalar(v) => vec![*v; dim],
            HyperValue::Vector(v) => v.clone(),
        }
    }
}

impl From<f64> for HyperValue {
    fn from(value: f64) -> Self {
        HyperValue::Scalar(value)
    }
}

impl From<Vec<f64>> for HyperValue {
    fn from(values: Vec<f64>) -> Self {
        HyperValue::Vector(values)
    }
}

/// Variant-specific kernel parameters, tagged by the configuration `type`
/// string. This replaces the open per-key dictionary of classic GP toolkits
/// with a closed sum type; the raw-config parser in [`crate::config`] enforces
/// the per-variant key allow-lists when a spec arrives as loose JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelParams {
    Constant {
        #[serde(rename = "const")]
        value: f64,
    },
    Linear,
    #[serde(alias = "sqe")]
    Gaussian { width: HyperValue },
    Laplacian { width: HyperValue },
    ScaledSqe {
        d_scaling: Vec<f64>,
        width: Vec<f64>,
    },
    Quadratic { slope: HyperValue, degree: f64 },
    User {
        theta: HyperValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constrained: Option<Vec<f64>>,
    },
}

impl KernelParams {
    /// Configuration tag for this variant, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelParams::Constant { .. } => "constant",
            KernelParams::Linear => "linear",
            KernelParams::Gaussian { .. } => "gaussian",
            KernelParams::Laplacian { .. } => "laplacian",
            KernelParams::ScaledSqe { .. } => "scaled_sqe",
            KernelParams::Quadratic { .. } => "quadratic",
            KernelParams::User { .. } => "user",
        }
    }
}

/// One covariance term: variant parameters plus the common optional fields
/// shared by every kernel type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelBlock {
    #[serde(flatten)]
    pub params: KernelParams,
    /// Combination operation with sibling blocks. Passed through to the
    /// covariance builder, never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Subset of feature indices this block applies to. Its length overrides
    /// the ambient dimension count for broadcasting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionMode>,
    /// Per-block multiplicative weight. When present it contributes one
    /// leading slot to the block's flat-vector segment and one bound entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_bounds: Option<BoundPair>,
    /// Explicit per-parameter bound override. Must match the block's free
    /// parameter count exactly when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Vec<BoundPair>>,
}

impl KernelBlock {
    /// A block with the given parameters and no optional fields set.
    pub fn new(params: KernelParams) -> Self {
        Self {
            params,
            operation: None,
            features: None,
            dimension: None,
            scaling: None,
            scaling_bounds: None,
            bounds: None,
        }
    }
}

/// Ordered collection of named kernel blocks. Entry order is significant: it
/// fixes both the optimizer bound list and the flat-vector layout, and every
/// operation in this crate preserves it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KernelSpec {
    blocks: Vec<(String, KernelBlock)>,
}

impl KernelSpec {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, block: KernelBlock) {
        self.blocks.push((name.into(), block));
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&KernelBlock> {
        self.blocks.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KernelBlock)> {
        self.blocks.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut KernelBlock)> {
        self.blocks.iter_mut().map(|(n, b)| (n.as_str(), b))
    }
}

impl FromIterator<(String, KernelBlock)> for KernelSpec {
    fn from_iter<T: IntoIterator<Item = (String, KernelBlock)>>(iter: T) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

/// A comprehensive error type for kernel configuration, normalization, and
/// hyperparameter encoding/decoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("kernel block '{0}' does not set a type, e.g. \"linear\" or \"gaussian\"")]
    MissingType(String),

    #[error("'{0}' kernel not implemented")]
    UnsupportedKernel(String),

    #[error("an undefined key, '{key}', has been provided in a '{kernel}' type kernel block")]
    UndefinedKey { key: String, kernel: String },

    #[error("key '{key}' in a '{kernel}' type kernel block should be {expected}")]
    InvalidValue {
        key: String,
        kernel: String,
        expected: &'static str,
    },

    #[error("kernel dimension can be \"single\" or \"features\", got '{0}'")]
    InvalidDimension(String),

    #[error(
        "kernel block '{block}' references {requested} features but only {available} are available"
    )]
    TooManyFeatures {
        block: String,
        requested: usize,
        available: usize,
    },

    #[error("a required parameter, '{key}', is missing from a '{kernel}' type kernel block")]
    MissingParameter { key: String, kernel: String },

    #[error(
        "explicit bounds for kernel block '{block}' must supply {needed} pairs, got {supplied}"
    )]
    BoundsLengthMismatch {
        block: String,
        needed: usize,
        supplied: usize,
    },

    #[error("kernel parameter '{key}' is an un-broadcast scalar with no resolvable dimension")]
    MissingDimension { key: String },

    #[error(
        "hyperparameter vector too short: kernel block '{block}' needs {needed} more values but only {available} remain"
    )]
    ThetaLengthMismatch {
        block: String,
        needed: usize,
        available: usize,
    },
}
