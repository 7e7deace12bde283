//! Kernel spec normalization ahead of hyperparameter optimization.
//!
//! [`prepare_kernels`] walks the blocks in spec order, broadcasts scalar
//! parameters across the resolved feature dimension, and assembles the
//! optimizer bound list: one (lower, upper) pair per free scalar parameter in
//! block order, plus one trailing pair for the external regularization term.

use crate::types::{
    BoundPair, DimensionMode, HyperValue, KernelBlock, KernelError, KernelParams, KernelSpec,
};

/// Default bound pair for a free hyperparameter.
pub const DEFAULT_BOUNDS: BoundPair = (1e-12, f64::INFINITY);

/// Default bound pair when gradients are evaluated. Gradient-aware
/// optimization needs strictly positive, finite bounds to avoid degenerate
/// derivatives at the edges.
pub const GRADIENT_BOUNDS: BoundPair = (1e-6, 1e6);

/// Validate and normalize a kernel spec, returning the optimizer bound list.
///
/// The spec is mutated in place: scalar `width`/`slope` parameters are
/// rewritten as vectors broadcast over the per-block dimension. The per-block
/// dimension is `features.len()` when `features` is set (it may not exceed
/// `ambient_dim`), otherwise `ambient_dim`, overridden to 1 when the block
/// requests `DimensionMode::Single`.
///
/// The returned list always ends with `regularization_bounds`.
pub fn prepare_kernels(
    spec: &mut KernelSpec,
    regularization_bounds: BoundPair,
    eval_gradients: bool,
    ambient_dim: usize,
) -> Result<Vec<BoundPair>, KernelError> {
    let default_bounds = if eval_gradients {
        GRADIENT_BOUNDS
    } else {
        DEFAULT_BOUNDS
    };

    let mut bounds = Vec::new();
    for (name, block) in spec.iter_mut() {
        let dim = resolve_block_dim(name, block, ambient_dim)?;

        if block.scaling.is_some() {
            bounds.push(block.scaling_bounds.unwrap_or(default_bounds));
        }

        setup_block(name, block, dim, default_bounds, eval_gradients, &mut bounds)?;
    }

    bounds.push(regularization_bounds);
    Ok(bounds)
}

fn resolve_block_dim(
    name: &str,
    block: &KernelBlock,
    ambient_dim: usize,
) -> Result<usize, KernelError> {
    let mut dim = ambient_dim;
    if let Some(features) = &block.features {
        if features.len() > ambient_dim {
            return Err(KernelError::TooManyFeatures {
                block: name.to_string(),
                requested: features.len(),
                available: ambient_dim,
            });
        }
        dim = features.len();
    }
    if block.dimension == Some(DimensionMode::Single) {
        dim = 1;
    }
    Ok(dim)
}

fn setup_block(
    name: &str,
    block: &mut KernelBlock,
    dim: usize,
    default_bounds: BoundPair,
    eval_gradients: bool,
    bounds: &mut Vec<BoundPair>,
) -> Result<(), KernelError> {
    // Free parameter count for this block, excluding the scaling slot.
    let free = match &mut block.params {
        KernelParams::Constant { .. } => 1,
        KernelParams::Gaussian { width } => {
            broadcast_param(name, "gaussian", "width", width, dim)?;
            dim
        }
        KernelParams::Laplacian { width } => {
            broadcast_param(name, "laplacian", "width", width, dim)?;
            dim
        }
        KernelParams::ScaledSqe { d_scaling, width } => {
            check_param_dim("scaled_sqe", "d_scaling", d_scaling.len(), dim)?;
            check_param_dim("scaled_sqe", "width", width.len(), dim)?;
            2 * dim
        }
        KernelParams::Quadratic { slope, .. } => {
            broadcast_param(name, "quadratic", "slope", slope, dim)?;
            dim + 1
        }
        // Linear has no free parameters; user kernels manage their own
        // bounds downstream. Neither contributes entries here.
        KernelParams::Linear | KernelParams::User { .. } => return Ok(()),
    };

    match &block.bounds {
        Some(explicit) => {
            if explicit.len() != free {
                return Err(KernelError::BoundsLengthMismatch {
                    block: name.to_string(),
                    needed: free,
                    supplied: explicit.len(),
                });
            }
            if eval_gradients {
                log::warn!(
                    "kernel block '{}' overrides the gradient-safe default bounds",
                    name
                );
            }
            bounds.extend_from_slice(explicit);
        }
        None => bounds.extend(std::iter::repeat(default_bounds).take(free)),
    }
    Ok(())
}

fn broadcast_param(
    name: &str,
    kind: &'static str,
    key: &'static str,
    value: &mut HyperValue,
    dim: usize,
) -> Result<(), KernelError> {
    match value {
        HyperValue::Scalar(v) => {
            log::debug!(
                "broadcasting scalar '{}' of kernel block '{}' across {} dimensions",
                key,
                name,
                dim
            );
            *value = HyperValue::Vector(vec![*v; dim]);
            Ok(())
        }
        HyperValue::Vector(v) => check_param_dim(kind, key, v.len(), dim),
    }
}

fn check_param_dim(
    kind: &'static str,
    key: &'static str,
    len: usize,
    dim: usize,
) -> Result<(), KernelError> {
    if len != dim {
        return Err(KernelError::InvalidValue {
            key: key.to_string(),
            kernel: kind.to_string(),
            expected: "one value per resolved feature dimension",
        });
    }
    Ok(())
}
