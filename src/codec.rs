//! Bidirectional mapping between a kernel spec and the flat hyperparameter
//! vector consumed by a generic bounded optimizer.
//!
//! The flat layout is fixed by block order: each block contributes its
//! `scaling` slot (when present) followed by its parameter values in a
//! variant-specific sub-order. Decoding consumes exactly the element counts
//! implied by the spec's current parameter lengths, so
//! `theta_to_spec(spec_to_theta(spec), spec)` is an identity on the spec's
//! numeric content.

use ndarray::{Array1, ArrayView1};

use crate::types::{HyperValue, KernelBlock, KernelError, KernelParams, KernelSpec};

/// Flatten one block into its `(scaling_part, theta_part)` segments.
///
/// `width`/`slope` parameters are taken as-is and must already be broadcast
/// vectors (run [`crate::setup::prepare_kernels`] first); an un-broadcast
/// scalar fails with [`KernelError::MissingDimension`]. Only a user kernel's
/// scalar `theta` broadcasts here, against the dimension resolved with the
/// precedence `features.len()` → `ambient_dim` → the value's own length.
pub fn block_to_theta(
    block: &KernelBlock,
    ambient_dim: Option<usize>,
) -> Result<(Vec<f64>, Vec<f64>), KernelError> {
    let scaling_part = match block.scaling {
        Some(s) => vec![s],
        None => Vec::new(),
    };

    let theta_part = match &block.params {
        KernelParams::Gaussian { width } | KernelParams::Laplacian { width } => {
            vector_values(width, "width")?
        }
        KernelParams::ScaledSqe { d_scaling, width } => {
            let mut theta = d_scaling.clone();
            theta.extend_from_slice(width);
            theta
        }
        KernelParams::Quadratic { slope, degree } => {
            let mut theta = vector_values(slope, "slope")?;
            theta.push(*degree);
            theta
        }
        KernelParams::Linear => Vec::new(),
        KernelParams::Constant { value } => vec![*value],
        KernelParams::User { theta, .. } => materialize(block, theta, ambient_dim, "theta")?,
    };

    Ok((scaling_part, theta_part))
}

/// Flatten a whole spec, in block order, into a single optimizer vector.
/// Blocks with no free parameters (linear) contribute zero elements.
pub fn spec_to_theta(
    spec: &KernelSpec,
    ambient_dim: Option<usize>,
) -> Result<Array1<f64>, KernelError> {
    let mut flat = Vec::new();
    for (_, block) in spec.iter() {
        let (scaling_part, theta_part) = block_to_theta(block, ambient_dim)?;
        flat.extend(scaling_part);
        flat.extend(theta_part);
    }
    Ok(Array1::from_vec(flat))
}

/// Write an optimizer vector back into the spec, consuming elements
/// left-to-right in block order with the same per-variant counts used by
/// [`block_to_theta`].
///
/// Trailing unconsumed elements are allowed: the caller may append the
/// external regularization value after the kernel-derived segment, and only
/// the kernel-derived prefix is decoded. A vector shorter than the cumulative
/// consumption fails with [`KernelError::ThetaLengthMismatch`] before the
/// offending block is touched.
pub fn theta_to_spec(
    theta: ArrayView1<'_, f64>,
    spec: &mut KernelSpec,
) -> Result<(), KernelError> {
    let mut cursor = Cursor {
        values: theta,
        pos: 0,
    };

    for (name, block) in spec.iter_mut() {
        // The whole block segment must be available before anything is
        // written, so a short vector cannot leave the block half-updated.
        let scaling_slots = usize::from(block.scaling.is_some());
        let needed = scaling_slots + consumed_len(&block.params)?;
        cursor.ensure(name, needed)?;

        if block.scaling.is_some() {
            block.scaling = Some(cursor.take(name, 1)?[0]);
        }

        match &mut block.params {
            KernelParams::Gaussian { width } | KernelParams::Laplacian { width } => {
                let n = vector_dim(width, "width")?;
                *width = HyperValue::Vector(cursor.take(name, n)?);
            }
            KernelParams::ScaledSqe { d_scaling, width } => {
                let n = width.len();
                let mut taken = cursor.take(name, 2 * n)?;
                *width = taken.split_off(n);
                *d_scaling = taken;
            }
            KernelParams::Quadratic { slope, degree } => {
                let n = vector_dim(slope, "slope")?;
                let slope_values = cursor.take(name, n)?;
                *degree = cursor.take(name, 1)?[0];
                *slope = HyperValue::Vector(slope_values);
            }
            KernelParams::Linear => {}
            KernelParams::Constant { value } => {
                *value = cursor.take(name, 1)?[0];
            }
            KernelParams::User { theta, .. } => {
                let n = vector_dim(theta, "theta")?;
                *theta = HyperValue::Vector(cursor.take(name, n)?);
            }
        }
    }
    Ok(())
}

/// Element count a block's parameters consume from the flat vector,
/// excluding the scaling slot.
fn consumed_len(params: &KernelParams) -> Result<usize, KernelError> {
    match params {
        KernelParams::Gaussian { width } | KernelParams::Laplacian { width } => {
            vector_dim(width, "width")
        }
        KernelParams::ScaledSqe { width, .. } => Ok(2 * width.len()),
        KernelParams::Quadratic { slope, .. } => Ok(vector_dim(slope, "slope")? + 1),
        KernelParams::Linear => Ok(0),
        KernelParams::Constant { .. } => Ok(1),
        KernelParams::User { theta, .. } => vector_dim(theta, "theta"),
    }
}

struct Cursor<'a> {
    values: ArrayView1<'a, f64>,
    pos: usize,
}

impl Cursor<'_> {
    fn ensure(&self, block: &str, n: usize) -> Result<(), KernelError> {
        let available = self.values.len() - self.pos;
        if n > available {
            return Err(KernelError::ThetaLengthMismatch {
                block: block.to_string(),
                needed: n,
                available,
            });
        }
        Ok(())
    }

    fn take(&mut self, block: &str, n: usize) -> Result<Vec<f64>, KernelError> {
        self.ensure(block, n)?;
        let out = self
            .values
            .iter()
            .skip(self.pos)
            .take(n)
            .copied()
            .collect();
        self.pos += n;
        Ok(out)
    }
}

fn vector_dim(value: &HyperValue, key: &'static str) -> Result<usize, KernelError> {
    value.dim().ok_or(KernelError::MissingDimension {
        key: key.to_string(),
    })
}

fn vector_values(value: &HyperValue, key: &'static str) -> Result<Vec<f64>, KernelError> {
    match value {
        HyperValue::Vector(v) => Ok(v.clone()),
        HyperValue::Scalar(_) => Err(KernelError::MissingDimension {
            key: key.to_string(),
        }),
    }
}

fn materialize(
    block: &KernelBlock,
    value: &HyperValue,
    ambient_dim: Option<usize>,
    key: &'static str,
) -> Result<Vec<f64>, KernelError> {
    match value {
        HyperValue::Vector(v) => Ok(v.clone()),
        HyperValue::Scalar(s) => {
            let dim = block
                .features
                .as_ref()
                .map(Vec::len)
                .or(ambient_dim)
                .ok_or(KernelError::MissingDimension {
                    key: key.to_string(),
                })?;
            Ok(vec![*s; dim])
        }
    }
}
