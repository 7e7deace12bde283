//! Parsing of loose kernel configuration mappings into the typed spec.
//!
//! Callers that assemble kernel configuration from JSON hand the parsed
//! `serde_json::Value` to [`parse_kernel_spec`]; every recognized kernel type
//! has an explicit key allow-list and any other key in a block is a
//! configuration error.

use serde_json::{Map, Value};

use crate::types::{
    BoundPair, DimensionMode, HyperValue, KernelBlock, KernelError, KernelParams, KernelSpec,
};

const BASE_KEYS: &[&str] = &["type", "operation", "features", "dimension"];
const SCALING_KEYS: &[&str] = &["scaling", "scaling_bounds"];

/// Convert a raw kernel mapping (JSON object of named blocks, in insertion
/// order) into a validated [`KernelSpec`].
///
/// Unknown `type` tags fail with [`KernelError::UnsupportedKernel`]; keys
/// outside the recognized variant's allow-list fail with
/// [`KernelError::UndefinedKey`] naming both the key and the kernel type.
pub fn parse_kernel_spec(raw: &Value) -> Result<KernelSpec, KernelError> {
    let map = raw.as_object().ok_or_else(|| KernelError::InvalidValue {
        key: "kernel".to_string(),
        kernel: "spec".to_string(),
        expected: "a mapping of named kernel blocks",
    })?;

    let mut spec = KernelSpec::new();
    for (name, entry) in map {
        let block = parse_kernel_block(name, entry)?;
        spec.push(name.clone(), block);
    }
    Ok(spec)
}

fn parse_kernel_block(name: &str, entry: &Value) -> Result<KernelBlock, KernelError> {
    let fields = entry.as_object().ok_or_else(|| KernelError::InvalidValue {
        key: name.to_string(),
        kernel: "spec".to_string(),
        expected: "a kernel block mapping",
    })?;

    let ktype = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| KernelError::MissingType(name.to_string()))?;

    let params = match ktype {
        // Constant blocks take no scaling weight of their own.
        "constant" => {
            check_keys(ktype, fields, false, &["const", "bounds"])?;
            KernelParams::Constant {
                value: require_float(ktype, fields, "const")?,
            }
        }
        // Linear blocks have no free parameters, so no bound override either.
        "linear" => {
            check_keys(ktype, fields, true, &[])?;
            KernelParams::Linear
        }
        "gaussian" | "sqe" => {
            check_keys(ktype, fields, true, &["width", "bounds"])?;
            KernelParams::Gaussian {
                width: require_hyper(ktype, fields, "width")?,
            }
        }
        "laplacian" => {
            check_keys(ktype, fields, true, &["width", "bounds"])?;
            KernelParams::Laplacian {
                width: require_hyper(ktype, fields, "width")?,
            }
        }
        "scaled_sqe" => {
            check_keys(ktype, fields, true, &["d_scaling", "width", "bounds"])?;
            KernelParams::ScaledSqe {
                d_scaling: require_float_vec(ktype, fields, "d_scaling")?,
                width: require_float_vec(ktype, fields, "width")?,
            }
        }
        "quadratic" => {
            check_keys(ktype, fields, true, &["slope", "degree", "bounds"])?;
            KernelParams::Quadratic {
                slope: require_hyper(ktype, fields, "slope")?,
                degree: require_float(ktype, fields, "degree")?,
            }
        }
        "user" => {
            check_keys(
                ktype,
                fields,
                true,
                &["hyperparameters", "theta", "constrained", "bounds"],
            )?;
            // 'hyperparameters' takes precedence when both aliases appear.
            let theta = if fields.contains_key("hyperparameters") {
                require_hyper(ktype, fields, "hyperparameters")?
            } else if fields.contains_key("theta") {
                require_hyper(ktype, fields, "theta")?
            } else {
                return Err(KernelError::MissingParameter {
                    key: "hyperparameters".to_string(),
                    kernel: ktype.to_string(),
                });
            };
            let constrained = match fields.get("constrained") {
                Some(v) => Some(float_vec(ktype, "constrained", v)?),
                None => None,
            };
            KernelParams::User { theta, constrained }
        }
        other => return Err(KernelError::UnsupportedKernel(other.to_string())),
    };

    let mut block = KernelBlock::new(params);
    block.operation = match fields.get("operation") {
        Some(v) => Some(
            v.as_str()
                .ok_or(KernelError::InvalidValue {
                    key: "operation".to_string(),
                    kernel: ktype.to_string(),
                    expected: "a string",
                })?
                .to_string(),
        ),
        None => None,
    };
    block.features = match fields.get("features") {
        Some(v) => Some(feature_indices(ktype, v)?),
        None => None,
    };
    block.dimension = match fields.get("dimension") {
        Some(v) => Some(dimension_mode(v)?),
        None => None,
    };
    block.scaling = match fields.get("scaling") {
        Some(v) => Some(v.as_f64().ok_or(KernelError::InvalidValue {
            key: "scaling".to_string(),
            kernel: ktype.to_string(),
            expected: "a float",
        })?),
        None => None,
    };
    block.scaling_bounds = match fields.get("scaling_bounds") {
        Some(v) => Some(bound_pair(ktype, "scaling_bounds", v)?),
        None => None,
    };
    block.bounds = match fields.get("bounds") {
        Some(v) => Some(bound_list(ktype, v)?),
        None => None,
    };
    Ok(block)
}

fn check_keys(
    ktype: &str,
    fields: &Map<String, Value>,
    allow_scaling: bool,
    variant_keys: &[&str],
) -> Result<(), KernelError> {
    for key in fields.keys() {
        let known = BASE_KEYS.contains(&key.as_str())
            || (allow_scaling && SCALING_KEYS.contains(&key.as_str()))
            || variant_keys.contains(&key.as_str());
        if !known {
            return Err(KernelError::UndefinedKey {
                key: key.clone(),
                kernel: ktype.to_string(),
            });
        }
    }
    Ok(())
}

fn require_float(
    ktype: &str,
    fields: &Map<String, Value>,
    key: &str,
) -> Result<f64, KernelError> {
    let v = fields.get(key).ok_or_else(|| KernelError::MissingParameter {
        key: key.to_string(),
        kernel: ktype.to_string(),
    })?;
    v.as_f64().ok_or(KernelError::InvalidValue {
        key: key.to_string(),
        kernel: ktype.to_string(),
        expected: "a float",
    })
}

fn require_hyper(
    ktype: &str,
    fields: &Map<String, Value>,
    key: &str,
) -> Result<HyperValue, KernelError> {
    let v = fields.get(key).ok_or_else(|| KernelError::MissingParameter {
        key: key.to_string(),
        kernel: ktype.to_string(),
    })?;
    if let Some(f) = v.as_f64() {
        return Ok(HyperValue::Scalar(f));
    }
    Ok(HyperValue::Vector(float_vec(ktype, key, v)?))
}

fn require_float_vec(
    ktype: &str,
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Vec<f64>, KernelError> {
    let v = fields.get(key).ok_or_else(|| KernelError::MissingParameter {
        key: key.to_string(),
        kernel: ktype.to_string(),
    })?;
    float_vec(ktype, key, v)
}

fn float_vec(ktype: &str, key: &str, v: &Value) -> Result<Vec<f64>, KernelError> {
    let invalid = || KernelError::InvalidValue {
        key: key.to_string(),
        kernel: ktype.to_string(),
        expected: "a sequence of floats",
    };
    let items = v.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| item.as_f64().ok_or_else(invalid))
        .collect()
}

fn feature_indices(ktype: &str, v: &Value) -> Result<Vec<usize>, KernelError> {
    let invalid = || KernelError::InvalidValue {
        key: "features".to_string(),
        kernel: ktype.to_string(),
        expected: "a sequence of feature indices",
    };
    let items = v.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| item.as_u64().map(|i| i as usize).ok_or_else(invalid))
        .collect()
}

fn dimension_mode(v: &Value) -> Result<DimensionMode, KernelError> {
    match v.as_str() {
        Some("single") => Ok(DimensionMode::Single),
        Some("features") => Ok(DimensionMode::Features),
        Some(other) => Err(KernelError::InvalidDimension(other.to_string())),
        None => Err(KernelError::InvalidDimension(v.to_string())),
    }
}

fn bound_pair(ktype: &str, key: &str, v: &Value) -> Result<BoundPair, KernelError> {
    let invalid = || KernelError::InvalidValue {
        key: key.to_string(),
        kernel: ktype.to_string(),
        expected: "a (lower, upper) pair, with null for an open end",
    };
    let items = v.as_array().ok_or_else(invalid)?;
    if items.len() != 2 {
        return Err(invalid());
    }
    let lower = match &items[0] {
        Value::Null => f64::NEG_INFINITY,
        other => other.as_f64().ok_or_else(invalid)?,
    };
    let upper = match &items[1] {
        Value::Null => f64::INFINITY,
        other => other.as_f64().ok_or_else(invalid)?,
    };
    Ok((lower, upper))
}

fn bound_list(ktype: &str, v: &Value) -> Result<Vec<BoundPair>, KernelError> {
    let items = v.as_array().ok_or(KernelError::InvalidValue {
        key: "bounds".to_string(),
        kernel: ktype.to_string(),
        expected: "a sequence of (lower, upper) pairs",
    })?;
    items
        .iter()
        .map(|item| bound_pair(ktype, "bounds", item))
        .collect()
}
