#![deny(dead_code)]
#![deny(unused_imports)]

//! Covariance kernel specification, normalization, and hyperparameter codec
//! for Gaussian-process-style regression pipelines.
//!
//! The crate owns the data transformation between a structured kernel spec
//! (ordered, heterogeneous blocks) and the flat bounded vector a generic
//! optimizer works on. GP training, prediction, and the optimizer itself live
//! with the caller.

pub mod codec;
pub mod config;
pub mod setup;
pub mod types;

pub use codec::{block_to_theta, spec_to_theta, theta_to_spec};
pub use config::parse_kernel_spec;
pub use setup::{DEFAULT_BOUNDS, GRADIENT_BOUNDS, prepare_kernels};
pub use types::{
    BoundPair, DimensionMode, HyperValue, KernelBlock, KernelError, KernelParams, KernelSpec,
};
