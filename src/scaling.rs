//! Distributed-aware learning rate scaling

use crate::config::DistributedTopology;
use crate::error::{Error, Result};

/// Learning rate scaling method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrMethod {
    /// Linear scaling against a reference batch size of 256
    Linear,
    /// Square root of the total effective batch size
    SquareRoot,
    /// No scaling
    WithoutScaling,
}

impl LrMethod {
    /// Parse a method name from the configuration
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "linear" => Ok(LrMethod::Linear),
            "square_root" => Ok(LrMethod::SquareRoot),
            "without_scaling" => Ok(LrMethod::WithoutScaling),
            other => Err(Error::unsupported_lr_method(other)),
        }
    }
}

/// Compute the scale factor for the given method and topology
pub fn scale_factor(method: LrMethod, topology: &DistributedTopology) -> f64 {
    let effective = topology.effective_batch_size() as f64;
    match method {
        LrMethod::Linear => effective / 256.0,
        LrMethod::SquareRoot => effective.sqrt(),
        LrMethod::WithoutScaling => 1.0,
    }
}

/// Apply one scale factor to the base learning rates
///
/// The factor is computed once by the caller and applied to both rates, so
/// the two can never diverge through recomputation.
pub fn apply_scale(
    base_lr: f64,
    base_classifier_lr: Option<f64>,
    factor: f64,
) -> (f64, Option<f64>) {
    (base_lr * factor, base_classifier_lr.map(|lr| lr * factor))
}
