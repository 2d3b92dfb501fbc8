//! Configuration data model for the preflight derivation engine
//!
//! `RawConfig` is the partially specified experiment description handed over
//! by the config-loading collaborator. Optional leaves are modeled with the
//! [`Setting`] sum type so that "required but missing" is an explicit state
//! instead of a runtime attribute lookup. `ResolvedConfig` is the fully
//! derived output; once produced it is treated as read-only for the life of
//! the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// State of a single configuration leaf
///
/// Distinguishes a value supplied by the user, a value filled in by the
/// normalizer, and an absent value. Absence of a required leaf is a
/// validation error at normalization time, never a panic at first read.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    /// Value supplied explicitly in the raw configuration
    Present(T),
    /// Value filled in by the normalizer
    Defaulted(T),
    /// No value available
    Missing,
}

impl<T> Setting<T> {
    /// Borrow the value if one is available
    pub fn get(&self) -> Option<&T> {
        match self {
            Setting::Present(v) | Setting::Defaulted(v) => Some(v),
            Setting::Missing => None,
        }
    }

    /// Consume the setting, returning the value if one is available
    pub fn into_option(self) -> Option<T> {
        match self {
            Setting::Present(v) | Setting::Defaulted(v) => Some(v),
            Setting::Missing => None,
        }
    }

    /// Borrow the value, failing with the offending field path if missing
    pub fn require(&self, path: &str) -> Result<&T> {
        self.get()
            .ok_or_else(|| Error::config_validation(format!("missing required field: {path}")))
    }

    /// Consume the setting, failing with the offending field path if missing
    pub fn into_required(self, path: &str) -> Result<T> {
        self.into_option()
            .ok_or_else(|| Error::config_validation(format!("missing required field: {path}")))
    }

    /// Fill in a default if no value is available
    ///
    /// Idempotent: a `Present` or already `Defaulted` value is kept as-is.
    pub fn or_default(self, value: T) -> Self {
        match self {
            Setting::Missing => Setting::Defaulted(value),
            other => other,
        }
    }

    /// Whether no value is available
    pub fn is_missing(&self) -> bool {
        matches!(self, Setting::Missing)
    }
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Missing
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Absent keys and explicit nulls both map to Missing
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Setting::Present(v),
            None => Setting::Missing,
        })
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Setting::Present(v) | Setting::Defaulted(v) => v.serialize(serializer),
            Setting::Missing => serializer.serialize_none(),
        }
    }
}

/// One named transform operation inside an augmentation recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecipeOp {
    /// Registry key of the operation (e.g. "random_resized_crop")
    pub name: String,
    /// Operation parameters, keyed by parameter name
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// One augmentation view declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationSpec {
    /// Spatial size of the produced views
    pub crop_size: u32,
    /// Number of views drawn from this recipe per source image
    pub num_crops: usize,
    /// Ordered transform recipe for this view group
    #[serde(default)]
    pub recipe: Vec<TransformRecipeOp>,
}

/// Counts of large and small crops derived from the declared views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropPartition {
    /// Views sharing the first-declared crop size
    pub num_large_crops: usize,
    /// Views of any other size
    pub num_small_crops: usize,
}

/// Device and node topology of the distributed run
///
/// Read-only input to learning rate scaling; never mutated by derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedTopology {
    /// Per-device batch size
    pub batch_size: usize,
    /// Number of devices per node
    pub num_devices: usize,
    /// Number of nodes
    pub num_nodes: usize,
}

impl DistributedTopology {
    /// Total effective batch size across all devices and nodes
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size * self.num_devices * self.num_nodes
    }
}

/// Suffix flags consumed by the experiment namer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameFlags {
    /// Append the method name
    pub add_method: bool,
    /// Append the per-device batch size
    pub add_batch_size: bool,
    /// Append the auxiliary loss weight
    pub add_weight: bool,
    /// Append the contrastive temperature
    pub add_temperature: bool,
    /// Append the logit bias
    pub add_bias: bool,
    /// Append the predictor hidden dimension
    pub add_pred_hidden_dim: bool,
    /// Append the similarity loss weight
    pub add_sim_loss_weight: bool,
    /// Append the variance loss weight
    pub add_var_loss_weight: bool,
    /// Append the covariance loss weight
    pub add_cov_loss_weight: bool,
}

/// Raw dataset section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDataSection {
    /// Dataset name; must be in the supported set
    pub dataset: Setting<String>,
    /// Training data root
    pub train_path: Setting<PathBuf>,
    /// Validation data root; absence means evaluation is skipped
    pub val_path: Setting<PathBuf>,
    /// On-disk data format
    pub format: Setting<String>,
    /// Treat the custom dataset as unlabeled
    pub no_labels: Setting<bool>,
    /// Fraction of the dataset to use; negative means all
    pub fraction: Setting<f64>,
}

/// Raw optimizer section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptimizerSection {
    /// Optimizer family name (sgd, lars, adamw, ...)
    pub name: Setting<String>,
    /// Base learning rate, before topology scaling
    pub lr: Setting<f64>,
    /// Base classifier learning rate; required when a validation path is set
    pub classifier_lr: Setting<f64>,
    /// Learning rate scaling method
    pub lr_method: Setting<String>,
    /// Optimizer-specific keyword arguments
    pub kwargs: BTreeMap<String, Value>,
}

/// Raw experiment-tracking section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWandbSection {
    /// Enable experiment tracking
    pub enabled: Setting<bool>,
    /// Tracking project name
    pub project: Setting<String>,
    /// Tracking entity (team or user)
    pub entity: Setting<String>,
    /// Run tracking offline
    pub offline: Setting<bool>,
}

/// Partially specified experiment description
///
/// Produced once per process start by the external config-loading
/// collaborator; this crate only consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Base experiment name
    pub name: Setting<String>,
    /// Self-supervised method name
    pub method: Setting<String>,
    /// Dataset settings
    pub data: RawDataSection,
    /// Optimizer settings
    pub optimizer: RawOptimizerSection,
    /// Declared augmentation views, primary high-resolution view first
    pub augmentations: Vec<AugmentationSpec>,
    /// Experiment-tracking settings
    pub wandb: RawWandbSection,
    /// Experiment name suffix flags
    pub name_kwargs: NameFlags,
    /// Method-specific hyperparameters
    pub method_kwargs: BTreeMap<String, Value>,
    /// Global random seed
    pub seed: Setting<u64>,
    /// Print the composed augmentation pipeline at startup
    pub debug_augmentations: Setting<bool>,
    /// Explicit checkpoint to resume from; overrides auto-resume
    pub resume_from_checkpoint: Setting<PathBuf>,
    /// Distributed strategy hint passed through to the runtime
    pub strategy: Setting<String>,
}

impl RawConfig {
    /// Load a raw configuration from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;

        let config = if path.as_ref().extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        Ok(config)
    }
}

/// Resolved dataset settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset name
    pub dataset: String,
    /// Training data root
    pub train_path: PathBuf,
    /// Validation data root, if evaluation is enabled
    pub val_path: Option<PathBuf>,
    /// On-disk data format
    pub format: String,
    /// Treat the custom dataset as unlabeled
    pub no_labels: bool,
    /// Fraction of the dataset to use; negative means all
    pub fraction: f64,
    /// Number of target classes, looked up or counted
    pub num_classes: usize,
}

/// Resolved optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSpec {
    /// Optimizer family name
    pub name: String,
    /// Scaled learning rate
    pub lr: f64,
    /// Scaled classifier learning rate, when evaluation is enabled
    pub classifier_lr: Option<f64>,
    /// Learning rate scaling method that was applied
    pub lr_method: String,
    /// Completed optimizer keyword arguments
    pub kwargs: BTreeMap<String, Value>,
}

/// Resolved experiment-tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WandbConfig {
    /// Enable experiment tracking
    pub enabled: bool,
    /// Tracking project name
    pub project: String,
    /// Tracking entity (team or user)
    pub entity: Option<String>,
    /// Run tracking offline
    pub offline: bool,
}

/// Fully derived, internally consistent experiment specification
///
/// Immutable once produced; every process of a distributed run derives an
/// identical value from the same raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Composed experiment name, suffixes included
    pub name: String,
    /// Self-supervised method name
    pub method: String,
    /// Global random seed
    pub seed: u64,
    /// Dataset settings with the derived class count
    pub data: DataConfig,
    /// Optimizer settings with scaled rates and completed kwargs
    pub optimizer: OptimizerSpec,
    /// Declared augmentation views
    pub augmentations: Vec<AugmentationSpec>,
    /// Large/small crop partition of the declared views
    pub crops: CropPartition,
    /// Topology the learning rates were scaled for
    pub topology: DistributedTopology,
    /// Experiment-tracking settings
    pub wandb: WandbConfig,
    /// Method-specific hyperparameters
    pub method_kwargs: BTreeMap<String, Value>,
    /// Print the composed augmentation pipeline at startup
    pub debug_augmentations: bool,
    /// Explicit checkpoint to resume from
    pub resume_from_checkpoint: Option<PathBuf>,
    /// Distributed strategy hint
    pub strategy: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_absent_and_null_are_missing() {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Probe {
            a: Setting<u32>,
            b: Setting<u32>,
            c: Setting<u32>,
        }

        let probe: Probe = serde_json::from_str(r#"{"a": 3, "b": null}"#).unwrap();
        assert_eq!(probe.a, Setting::Present(3));
        assert!(probe.b.is_missing());
        assert!(probe.c.is_missing());
    }

    #[test]
    fn test_setting_require_names_field_path() {
        let missing: Setting<String> = Setting::Missing;
        let err = missing.require("data.train_path").unwrap_err();
        assert!(err.to_string().contains("data.train_path"));
    }

    #[test]
    fn test_setting_or_default_keeps_present() {
        let present = Setting::Present(7).or_default(1);
        assert_eq!(present, Setting::Present(7));

        let defaulted = Setting::Missing.or_default(1);
        assert_eq!(defaulted, Setting::Defaulted(1));
        // A second pass must not change the provenance or the value
        assert_eq!(defaulted.or_default(9), Setting::Defaulted(1));
    }

    #[test]
    fn test_raw_config_from_yaml() {
        let yaml = r#"
name: pretrain
method: simclr
data:
  dataset: cifar10
  train_path: /data/cifar10/train
optimizer:
  name: lars
  lr: 0.3
augmentations:
  - crop_size: 32
    num_crops: 2
"#;
        let raw: RawConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(raw.name, Setting::Present("pretrain".to_string()));
        assert_eq!(raw.augmentations.len(), 1);
        assert!(raw.data.val_path.is_missing());
        assert!(raw.optimizer.kwargs.is_empty());
    }
}
