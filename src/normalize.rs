//! Default filling and required-field validation for raw configurations

use crate::config::RawConfig;
use crate::dataset::SUPPORTED_DATASETS;
use crate::error::{Error, Result};

/// Datasets the dali loading format can serve
const DALI_DATASETS: &[&str] = &["imagenet", "imagenet100", "custom"];

/// Fill defaults for every optional field and assert the required ones
///
/// Required: `name`, `method`, `data.dataset` (in the supported set),
/// `data.train_path`, `optimizer.name`, `optimizer.lr`. Defaulting is
/// idempotent; normalizing an already normalized configuration is a no-op.
pub fn normalize(mut raw: RawConfig) -> Result<RawConfig> {
    raw.name.require("name")?;
    raw.method.require("method")?;
    raw.optimizer.name.require("optimizer.name")?;
    raw.optimizer.lr.require("optimizer.lr")?;

    let dataset = raw.data.dataset.require("data.dataset")?;
    if !SUPPORTED_DATASETS.contains(&dataset.as_str()) {
        return Err(Error::config_validation(format!(
            "unsupported dataset '{dataset}', choose from {SUPPORTED_DATASETS:?}"
        )));
    }
    raw.data.train_path.require("data.train_path")?;

    // data.val_path and resume_from_checkpoint intentionally stay Missing
    // when unset: absence is their None default
    raw.data.format = raw.data.format.or_default("image_folder".to_string());
    if let Some(format) = raw.data.format.get() {
        if format == "dali" && !DALI_DATASETS.contains(&dataset.as_str()) {
            return Err(Error::config_validation(format!(
                "data.format 'dali' is only supported for {DALI_DATASETS:?}, not '{dataset}'"
            )));
        }
    }
    raw.data.no_labels = raw.data.no_labels.or_default(false);
    raw.data.fraction = raw.data.fraction.or_default(-1.0);
    raw.debug_augmentations = raw.debug_augmentations.or_default(false);

    raw.wandb.enabled = raw.wandb.enabled.or_default(false);
    raw.wandb.project = raw.wandb.project.or_default("default".to_string());
    raw.wandb.offline = raw.wandb.offline.or_default(false);

    raw.seed = raw.seed.or_default(5);

    raw.optimizer.lr_method = raw.optimizer.lr_method.or_default("linear".to_string());

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Setting;
    use std::path::PathBuf;

    fn minimal_raw() -> RawConfig {
        let mut raw = RawConfig::default();
        raw.name = Setting::Present("pretrain".to_string());
        raw.method = Setting::Present("simclr".to_string());
        raw.data.dataset = Setting::Present("cifar10".to_string());
        raw.data.train_path = Setting::Present(PathBuf::from("/data/cifar10/train"));
        raw.optimizer.name = Setting::Present("lars".to_string());
        raw.optimizer.lr = Setting::Present(0.3);
        raw
    }

    #[test]
    fn test_defaults_filled() {
        let normalized = normalize(minimal_raw()).unwrap();
        assert_eq!(
            normalized.data.format,
            Setting::Defaulted("image_folder".to_string())
        );
        assert_eq!(normalized.data.no_labels, Setting::Defaulted(false));
        assert_eq!(normalized.data.fraction, Setting::Defaulted(-1.0));
        assert_eq!(normalized.seed, Setting::Defaulted(5));
        assert_eq!(normalized.wandb.enabled, Setting::Defaulted(false));
        assert_eq!(
            normalized.wandb.project,
            Setting::Defaulted("default".to_string())
        );
        assert_eq!(
            normalized.optimizer.lr_method,
            Setting::Defaulted("linear".to_string())
        );
        assert!(normalized.data.val_path.is_missing());
        assert!(normalized.resume_from_checkpoint.is_missing());
        assert!(normalized.strategy.is_missing());
    }

    #[test]
    fn test_defaulting_is_idempotent() {
        let once = normalize(minimal_raw()).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_user_values_survive() {
        let mut raw = minimal_raw();
        raw.seed = Setting::Present(42);
        raw.data.format = Setting::Present("dali".to_string());
        let normalized = normalize(raw).unwrap();
        assert_eq!(normalized.seed, Setting::Present(42));
        assert_eq!(normalized.data.format, Setting::Present("dali".to_string()));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut raw = minimal_raw();
        raw.data.train_path = Setting::Missing;
        let err = normalize(raw).unwrap_err();
        assert!(err.to_string().contains("data.train_path"));
    }

    #[test]
    fn test_dali_format_requires_compatible_dataset() {
        let mut raw = minimal_raw();
        raw.data.format = Setting::Present("dali".to_string());
        let err = normalize(raw).unwrap_err();
        assert!(err.to_string().contains("data.format"));

        let mut raw = minimal_raw();
        raw.data.dataset = Setting::Present("imagenet100".to_string());
        raw.data.format = Setting::Present("dali".to_string());
        assert!(normalize(raw).is_ok());
    }

    #[test]
    fn test_unsupported_dataset_fails() {
        let mut raw = minimal_raw();
        raw.data.dataset = Setting::Present("mnist".to_string());
        assert!(normalize(raw).is_err());
    }
}
