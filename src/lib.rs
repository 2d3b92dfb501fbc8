//! Preflight - deterministic configuration derivation for self-supervised pretraining
//!
//! This crate expands a partially specified experiment description into a
//! fully resolved, internally consistent specification: validated dataset
//! settings, derived class counts, a large/small partition of the declared
//! augmentation views, distributed-aware learning rate scaling, completed
//! optimizer kwargs and a reproducible experiment name. It also decides
//! whether a prior run's checkpoint should be resumed.
//!
//! Derivation is a pure function of the raw configuration and the device
//! topology; every process of a distributed run derives an identical
//! [`ResolvedConfig`] from the same input.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod augment;
pub mod config;
pub mod crops;
pub mod dataset;
pub mod error;
pub mod naming;
pub mod normalize;
pub mod optimizer;
pub mod resume;
pub mod scaling;

// Re-exports
pub use augment::{FullTransformPipeline, TransformOp, TransformRegistry};
pub use config::{
    AugmentationSpec, CropPartition, DistributedTopology, OptimizerSpec, RawConfig,
    ResolvedConfig, Setting,
};
pub use dataset::{DirectoryLister, FsLister, SUPPORTED_DATASETS};
pub use error::{Error, Result};
pub use resume::{CheckpointRecord, CheckpointStore, ConfigFingerprint, FsCheckpointStore};
pub use scaling::LrMethod;

use tracing::{debug, info};

/// Derive the fully resolved configuration for one run
///
/// Runs once per process before any training work: normalization, class
/// count resolution, crop partitioning, learning rate scaling, optimizer
/// kwargs completion and name composition, in that order. The filesystem
/// collaborator is only consulted for custom datasets.
pub fn resolve_config(
    raw: RawConfig,
    topology: DistributedTopology,
    fs: &dyn DirectoryLister,
) -> Result<ResolvedConfig> {
    info!("Resolving experiment configuration");

    let raw = normalize::normalize(raw)?;

    let dataset = raw.data.dataset.require("data.dataset")?.clone();
    let train_path = raw.data.train_path.require("data.train_path")?.clone();
    let num_classes = dataset::resolve_num_classes(&dataset, &train_path, fs)?;
    debug!(num_classes, dataset = %dataset, "resolved class count");

    let crops = crops::partition_crops(&raw.augmentations)?;
    debug!(
        num_large_crops = crops.num_large_crops,
        num_small_crops = crops.num_small_crops,
        "partitioned augmentation views"
    );

    let lr_method_name = raw
        .optimizer
        .lr_method
        .require("optimizer.lr_method")?
        .clone();
    let lr_method = scaling::LrMethod::parse(&lr_method_name)?;

    let val_path = raw.data.val_path.clone().into_option();
    // Evaluation needs the classifier rate before any scaling happens
    if val_path.is_some() {
        raw.optimizer.classifier_lr.require("optimizer.classifier_lr")?;
    }

    let base_lr = *raw.optimizer.lr.require("optimizer.lr")?;
    let base_classifier_lr = raw.optimizer.classifier_lr.clone().into_option();
    let factor = scaling::scale_factor(lr_method, &topology);
    let (lr, classifier_lr) = scaling::apply_scale(base_lr, base_classifier_lr, factor);
    debug!(factor, lr, "scaled learning rates");

    let optimizer_name = raw.optimizer.name.require("optimizer.name")?.clone();
    let mut kwargs = raw.optimizer.kwargs.clone();
    optimizer::complete_kwargs(&optimizer_name, &mut kwargs);

    let method = raw.method.require("method")?.clone();
    let base_name = raw.name.require("name")?.clone();
    let name = naming::compose_name(
        &base_name,
        &raw.name_kwargs,
        &naming::NamerInput {
            method: &method,
            batch_size: topology.batch_size,
            method_kwargs: &raw.method_kwargs,
        },
    );
    debug!(name = %name, "composed experiment name");

    let resolved = ResolvedConfig {
        name,
        method,
        seed: raw.seed.into_required("seed")?,
        data: config::DataConfig {
            dataset,
            train_path,
            val_path,
            format: raw.data.format.into_required("data.format")?,
            no_labels: raw.data.no_labels.into_required("data.no_labels")?,
            fraction: raw.data.fraction.into_required("data.fraction")?,
            num_classes,
        },
        optimizer: OptimizerSpec {
            name: optimizer_name,
            lr,
            classifier_lr,
            lr_method: lr_method_name,
            kwargs,
        },
        augmentations: raw.augmentations,
        crops,
        topology,
        wandb: config::WandbConfig {
            enabled: raw.wandb.enabled.into_required("wandb.enabled")?,
            project: raw.wandb.project.into_required("wandb.project")?,
            entity: raw.wandb.entity.into_option(),
            offline: raw.wandb.offline.into_required("wandb.offline")?,
        },
        method_kwargs: raw.method_kwargs,
        debug_augmentations: raw
            .debug_augmentations
            .into_required("debug_augmentations")?,
        resume_from_checkpoint: raw.resume_from_checkpoint.into_option(),
        strategy: raw.strategy.into_option(),
    };

    info!(name = %resolved.name, "experiment configuration resolved");
    Ok(resolved)
}

/// Decide what to resume for a desired configuration
///
/// An explicit `resume_from_checkpoint` in the configuration wins; otherwise
/// the checkpoint root is scanned for a prior run whose fingerprint matches
/// `desired` and whose checkpoint is younger than `max_age_hours`. `None`
/// means start fresh.
pub fn resolve_resume(
    desired: &ResolvedConfig,
    checkpoint_dir: &std::path::Path,
    max_age_hours: f64,
    store: &dyn CheckpointStore,
) -> Result<Option<(std::path::PathBuf, Option<String>)>> {
    if let Some(explicit) = &desired.resume_from_checkpoint {
        debug!(path = %explicit.display(), "resuming from explicitly configured checkpoint");
        return Ok(Some((explicit.clone(), None)));
    }

    let fingerprint = ConfigFingerprint::of(desired)?;
    Ok(resume::find_checkpoint(
        store,
        checkpoint_dir,
        &fingerprint,
        max_age_hours,
    ))
}
