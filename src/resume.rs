//! Auto-resume: matching a desired configuration against prior run artifacts
//!
//! A prior run is resumable when its configuration fingerprint equals the
//! desired one and its checkpoint is recent enough. The fingerprint covers
//! every field that affects training semantics and excludes volatile or
//! cosmetic fields (experiment name suffixes, tracking settings, resume
//! fields). Absence of a match is a normal outcome, not an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    AugmentationSpec, CropPartition, DistributedTopology, OptimizerSpec, ResolvedConfig,
};
use crate::error::Result;

/// File name of the per-run resume metadata written by the checkpointer
pub const METADATA_FILE: &str = "metadata.json";

/// Equivalence-preserving summary of a configuration's training-relevant fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFingerprint(String);

/// The fields that participate in the fingerprint
///
/// Field order is fixed and kwargs maps are sorted, so serialization is
/// canonical and equal configurations always produce equal fingerprints.
#[derive(Serialize)]
struct FingerprintFields<'a> {
    method: &'a str,
    seed: u64,
    dataset: &'a str,
    train_path: &'a Path,
    val_path: Option<&'a Path>,
    num_classes: usize,
    augmentations: &'a [AugmentationSpec],
    crops: &'a CropPartition,
    optimizer: &'a OptimizerSpec,
    topology: &'a DistributedTopology,
    method_kwargs: &'a BTreeMap<String, Value>,
}

impl ConfigFingerprint {
    /// Compute the fingerprint of a resolved configuration
    pub fn of(config: &ResolvedConfig) -> Result<Self> {
        let fields = FingerprintFields {
            method: &config.method,
            seed: config.seed,
            dataset: &config.data.dataset,
            train_path: &config.data.train_path,
            val_path: config.data.val_path.as_deref(),
            num_classes: config.data.num_classes,
            augmentations: &config.augmentations,
            crops: &config.crops,
            optimizer: &config.optimizer,
            topology: &config.topology,
            method_kwargs: &config.method_kwargs,
        };
        Ok(Self(serde_json::to_string(&fields)?))
    }

    /// Reconstruct a fingerprint from its stored representation
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Stored representation, as written to resume metadata
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One discovered prior-run artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Run directory holding the checkpoint
    pub path: PathBuf,
    /// Fingerprint of the configuration that produced the run
    pub fingerprint: ConfigFingerprint,
    /// Tracking run id to reattach to, if the run was tracked
    pub run_id: Option<String>,
    /// Last modification time of the resume metadata
    pub mtime: DateTime<Utc>,
}

/// Collaborator that discovers prior-run artifacts
pub trait CheckpointStore {
    /// All readable checkpoint records under `dir`
    ///
    /// Malformed or partially written records are skipped, never reported as
    /// errors; another process may be checkpointing while this scan runs.
    fn list_checkpoint_records(&self, dir: &Path) -> Vec<CheckpointRecord>;
}

/// On-disk schema of the per-run resume metadata
#[derive(Debug, Serialize, Deserialize)]
struct ResumeMetadata {
    fingerprint: String,
    #[serde(default)]
    run_id: Option<String>,
}

/// [`CheckpointStore`] backed by `std::fs`
///
/// Expects one subdirectory per prior run, each holding a
/// [`METADATA_FILE`]; the record mtime is the metadata file's mtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCheckpointStore;

impl FsCheckpointStore {
    fn read_record(run_dir: &Path) -> Option<CheckpointRecord> {
        let metadata_path = run_dir.join(METADATA_FILE);
        let content = std::fs::read_to_string(&metadata_path).ok()?;
        let metadata: ResumeMetadata = serde_json::from_str(&content).ok()?;
        let mtime: DateTime<Utc> = std::fs::metadata(&metadata_path)
            .and_then(|m| m.modified())
            .ok()?
            .into();
        Some(CheckpointRecord {
            path: run_dir.to_path_buf(),
            fingerprint: ConfigFingerprint::from_raw(metadata.fingerprint),
            run_id: metadata.run_id,
            mtime,
        })
    }
}

impl CheckpointStore for FsCheckpointStore {
    fn list_checkpoint_records(&self, dir: &Path) -> Vec<CheckpointRecord> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), %err, "checkpoint root not readable, starting fresh");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let run_dir = entry.path();
            if !run_dir.is_dir() {
                continue;
            }
            match Self::read_record(&run_dir) {
                Some(record) => records.push(record),
                None => {
                    warn!(
                        run_dir = %run_dir.display(),
                        "skipping checkpoint with missing or malformed resume metadata"
                    );
                }
            }
        }
        records
    }
}

/// Find a prior run matching the desired configuration, relative to `now`
///
/// Candidates must share the desired fingerprint and have been written within
/// `max_age_hours` of `now`; among several matches the most recent wins.
/// `None` signals "start fresh".
pub fn find_checkpoint_at(
    store: &dyn CheckpointStore,
    checkpoint_dir: &Path,
    desired: &ConfigFingerprint,
    max_age_hours: f64,
    now: DateTime<Utc>,
) -> Option<(PathBuf, Option<String>)> {
    let max_age = Duration::milliseconds((max_age_hours * 3_600_000.0) as i64);

    let best = store
        .list_checkpoint_records(checkpoint_dir)
        .into_iter()
        .filter(|record| record.fingerprint == *desired && now - record.mtime <= max_age)
        .max_by_key(|record| record.mtime)?;

    debug!(
        path = %best.path.display(),
        run_id = best.run_id.as_deref().unwrap_or("-"),
        "found matching checkpoint to resume from"
    );
    Some((best.path, best.run_id))
}

/// [`find_checkpoint_at`] against the current wall clock
pub fn find_checkpoint(
    store: &dyn CheckpointStore,
    checkpoint_dir: &Path,
    desired: &ConfigFingerprint,
    max_age_hours: f64,
) -> Option<(PathBuf, Option<String>)> {
    find_checkpoint_at(store, checkpoint_dir, desired, max_age_hours, Utc::now())
}
