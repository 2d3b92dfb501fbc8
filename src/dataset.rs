//! Dataset class-count resolution

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Datasets accepted by the derivation engine
pub const SUPPORTED_DATASETS: &[&str] = &[
    "cifar10",
    "cifar100",
    "cifar100coarse",
    "stl10",
    "imagenet",
    "imagenet100",
    "custom",
];

static CLASS_COUNTS: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    BTreeMap::from([
        ("cifar10", 10),
        ("cifar100", 100),
        ("cifar100coarse", 20),
        ("stl10", 10),
        ("imagenet", 1000),
        ("imagenet100", 100),
    ])
});

/// Filesystem collaborator used to count label directories
///
/// Injected so that class-count derivation is testable without real
/// directories on disk.
pub trait DirectoryLister {
    /// Names of the immediate subdirectories of `path`
    fn list_subdirectories(&self, path: &Path) -> Result<BTreeSet<String>>;
}

/// [`DirectoryLister`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list_subdirectories(&self, path: &Path) -> Result<BTreeSet<String>> {
        if !path.is_dir() {
            return Err(Error::dataset_path(format!(
                "train path '{}' does not exist or is not a directory",
                path.display()
            )));
        }

        let mut names = BTreeSet::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

/// Compute the number of target classes for a dataset
///
/// Known datasets come from the static table. A custom dataset counts the
/// immediate subdirectories of its train path, with a floor of one so an
/// unlabeled layout never yields a zero-class configuration.
pub fn resolve_num_classes(
    dataset: &str,
    train_path: &Path,
    fs: &dyn DirectoryLister,
) -> Result<usize> {
    if let Some(&count) = CLASS_COUNTS.get(dataset) {
        return Ok(count);
    }
    let subdirs = fs.list_subdirectories(train_path)?;
    Ok(subdirs.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedLister(BTreeSet<String>);

    impl DirectoryLister for FixedLister {
        fn list_subdirectories(&self, _path: &Path) -> Result<BTreeSet<String>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_known_dataset_uses_table() {
        let fs = FixedLister(BTreeSet::new());
        let n = resolve_num_classes("imagenet100", Path::new("/ignored"), &fs).unwrap();
        assert_eq!(n, 100);
    }

    #[test]
    fn test_custom_dataset_counts_subdirectories() {
        let fs = FixedLister(
            ["cat", "dog", "frog"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        let n = resolve_num_classes("custom", Path::new("/data/custom"), &fs).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_unlabeled_custom_dataset_floors_at_one() {
        let fs = FixedLister(BTreeSet::new());
        let n = resolve_num_classes("custom", Path::new("/data/custom"), &fs).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_fs_lister_missing_path_is_dataset_path_error() {
        let missing = PathBuf::from("/definitely/not/a/real/path");
        let err = resolve_num_classes("custom", &missing, &FsLister).unwrap_err();
        assert!(matches!(err, Error::DatasetPath(_)));
    }

    #[test]
    fn test_fs_lister_counts_only_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("class_a"))?;
        std::fs::create_dir(dir.path().join("class_b"))?;
        std::fs::write(dir.path().join("index.txt"), "not a class")?;

        let n = resolve_num_classes("custom", dir.path(), &FsLister)?;
        assert_eq!(n, 2);
        Ok(())
    }
}
