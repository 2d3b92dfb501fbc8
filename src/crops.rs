//! Partitioning of declared augmentation views into large and small crops

use tracing::warn;

use crate::config::{AugmentationSpec, CropPartition};
use crate::error::{Error, Result};

/// Classify the declared views into large and small crop counts
///
/// The reference "large" size is the crop size of the first spec in
/// declaration order; every spec of that size contributes to
/// `num_large_crops`, everything else to `num_small_crops`. Callers must
/// declare the primary high-resolution view first.
pub fn partition_crops(plan: &[AugmentationSpec]) -> Result<CropPartition> {
    let first = plan.first().ok_or_else(|| {
        Error::invariant_violation("augmentation plan must declare at least one view")
    })?;

    let large_size = first.crop_size;
    if let Some((idx, spec)) = plan
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.crop_size > large_size)
    {
        // The first-declared size wins as "large" even when a later spec is
        // bigger; that is almost always a mis-ordered plan.
        warn!(
            large_size,
            index = idx,
            crop_size = spec.crop_size,
            "augmentations[{idx}] declares a crop larger than the first-declared size; \
             the first-declared size still counts as the large crop"
        );
    }

    let mut partition = CropPartition {
        num_large_crops: 0,
        num_small_crops: 0,
    };
    for (idx, spec) in plan.iter().enumerate() {
        if spec.num_crops == 0 {
            return Err(Error::invariant_violation(format!(
                "augmentations[{idx}] declares num_crops = 0"
            )));
        }
        if spec.crop_size == large_size {
            partition.num_large_crops += spec.num_crops;
        } else {
            partition.num_small_crops += spec.num_crops;
        }
    }

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(crop_size: u32, num_crops: usize) -> AugmentationSpec {
        AugmentationSpec {
            crop_size,
            num_crops,
            recipe: vec![],
        }
    }

    #[test]
    fn test_single_group() {
        let partition = partition_crops(&[spec(224, 2)]).unwrap();
        assert_eq!(partition.num_large_crops, 2);
        assert_eq!(partition.num_small_crops, 0);
    }

    #[test]
    fn test_multicrop_partition() {
        let partition = partition_crops(&[spec(224, 2), spec(96, 6)]).unwrap();
        assert_eq!(partition.num_large_crops, 2);
        assert_eq!(partition.num_small_crops, 6);
    }

    #[test]
    fn test_equal_sizes_all_count_as_large() {
        let partition = partition_crops(&[spec(224, 1), spec(224, 3)]).unwrap();
        assert_eq!(partition.num_large_crops, 4);
        assert_eq!(partition.num_small_crops, 0);
    }

    #[test]
    fn test_first_declared_size_wins_over_bigger_later_size() {
        // Order-dependent tie-break: 96 is declared first, so it is "large"
        let partition = partition_crops(&[spec(96, 4), spec(224, 2)]).unwrap();
        assert_eq!(partition.num_large_crops, 4);
        assert_eq!(partition.num_small_crops, 2);
    }

    #[test]
    fn test_partition_sums_to_total_views() {
        let plan = [spec(224, 2), spec(96, 6), spec(64, 4)];
        let partition = partition_crops(&plan).unwrap();
        let total: usize = plan.iter().map(|s| s.num_crops).sum();
        assert_eq!(partition.num_large_crops + partition.num_small_crops, total);
    }

    #[test]
    fn test_empty_plan_fails() {
        let err = partition_crops(&[]).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_zero_crops_fails() {
        let err = partition_crops(&[spec(224, 2), spec(96, 0)]).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(err.to_string().contains("augmentations[1]"));
    }
}
