//! Balanced labeled/unlabeled split for semi-supervised learning
//!
//! Given a fully labeled collection and a label budget, the splitter keeps the
//! labels of a class-balanced subset and treats the rest as unlabeled.
//!
//! ## Per-class quota
//!
//! Every class receives `num_labels / num_classes` labeled samples. When the
//! budget is not divisible by the class count, the remainder is handed out one
//! sample each to the lowest class indices: with 15 labels over 10 classes,
//! classes 0-4 get 2 samples and classes 5-9 get 1. The labeled set therefore
//! always holds exactly `num_labels` samples.
//!
//! ## Reproducibility
//!
//! Sampling uses a `ChaCha8Rng` seeded from the configured seed, and classes
//! are visited in ascending order, so the same seed and inputs always produce
//! the same labeled indices. A previously saved split can be replayed exactly
//! by passing its labeled indices as `explicit_indices`.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::utils::error::{Result, SslDatasetError};

/// Labeled quota for `class` under the first-classes-get-the-remainder rule
pub fn class_quota(class: usize, num_labels: usize, num_classes: usize) -> usize {
    let base = num_labels / num_classes;
    let remainder = num_labels % num_classes;
    if class < remainder {
        base + 1
    } else {
        base
    }
}

/// Index selection produced by the splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslSplit {
    /// Indices whose labels are used for the supervised loss
    pub labeled_indices: Vec<usize>,
    /// Indices consumed by the unlabeled objective
    pub unlabeled_indices: Vec<usize>,
    /// Size of the collection the indices refer to
    pub total_samples: usize,
    pub num_classes: usize,
    /// Seed used for sampling (`None` when explicit indices were supplied)
    pub seed: Option<u64>,
    /// Whether labeled samples are also part of the unlabeled pool
    pub include_labeled_in_unlabeled: bool,
}

impl SslSplit {
    /// Number of labeled indices per class
    pub fn labeled_class_counts(&self, targets: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes];
        for &idx in &self.labeled_indices {
            if let Some(&label) = targets.get(idx) {
                if label < self.num_classes {
                    counts[label] += 1;
                }
            }
        }
        counts
    }

    /// Summary statistics for reporting
    pub fn stats(&self, targets: &[usize]) -> SplitStats {
        SplitStats {
            total_samples: self.total_samples,
            num_classes: self.num_classes,
            labeled: self.labeled_indices.len(),
            unlabeled: self.unlabeled_indices.len(),
            labeled_per_class: self.labeled_class_counts(targets),
            include_labeled_in_unlabeled: self.include_labeled_in_unlabeled,
        }
    }

    /// Save the split to a JSON file so it can be replayed later
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a split from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SslDatasetError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Statistics about a split
#[derive(Debug, Clone)]
pub struct SplitStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub labeled: usize,
    pub unlabeled: usize,
    pub labeled_per_class: Vec<usize>,
    pub include_labeled_in_unlabeled: bool,
}

impl std::fmt::Display for SplitStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SSL Split Statistics:")?;
        writeln!(f, "  Total samples: {}", self.total_samples)?;
        writeln!(f, "  Number of classes: {}", self.num_classes)?;
        writeln!(f, "  Labeled: {}", self.labeled)?;
        writeln!(
            f,
            "  Unlabeled: {} ({})",
            self.unlabeled,
            if self.include_labeled_in_unlabeled {
                "includes labeled"
            } else {
                "labeled excluded"
            }
        )?;
        let min = self.labeled_per_class.iter().min().copied().unwrap_or(0);
        let max = self.labeled_per_class.iter().max().copied().unwrap_or(0);
        writeln!(f, "  Labeled per class: {}..={}", min, max)?;
        Ok(())
    }
}

/// Data and targets partitioned by [`split_ssl_data`]
#[derive(Debug, Clone)]
pub struct SslSplitData<T> {
    pub labeled_data: Vec<T>,
    pub labeled_targets: Vec<usize>,
    pub unlabeled_data: Vec<T>,
    pub unlabeled_targets: Vec<usize>,
    /// Index selection the data was gathered from
    pub split: SslSplit,
}

/// Compute the labeled/unlabeled index selection over `targets`.
///
/// With `explicit_indices` the given indices become the labeled set verbatim
/// and `seed` is ignored. Otherwise each class in ascending order contributes
/// [`class_quota`] indices sampled without replacement.
pub fn split_ssl_indices(
    targets: &[usize],
    num_labels: usize,
    num_classes: usize,
    explicit_indices: Option<&[usize]>,
    include_labeled_in_unlabeled: bool,
    seed: u64,
) -> Result<SslSplit> {
    let total = targets.len();

    if num_classes == 0 {
        return Err(SslDatasetError::Config(
            "num_classes must be at least 1".to_string(),
        ));
    }
    if num_labels == 0 || num_labels > total {
        return Err(SslDatasetError::Config(format!(
            "num_labels must be between 1 and {} (collection size), got {}",
            total, num_labels
        )));
    }
    if let Some((idx, &label)) = targets.iter().enumerate().find(|(_, &t)| t >= num_classes) {
        return Err(SslDatasetError::Validation(format!(
            "target {} at index {} is outside [0, {})",
            label, idx, num_classes
        )));
    }

    let (labeled_indices, used_seed) = match explicit_indices {
        Some(indices) => {
            validate_explicit_indices(indices, num_labels, total)?;
            debug!("Using {} explicit labeled indices", indices.len());
            (indices.to_vec(), None)
        }
        None => (sample_balanced(targets, num_labels, num_classes, seed)?, Some(seed)),
    };

    let unlabeled_indices = if include_labeled_in_unlabeled {
        (0..total).collect()
    } else {
        let labeled: HashSet<usize> = labeled_indices.iter().copied().collect();
        (0..total).filter(|idx| !labeled.contains(idx)).collect::<Vec<_>>()
    };

    info!(
        "SSL split: {} labeled, {} unlabeled out of {} samples",
        labeled_indices.len(),
        unlabeled_indices.len(),
        total
    );

    Ok(SslSplit {
        labeled_indices,
        unlabeled_indices,
        total_samples: total,
        num_classes,
        seed: used_seed,
        include_labeled_in_unlabeled,
    })
}

/// Split `data`/`targets` into labeled and unlabeled parts.
///
/// `data` and `targets` are parallel sequences; neither is modified. See
/// [`split_ssl_indices`] for the selection rules.
pub fn split_ssl_data<T: Clone>(
    data: &[T],
    targets: &[usize],
    num_labels: usize,
    num_classes: usize,
    explicit_indices: Option<&[usize]>,
    include_labeled_in_unlabeled: bool,
    seed: u64,
) -> Result<SslSplitData<T>> {
    if data.len() != targets.len() {
        return Err(SslDatasetError::Validation(format!(
            "data has {} samples but targets has {}",
            data.len(),
            targets.len()
        )));
    }

    let split = split_ssl_indices(
        targets,
        num_labels,
        num_classes,
        explicit_indices,
        include_labeled_in_unlabeled,
        seed,
    )?;

    let gather = |indices: &[usize]| -> (Vec<T>, Vec<usize>) {
        indices
            .iter()
            .map(|&idx| (data[idx].clone(), targets[idx]))
            .unzip()
    };
    let (labeled_data, labeled_targets) = gather(&split.labeled_indices);
    let (unlabeled_data, unlabeled_targets) = gather(&split.unlabeled_indices);

    Ok(SslSplitData {
        labeled_data,
        labeled_targets,
        unlabeled_data,
        unlabeled_targets,
        split,
    })
}

fn validate_explicit_indices(indices: &[usize], num_labels: usize, total: usize) -> Result<()> {
    if indices.len() != num_labels {
        return Err(SslDatasetError::Validation(format!(
            "explicit index list has {} entries but num_labels is {}",
            indices.len(),
            num_labels
        )));
    }
    let mut seen = HashSet::with_capacity(indices.len());
    for &idx in indices {
        if idx >= total {
            return Err(SslDatasetError::Validation(format!(
                "explicit index {} is out of range for {} samples",
                idx, total
            )));
        }
        if !seen.insert(idx) {
            return Err(SslDatasetError::Validation(format!(
                "explicit index {} appears more than once",
                idx
            )));
        }
    }
    Ok(())
}

fn sample_balanced(
    targets: &[usize],
    num_labels: usize,
    num_classes: usize,
    seed: u64,
) -> Result<Vec<usize>> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
    for (idx, &label) in targets.iter().enumerate() {
        by_class[label].push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut labeled = Vec::with_capacity(num_labels);

    for (class, candidates) in by_class.iter().enumerate() {
        let quota = class_quota(class, num_labels, num_classes);
        if candidates.len() < quota {
            return Err(SslDatasetError::InsufficientSamples {
                class,
                available: candidates.len(),
                required: quota,
            });
        }
        debug!("Class {}: sampling {} of {}", class, quota, candidates.len());
        labeled.extend(
            sample(&mut rng, candidates.len(), quota)
                .into_iter()
                .map(|pos| candidates[pos]),
        );
    }

    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `per_class` samples for each of `num_classes`, interleaved by class
    fn balanced_targets(num_classes: usize, per_class: usize) -> Vec<usize> {
        (0..num_classes * per_class).map(|i| i % num_classes).collect()
    }

    #[test]
    fn test_two_per_class_exclusive() {
        let targets = balanced_targets(10, 10);
        let split = split_ssl_indices(&targets, 20, 10, None, false, 0).unwrap();

        assert_eq!(split.labeled_indices.len(), 20);
        assert_eq!(split.labeled_class_counts(&targets), vec![2; 10]);
        assert_eq!(split.unlabeled_indices.len(), 80);
    }

    #[test]
    fn test_divisible_budgets_are_balanced() {
        for &(classes, per_class, labels) in &[(2, 50, 10), (5, 20, 25), (10, 7, 70), (3, 4, 3)] {
            let targets = balanced_targets(classes, per_class);
            let split = split_ssl_indices(&targets, labels, classes, None, false, 7).unwrap();
            assert_eq!(split.labeled_indices.len(), labels);
            assert_eq!(split.labeled_class_counts(&targets), vec![labels / classes; classes]);
        }
    }

    #[test]
    fn test_remainder_goes_to_first_classes() {
        let targets = balanced_targets(10, 10);
        let split = split_ssl_indices(&targets, 15, 10, None, false, 3).unwrap();

        assert_eq!(split.labeled_indices.len(), 15);
        assert_eq!(
            split.labeled_class_counts(&targets),
            vec![2, 2, 2, 2, 2, 1, 1, 1, 1, 1]
        );
        assert_eq!(split.unlabeled_indices.len(), 85);
    }

    #[test]
    fn test_class_quota() {
        assert_eq!(class_quota(0, 15, 10), 2);
        assert_eq!(class_quota(4, 15, 10), 2);
        assert_eq!(class_quota(5, 15, 10), 1);
        assert_eq!(class_quota(9, 40, 10), 4);
        assert_eq!(class_quota(2, 2, 3), 0);
    }

    #[test]
    fn test_exclusive_mode_is_disjoint_complement() {
        let targets = balanced_targets(4, 25);
        let split = split_ssl_indices(&targets, 12, 4, None, false, 11).unwrap();

        let labeled: HashSet<_> = split.labeled_indices.iter().copied().collect();
        assert!(split.unlabeled_indices.iter().all(|idx| !labeled.contains(idx)));
        assert_eq!(labeled.len() + split.unlabeled_indices.len(), targets.len());
        assert!(split.unlabeled_indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_inclusive_mode_keeps_full_collection() {
        let targets = balanced_targets(4, 25);
        let split = split_ssl_indices(&targets, 12, 4, None, true, 11).unwrap();

        assert_eq!(split.unlabeled_indices, (0..100).collect::<Vec<_>>());
        assert_eq!(split.labeled_indices.len(), 12);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let targets = balanced_targets(10, 30);
        let a = split_ssl_indices(&targets, 40, 10, None, false, 42).unwrap();
        let b = split_ssl_indices(&targets, 40, 10, None, false, 42).unwrap();
        assert_eq!(a.labeled_indices, b.labeled_indices);
        assert_eq!(a.seed, Some(42));
    }

    #[test]
    fn test_different_seed_changes_selection() {
        let targets = balanced_targets(10, 100);
        let a = split_ssl_indices(&targets, 40, 10, None, false, 1).unwrap();
        let b = split_ssl_indices(&targets, 40, 10, None, false, 2).unwrap();
        assert_ne!(a.labeled_indices, b.labeled_indices);
    }

    #[test]
    fn test_labeled_indices_match_their_class() {
        let targets = balanced_targets(5, 20);
        let split = split_ssl_indices(&targets, 10, 5, None, false, 5).unwrap();
        // Classes are visited in order, two indices each
        for (pos, &idx) in split.labeled_indices.iter().enumerate() {
            assert_eq!(targets[idx], pos / 2);
        }
    }

    #[test]
    fn test_explicit_indices_ignore_seed() {
        let targets = balanced_targets(3, 10);
        let explicit = vec![9, 0, 4, 17];
        let a = split_ssl_indices(&targets, 4, 3, Some(&explicit), false, 1).unwrap();
        let b = split_ssl_indices(&targets, 4, 3, Some(&explicit), false, 999).unwrap();

        assert_eq!(a.labeled_indices, explicit);
        assert_eq!(b.labeled_indices, explicit);
        assert_eq!(a.seed, None);
        assert_eq!(a.unlabeled_indices.len(), 26);
    }

    #[test]
    fn test_explicit_length_mismatch() {
        let targets = balanced_targets(3, 10);
        let err = split_ssl_indices(&targets, 5, 3, Some(&[0, 1, 2]), false, 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));
    }

    #[test]
    fn test_explicit_out_of_range_and_duplicates() {
        let targets = balanced_targets(3, 10);
        let err = split_ssl_indices(&targets, 2, 3, Some(&[0, 30]), false, 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));

        let err = split_ssl_indices(&targets, 2, 3, Some(&[4, 4]), false, 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));
    }

    #[test]
    fn test_insufficient_samples() {
        // Class 2 only has a single sample
        let targets = vec![0, 0, 0, 1, 1, 1, 2];
        let err = split_ssl_indices(&targets, 6, 3, None, false, 0).unwrap_err();
        match err {
            SslDatasetError::InsufficientSamples {
                class,
                available,
                required,
            } => {
                assert_eq!(class, 2);
                assert_eq!(available, 1);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let targets = balanced_targets(2, 5);
        assert!(matches!(
            split_ssl_indices(&targets, 0, 2, None, true, 0),
            Err(SslDatasetError::Config(_))
        ));
        assert!(matches!(
            split_ssl_indices(&targets, 11, 2, None, true, 0),
            Err(SslDatasetError::Config(_))
        ));
        assert!(matches!(
            split_ssl_indices(&targets, 4, 0, None, true, 0),
            Err(SslDatasetError::Config(_))
        ));
    }

    #[test]
    fn test_target_out_of_range() {
        let targets = vec![0, 1, 5];
        let err = split_ssl_indices(&targets, 2, 2, None, true, 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));
    }

    #[test]
    fn test_split_data_gathers_parallel_sequences() {
        let targets = balanced_targets(4, 5);
        let data: Vec<String> = (0..targets.len()).map(|i| format!("img_{}", i)).collect();

        let parts = split_ssl_data(&data, &targets, 8, 4, None, false, 21).unwrap();

        assert_eq!(parts.labeled_data.len(), 8);
        assert_eq!(parts.unlabeled_data.len(), 12);
        for (item, (&idx, &target)) in parts
            .labeled_data
            .iter()
            .zip(parts.split.labeled_indices.iter().zip(&parts.labeled_targets))
        {
            assert_eq!(item, &format!("img_{}", idx));
            assert_eq!(target, targets[idx]);
        }
        // Inputs stay untouched
        assert_eq!(data.len(), 20);
    }

    #[test]
    fn test_split_data_inclusive_returns_everything() {
        let targets = balanced_targets(2, 4);
        let data: Vec<u8> = (0..8).collect();
        let parts = split_ssl_data(&data, &targets, 2, 2, None, true, 0).unwrap();
        assert_eq!(parts.unlabeled_data, data);
        assert_eq!(parts.unlabeled_targets, targets);
    }

    #[test]
    fn test_split_data_length_mismatch() {
        let err = split_ssl_data(&[1u8, 2, 3], &[0, 1], 1, 2, None, true, 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("split.json");
        let targets = balanced_targets(3, 6);
        let split = split_ssl_indices(&targets, 6, 3, None, false, 8).unwrap();

        split.save(&path).unwrap();
        let loaded = SslSplit::load(&path).unwrap();
        assert_eq!(loaded, split);

        let replay =
            split_ssl_indices(&targets, 6, 3, Some(&loaded.labeled_indices), false, 0).unwrap();
        assert_eq!(replay.labeled_indices, split.labeled_indices);
        assert_eq!(replay.unlabeled_indices, split.unlabeled_indices);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SslSplit::load(Path::new("/nonexistent/split.json")).unwrap_err();
        assert!(matches!(err, SslDatasetError::PathNotFound(_)));
    }

    #[test]
    fn test_stats_display() {
        let targets = balanced_targets(10, 10);
        let split = split_ssl_indices(&targets, 15, 10, None, false, 3).unwrap();
        let report = split.stats(&targets).to_string();
        assert!(report.contains("Labeled: 15"));
        assert!(report.contains("Labeled per class: 1..=2"));
    }
}
