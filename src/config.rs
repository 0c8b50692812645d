//! Experiment configuration
//!
//! An [`SslConfig`] describes which dataset to prepare and how to split it.
//! It can be written to and read from JSON so a run can be reproduced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::augmentation::{RandAugment, MAX_MAGNITUDE};
use crate::dataset::kind::DatasetKind;
use crate::utils::error::{Result, SslDatasetError};

/// Configuration for preparing an SSL dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    /// Dataset to load
    pub dataset: DatasetKind,
    /// Root directory containing the dataset directories
    pub data_dir: PathBuf,
    /// Use the training partition (otherwise the test partition)
    pub train: bool,
    /// Number of classes; defaults to the dataset's own class count
    pub num_classes: Option<usize>,
    /// Random seed for the labeled selection and for partitioning
    pub seed: u64,
    /// Total label budget
    pub num_labels: usize,
    /// Keep labeled samples in the unlabeled pool
    pub include_labeled_in_unlabeled: bool,
    /// Unlabeled items carry a strongly augmented view
    pub use_strong_transform: bool,
    /// Emit one-hot targets
    pub onehot: bool,
    /// Strong augmentation parameters
    pub randaugment: RandAugment,
    /// Previously saved split whose labeled indices should be reused
    pub index_file: Option<PathBuf>,
}

impl Default for SslConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Cifar10,
            data_dir: PathBuf::from("./data"),
            train: true,
            num_classes: None,
            seed: 42,
            num_labels: 40,
            include_labeled_in_unlabeled: true,
            use_strong_transform: true,
            onehot: false,
            randaugment: RandAugment::default(),
            index_file: None,
        }
    }
}

impl SslConfig {
    /// Class count in effect
    pub fn num_classes(&self) -> usize {
        self.num_classes
            .unwrap_or_else(|| self.dataset.default_num_classes())
    }

    /// Check parameters that can be validated without loading data
    pub fn validate(&self) -> Result<()> {
        if self.num_classes() == 0 {
            return Err(SslDatasetError::Config(
                "num_classes must be at least 1".to_string(),
            ));
        }
        if self.num_labels == 0 {
            return Err(SslDatasetError::Config(
                "num_labels must be at least 1".to_string(),
            ));
        }
        if self.randaugment.m > MAX_MAGNITUDE {
            return Err(SslDatasetError::Config(format!(
                "randaugment.m must be at most {}, got {}",
                MAX_MAGNITUDE, self.randaugment.m
            )));
        }
        if self.randaugment.n == 0 && self.use_strong_transform {
            return Err(SslDatasetError::Config(
                "randaugment.n must be at least 1 when strong transforms are enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SslDatasetError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
