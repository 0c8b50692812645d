//! Supported dataset kinds
//!
//! Every dataset the crate can prepare is a variant of [`DatasetKind`]. Names
//! coming from the CLI or a config file are parsed into this enum up front, so
//! an unsupported name fails at dispatch time instead of deep inside a loader.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::SslDatasetError;

/// Dataset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// CIFAR-10, 32x32 natural images, 10 classes
    Cifar10,
    /// CIFAR-100, 32x32 natural images, 100 fine classes
    Cifar100,
    /// UC Merced Land Use, 21 aerial scene classes
    Ucm,
    /// Aerial Image Dataset, 30 scene classes
    Aid,
    /// EuroSAT RGB bands, 10 land cover classes
    EurosatRgb,
    /// EuroSAT multispectral export (images are already normalized)
    EurosatMs,
}

impl DatasetKind {
    /// All supported kinds, in registry order
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Cifar10,
        DatasetKind::Cifar100,
        DatasetKind::Ucm,
        DatasetKind::Aid,
        DatasetKind::EurosatRgb,
        DatasetKind::EurosatMs,
    ];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "cifar10",
            DatasetKind::Cifar100 => "cifar100",
            DatasetKind::Ucm => "ucm",
            DatasetKind::Aid => "aid",
            DatasetKind::EurosatRgb => "eurosat_rgb",
            DatasetKind::EurosatMs => "eurosat_ms",
        }
    }

    /// Number of classes the dataset ships with
    pub fn default_num_classes(self) -> usize {
        match self {
            DatasetKind::Cifar10 => 10,
            DatasetKind::Cifar100 => 100,
            DatasetKind::Ucm => 21,
            DatasetKind::Aid => 30,
            DatasetKind::EurosatRgb | DatasetKind::EurosatMs => 10,
        }
    }

    /// Side length images are cropped/resized to
    pub fn crop_size(self) -> u32 {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar100 => 32,
            DatasetKind::Ucm => 256,
            DatasetKind::Aid => 600,
            DatasetKind::EurosatRgb | DatasetKind::EurosatMs => 64,
        }
    }

    /// Whether the dataset comes with a fixed train/test partition.
    /// The others are partitioned with the configured seed.
    pub fn is_presplit(self) -> bool {
        matches!(self, DatasetKind::Cifar10 | DatasetKind::Cifar100)
    }

    /// Directory under the data root holding the dataset files
    pub fn dir_name(self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "cifar-10-batches-bin",
            DatasetKind::Cifar100 => "cifar-100-binary",
            DatasetKind::Ucm => "UCMerced_LandUse/Images",
            DatasetKind::Aid => "AID",
            DatasetKind::EurosatRgb => "EuroSAT",
            DatasetKind::EurosatMs => "EuroSAT_MS",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetKind {
    type Err = SslDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        DatasetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| SslDatasetError::UnsupportedDataset(s.to_string()))
    }
}
