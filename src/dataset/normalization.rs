//! Per-dataset channel statistics
//!
//! Statistics are held in a [`NormalizationTable`] that is passed to the
//! dataset façade at construction time. The defaults are the published
//! per-channel mean/std of each supported dataset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::kind::DatasetKind;
use crate::utils::error::{Result, SslDatasetError};

/// Added to the std before inverting so a zero std stays finite
const INVERSE_EPSILON: f32 = 1e-7;

/// Per-channel mean and standard deviation in `[0, 1]` pixel scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl ChannelStats {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { mean, std }
    }

    /// Build from statistics measured on 0-255 pixel values
    pub fn from_pixel_scale(mean: [f64; 3], std: [f64; 3]) -> Self {
        Self {
            mean: mean.map(|m| (m / 255.0) as f32),
            std: std.map(|s| (s / 255.0) as f32),
        }
    }

    /// Identity statistics for data that is already normalized
    pub fn identity() -> Self {
        Self {
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    /// Statistics whose normalization undoes this one:
    /// `std_inv = 1 / (std + eps)`, `mean_inv = -mean * std_inv`
    pub fn inverse(&self) -> Self {
        let mut mean = [0.0f32; 3];
        let mut std = [0.0f32; 3];
        for c in 0..3 {
            std[c] = 1.0 / (self.std[c] + INVERSE_EPSILON);
            mean[c] = -self.mean[c] * std[c];
        }
        Self { mean, std }
    }

    /// Normalize a single channel value
    #[inline]
    pub fn normalize(&self, channel: usize, value: f32) -> f32 {
        (value - self.mean[channel]) / self.std[channel]
    }
}

/// Mapping from dataset kind to its channel statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationTable {
    entries: HashMap<DatasetKind, ChannelStats>,
}

impl NormalizationTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table populated with the published statistics for every supported kind
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.insert(
            DatasetKind::Cifar10,
            ChannelStats::from_pixel_scale([125.3, 123.0, 113.9], [63.0, 62.1, 66.7]),
        );
        table.insert(
            DatasetKind::Cifar100,
            ChannelStats::from_pixel_scale([129.3, 124.1, 112.4], [68.2, 65.4, 70.4]),
        );
        table.insert(
            DatasetKind::Ucm,
            ChannelStats::from_pixel_scale(
                [123.58113728, 125.08415423, 115.0754208],
                [55.40512165, 51.34108472, 49.80905244],
            ),
        );
        table.insert(
            DatasetKind::Aid,
            ChannelStats::from_pixel_scale(
                [100.40901229, 103.34463381, 92.92875687],
                [53.71052739, 47.81369006, 47.19406823],
            ),
        );
        table.insert(
            DatasetKind::EurosatRgb,
            ChannelStats::from_pixel_scale(
                [87.78644464, 96.96653968, 103.99007906],
                [51.92045453, 34.82338243, 29.26981551],
            ),
        );
        table.insert(DatasetKind::EurosatMs, ChannelStats::identity());
        table
    }

    /// Set (or replace) the statistics for a kind
    pub fn insert(&mut self, kind: DatasetKind, stats: ChannelStats) -> Option<ChannelStats> {
        self.entries.insert(kind, stats)
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with(mut self, kind: DatasetKind, stats: ChannelStats) -> Self {
        self.insert(kind, stats);
        self
    }

    /// Look up the statistics for a kind
    pub fn get(&self, kind: DatasetKind) -> Result<ChannelStats> {
        self.entries.get(&kind).copied().ok_or_else(|| {
            SslDatasetError::Config(format!("no normalization statistics for dataset '{}'", kind))
        })
    }

    pub fn contains(&self, kind: DatasetKind) -> bool {
        self.entries.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_kind() {
        let table = NormalizationTable::with_defaults();
        for kind in DatasetKind::ALL {
            assert!(table.contains(kind), "missing stats for {}", kind);
        }
    }

    #[test]
    fn test_cifar10_values() {
        let stats = NormalizationTable::with_defaults().get(DatasetKind::Cifar10).unwrap();
        assert!((stats.mean[0] - 125.3 / 255.0).abs() < 1e-6);
        assert!((stats.std[2] - 66.7 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_eurosat_ms_is_identity() {
        let stats = NormalizationTable::with_defaults().get(DatasetKind::EurosatMs).unwrap();
        assert_eq!(stats, ChannelStats::identity());
    }

    #[test]
    fn test_missing_entry_is_config_error() {
        let table = NormalizationTable::new();
        let err = table.get(DatasetKind::Aid).unwrap_err();
        assert!(matches!(err, SslDatasetError::Config(_)));
    }

    #[test]
    fn test_inverse_undoes_normalization() {
        let stats = ChannelStats::from_pixel_scale([120.0, 110.0, 100.0], [60.0, 50.0, 40.0]);
        let inverse = stats.inverse();
        for c in 0..3 {
            let value = 0.37;
            let restored = inverse.normalize(c, stats.normalize(c, value));
            assert!((restored - value).abs() < 1e-4, "channel {} restored to {}", c, restored);
        }
    }

    #[test]
    fn test_custom_table() {
        let stats = ChannelStats::new([0.5; 3], [0.25; 3]);
        let table = NormalizationTable::new().with(DatasetKind::Ucm, stats);
        assert_eq!(table.get(DatasetKind::Ucm).unwrap(), stats);
        assert!(!table.contains(DatasetKind::Cifar10));
    }
}
