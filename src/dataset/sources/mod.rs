//! On-disk dataset readers
//!
//! Each reader turns a dataset directory into [`RawData`]: decoded RGB images
//! and their integer targets, in a stable order.

pub mod cifar;
pub mod image_folder;

use std::path::Path;

use image::RgbImage;

use crate::dataset::kind::DatasetKind;
use crate::utils::error::Result;

pub use cifar::CifarSource;
pub use image_folder::ImageFolderSource;

/// Decoded images and targets of one dataset partition
#[derive(Debug, Clone)]
pub struct RawData {
    pub images: Vec<RgbImage>,
    pub targets: Vec<usize>,
    /// Class names indexed by label, when the dataset defines them by directory
    pub label_encoding: Option<Vec<String>>,
}

impl RawData {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Sample count per label, sized to the largest label present
    pub fn class_counts(&self) -> Vec<usize> {
        let num_classes = self.targets.iter().max().map(|m| m + 1).unwrap_or(0);
        let mut counts = vec![0usize; num_classes];
        for &label in &self.targets {
            counts[label] += 1;
        }
        counts
    }
}

/// What to load
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub kind: DatasetKind,
    /// Data root; each kind lives under [`DatasetKind::dir_name`]
    pub data_dir: &'a Path,
    /// Training partition when true, test partition otherwise
    pub train: bool,
    /// Seed for datasets without a fixed train/test partition
    pub seed: u64,
}

/// A reader for one or more dataset kinds
pub trait DatasetSource: Send + Sync {
    fn load(&self, request: &LoadRequest<'_>) -> Result<RawData>;
}
