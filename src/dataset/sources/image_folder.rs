//! Class-per-directory image datasets (UCM, AID, EuroSAT)
//!
//! The dataset directory is structured as:
//! ```text
//! root/
//! ├── agricultural/
//! │   ├── agricultural00.tif
//! │   └── ...
//! ├── airplane/
//! │   └── ...
//! └── ...
//! ```
//!
//! Sorted directory names define the label indices. These datasets have no
//! published train/test partition, so each class is shuffled with the
//! configured seed and its first `train_fraction` goes to the training
//! partition.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dataset::sources::{DatasetSource, LoadRequest, RawData};
use crate::utils::error::{Result, ResultExt, SslDatasetError};

/// Extensions accepted as images
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Default share of each class assigned to the training partition
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// A discovered image file and its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSample {
    pub path: PathBuf,
    pub label: usize,
}

/// Reader for class-per-directory datasets
#[derive(Debug, Clone, Copy)]
pub struct ImageFolderSource {
    pub train_fraction: f64,
}

impl Default for ImageFolderSource {
    fn default() -> Self {
        Self {
            train_fraction: DEFAULT_TRAIN_FRACTION,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Discover class directories and their image files, both in sorted order
pub fn scan_classes(root: &Path) -> Result<(Vec<String>, Vec<FolderSample>)> {
    if !root.exists() {
        return Err(SslDatasetError::PathNotFound(root.to_path_buf()));
    }

    let mut class_names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(root)
        .with_context(|| format!("failed to list class directories in {:?}", root))?
    {
        let entry = entry.context("failed to read directory entry")?;
        if entry.file_type().context("failed to stat directory entry")?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                class_names.push(name.to_string());
            }
        }
    }
    class_names.sort();

    if class_names.is_empty() {
        return Err(SslDatasetError::Dataset(format!(
            "no class directories found in {:?}",
            root
        )));
    }

    let mut samples = Vec::new();
    for (label, class_name) in class_names.iter().enumerate() {
        let before = samples.len();
        for entry in WalkDir::new(root.join(class_name))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("failed to scan class '{}'", class_name))?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                samples.push(FolderSample {
                    path: entry.into_path(),
                    label,
                });
            }
        }
        debug!(
            "Class '{}' (label {}): {} images",
            class_name,
            label,
            samples.len() - before
        );
    }

    Ok((class_names, samples))
}

/// Seeded per-class partition of `samples` into (train, test)
pub fn partition(
    samples: &[FolderSample],
    num_classes: usize,
    train_fraction: f64,
    seed: u64,
) -> (Vec<FolderSample>, Vec<FolderSample>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..num_classes {
        let mut class_samples: Vec<&FolderSample> =
            samples.iter().filter(|s| s.label == class).collect();
        class_samples.shuffle(&mut rng);

        let n_train = (class_samples.len() as f64 * train_fraction).round() as usize;
        let (class_train, class_test) = class_samples.split_at(n_train.min(class_samples.len()));
        train.extend(class_train.iter().map(|s| (*s).clone()));
        test.extend(class_test.iter().map(|s| (*s).clone()));
    }

    (train, test)
}

/// Decode and resize images in parallel, keeping input order
pub fn decode_all(samples: &[FolderSample], size: u32) -> Result<Vec<RgbImage>> {
    let pb = ProgressBar::new(samples.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let images = samples
        .par_iter()
        .map(|sample| {
            let image = ImageReader::open(&sample.path)
                .map_err(|e| SslDatasetError::ImageLoad(sample.path.clone(), e.to_string()))?
                .decode()
                .map_err(|e| SslDatasetError::ImageLoad(sample.path.clone(), e.to_string()))?
                .resize_exact(size, size, FilterType::Triangle)
                .to_rgb8();
            pb.inc(1);
            Ok(image)
        })
        .collect::<Result<Vec<_>>>();

    pb.finish_and_clear();
    images
}

impl DatasetSource for ImageFolderSource {
    fn load(&self, request: &LoadRequest<'_>) -> Result<RawData> {
        if !(0.0..=1.0).contains(&self.train_fraction) {
            return Err(SslDatasetError::Config(format!(
                "train fraction must be between 0.0 and 1.0, got {}",
                self.train_fraction
            )));
        }

        let root = request.data_dir.join(request.kind.dir_name());
        info!("Loading {} from {:?}", request.kind, root);

        let (class_names, samples) = scan_classes(&root)?;
        let (train, test) = partition(&samples, class_names.len(), self.train_fraction, request.seed);
        let selected = if request.train { train } else { test };

        info!(
            "Found {} classes, {} images; decoding {} {} images",
            class_names.len(),
            samples.len(),
            selected.len(),
            if request.train { "train" } else { "test" }
        );

        let images = decode_all(&selected, request.kind.crop_size())?;
        let targets = selected.iter().map(|s| s.label).collect();

        Ok(RawData {
            images,
            targets,
            label_encoding: Some(class_names),
        })
    }
}
