//! SSL dataset façade
//!
//! [`SslDataset`] ties together a dataset kind, its reader, its normalization
//! statistics and the balanced splitter, and hands out [`BasicDataset`]s:
//!
//! - `get_data`: raw images and targets of the configured partition
//! - `get_dset`: one dataset over the whole partition
//! - `get_ssl_dset`: a labeled dataset (weak view only) and an unlabeled
//!   dataset (weak, and optionally strong, views)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::SslConfig;
use crate::dataset::augmentation::RandAugment;
use crate::dataset::basic::BasicDataset;
use crate::dataset::kind::DatasetKind;
use crate::dataset::normalization::{ChannelStats, NormalizationTable};
use crate::dataset::registry::DatasetRegistry;
use crate::dataset::sources::RawData;
use crate::dataset::split::{split_ssl_indices, SslSplit};
use crate::dataset::transform::TransformPipeline;
use crate::utils::error::{Result, SslDatasetError};

/// Dataset preparation for one dataset kind and partition
#[derive(Debug)]
pub struct SslDataset {
    kind: DatasetKind,
    train: bool,
    num_classes: usize,
    data_dir: PathBuf,
    seed: u64,
    stats: ChannelStats,
    transform: TransformPipeline,
    inverse_transform: TransformPipeline,
    registry: DatasetRegistry,
}

impl SslDataset {
    /// Façade using the built-in statistics and readers
    pub fn new<P: AsRef<Path>>(
        kind: DatasetKind,
        train: bool,
        num_classes: usize,
        data_dir: P,
        seed: u64,
    ) -> Result<Self> {
        Self::with_parts(
            kind,
            train,
            num_classes,
            data_dir,
            seed,
            &NormalizationTable::with_defaults(),
            DatasetRegistry::with_defaults(),
        )
    }

    /// Façade with explicit statistics and readers
    pub fn with_parts<P: AsRef<Path>>(
        kind: DatasetKind,
        train: bool,
        num_classes: usize,
        data_dir: P,
        seed: u64,
        normalization: &NormalizationTable,
        registry: DatasetRegistry,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(SslDatasetError::Config(
                "num_classes must be at least 1".to_string(),
            ));
        }
        registry.resolve(kind)?;
        let stats = normalization.get(kind)?;

        Ok(Self {
            kind,
            train,
            num_classes,
            data_dir: data_dir.as_ref().to_path_buf(),
            seed,
            stats,
            transform: TransformPipeline::for_split(stats, kind.crop_size(), train),
            inverse_transform: TransformPipeline::inverse(stats),
            registry,
        })
    }

    /// Façade described by a configuration
    pub fn from_config(config: &SslConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.dataset,
            config.train,
            config.num_classes(),
            &config.data_dir,
            config.seed,
        )
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn is_train(&self) -> bool {
        self.train
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Train or eval pipeline, depending on the partition
    pub fn transform(&self) -> &TransformPipeline {
        &self.transform
    }

    /// Pipeline undoing this dataset's normalization
    pub fn inverse_transform(&self) -> &TransformPipeline {
        &self.inverse_transform
    }

    /// Strong pipeline for this dataset's statistics and crop size
    pub fn strong_transform(&self, randaugment: RandAugment) -> TransformPipeline {
        TransformPipeline::strong(self.stats, self.kind.crop_size(), randaugment)
    }

    /// Images and targets of the configured partition
    pub fn get_data(&self) -> Result<RawData> {
        let raw = self
            .registry
            .load(self.kind, &self.data_dir, self.train, self.seed)?;
        if let Some(&bad) = raw.targets.iter().find(|&&t| t >= self.num_classes) {
            return Err(SslDatasetError::Validation(format!(
                "{} contains label {} but num_classes is {}",
                self.kind, bad, self.num_classes
            )));
        }
        Ok(raw)
    }

    /// Balanced split of already loaded data
    pub fn compute_split(
        &self,
        data: &RawData,
        num_labels: usize,
        index: Option<&[usize]>,
        include_lb_to_ulb: bool,
    ) -> Result<SslSplit> {
        split_ssl_indices(
            &data.targets,
            num_labels,
            self.num_classes,
            index,
            include_lb_to_ulb,
            self.seed,
        )
    }

    fn unlabeled_view(
        &self,
        dataset: BasicDataset,
        use_strong_transform: bool,
        strong_transform: Option<TransformPipeline>,
        onehot: bool,
    ) -> BasicDataset {
        let dataset = dataset.with_onehot(onehot);
        if use_strong_transform {
            let strong = strong_transform
                .unwrap_or_else(|| self.strong_transform(RandAugment::default()));
            dataset.with_strong_transform(strong)
        } else {
            dataset
        }
    }

    /// One dataset over the whole partition
    pub fn get_dset(
        &self,
        use_strong_transform: bool,
        strong_transform: Option<TransformPipeline>,
        onehot: bool,
    ) -> Result<BasicDataset> {
        let raw = self.get_data()?;
        let dataset = BasicDataset::new(raw.images, raw.targets, self.num_classes, self.transform.clone())?;
        Ok(self.unlabeled_view(dataset, use_strong_transform, strong_transform, onehot))
    }

    /// Labeled and unlabeled datasets over a balanced split of the partition.
    ///
    /// `index` replays a previously computed labeled selection. The labeled
    /// dataset never carries a strong view.
    pub fn get_ssl_dset(
        &self,
        num_labels: usize,
        index: Option<&[usize]>,
        include_lb_to_ulb: bool,
        use_strong_transform: bool,
        strong_transform: Option<TransformPipeline>,
        onehot: bool,
    ) -> Result<(BasicDataset, BasicDataset)> {
        let raw = self.get_data()?;
        let split = self.compute_split(&raw, num_labels, index, include_lb_to_ulb)?;

        let images = Arc::new(raw.images);
        let targets = Arc::new(raw.targets);

        let labeled = BasicDataset::from_parts(
            images.clone(),
            targets.clone(),
            split.labeled_indices,
            self.num_classes,
            self.transform.clone(),
        )?
        .with_onehot(onehot);

        let unlabeled = BasicDataset::from_parts(
            images,
            targets,
            split.unlabeled_indices,
            self.num_classes,
            self.transform.clone(),
        )?;
        let unlabeled = self.unlabeled_view(unlabeled, use_strong_transform, strong_transform, onehot);

        info!(
            "{}: {} labeled / {} unlabeled samples",
            self.kind,
            labeled.indices().len(),
            unlabeled.indices().len()
        );

        Ok((labeled, unlabeled))
    }

    /// [`get_ssl_dset`](Self::get_ssl_dset) with the split and view options of `config`
    pub fn get_ssl_dset_from_config(
        &self,
        config: &SslConfig,
        index: Option<&[usize]>,
    ) -> Result<(BasicDataset, BasicDataset)> {
        let strong = config
            .use_strong_transform
            .then(|| self.strong_transform(config.randaugment));
        self.get_ssl_dset(
            config.num_labels,
            index,
            config.include_labeled_in_unlabeled,
            config.use_strong_transform,
            strong,
            config.onehot,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sources::{DatasetSource, LoadRequest};
    use burn::data::dataset::Dataset;
    use image::{Rgb, RgbImage};
    use std::collections::HashSet;

    /// `per_class` 8x8 images for each of `num_classes`, interleaved by class
    struct SyntheticSource {
        num_classes: usize,
        per_class: usize,
    }

    impl DatasetSource for SyntheticSource {
        fn load(&self, _request: &LoadRequest<'_>) -> Result<RawData> {
            let n = self.num_classes * self.per_class;
            Ok(RawData {
                images: (0..n)
                    .map(|i| RgbImage::from_pixel(8, 8, Rgb([(i % 256) as u8, 0, 0])))
                    .collect(),
                targets: (0..n).map(|i| i % self.num_classes).collect(),
                label_encoding: None,
            })
        }
    }

    fn synthetic(num_classes: usize, per_class: usize, train: bool) -> SslDataset {
        let mut registry = DatasetRegistry::new();
        registry.register(
            DatasetKind::EurosatMs,
            SyntheticSource {
                num_classes,
                per_class,
            },
        );
        SslDataset::with_parts(
            DatasetKind::EurosatMs,
            train,
            num_classes,
            "./unused",
            42,
            &NormalizationTable::with_defaults(),
            registry,
        )
        .unwrap()
    }

    #[test]
    fn test_ssl_dset_exclusive() {
        let dataset = synthetic(10, 10, false);
        let (labeled, unlabeled) = dataset
            .get_ssl_dset(20, None, false, true, None, false)
            .unwrap();

        assert_eq!(labeled.len(), 20);
        assert_eq!(unlabeled.len(), 80);
        assert_eq!(labeled.class_distribution(), vec![2; 10]);
        assert!(!labeled.uses_strong_transform());
        assert!(unlabeled.uses_strong_transform());

        let labeled_set: HashSet<_> = labeled.indices().iter().collect();
        assert!(unlabeled.indices().iter().all(|i| !labeled_set.contains(i)));
    }

    #[test]
    fn test_ssl_dset_inclusive_exposes_everything() {
        let dataset = synthetic(4, 5, false);
        let (labeled, unlabeled) = dataset
            .get_ssl_dset(8, None, true, false, None, true)
            .unwrap();

        assert_eq!(labeled.len(), 8);
        assert_eq!(unlabeled.len(), 20);
        assert!(labeled.is_onehot());
        assert!(unlabeled.is_onehot());
        assert!(!unlabeled.uses_strong_transform());
    }

    #[test]
    fn test_ssl_dset_replays_explicit_index() {
        let dataset = synthetic(3, 5, false);
        let index = [14, 0, 7];
        let (labeled, _) = dataset
            .get_ssl_dset(3, Some(&index), false, false, None, false)
            .unwrap();
        assert_eq!(labeled.indices(), &index);
        assert_eq!(labeled.get(0).unwrap().index, 14);
    }

    #[test]
    fn test_ssl_dset_is_reproducible() {
        let a = synthetic(5, 10, true)
            .get_ssl_dset(10, None, true, true, None, false)
            .unwrap()
            .0;
        let b = synthetic(5, 10, true)
            .get_ssl_dset(10, None, true, true, None, false)
            .unwrap()
            .0;
        assert_eq!(a.indices(), b.indices());
    }

    #[test]
    fn test_insufficient_samples_surface() {
        // Source only yields labels 0 and 1, so class 2 cannot meet its quota
        let mut registry = DatasetRegistry::new();
        registry.register(
            DatasetKind::Aid,
            SyntheticSource {
                num_classes: 2,
                per_class: 3,
            },
        );
        let dataset = SslDataset::with_parts(
            DatasetKind::Aid,
            false,
            3,
            "./unused",
            0,
            &NormalizationTable::with_defaults(),
            registry,
        )
        .unwrap();
        let err = dataset
            .get_ssl_dset(3, None, false, false, None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            SslDatasetError::InsufficientSamples {
                class: 2,
                available: 0,
                required: 1
            }
        ));
    }

    #[test]
    fn test_get_dset_covers_partition() {
        let dataset = synthetic(2, 3, false);
        let full = dataset.get_dset(false, None, false).unwrap();
        assert_eq!(full.len(), 6);
        assert_eq!(full.targets(), vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_labels_beyond_num_classes() {
        let mut registry = DatasetRegistry::new();
        registry.register(
            DatasetKind::Ucm,
            SyntheticSource {
                num_classes: 4,
                per_class: 2,
            },
        );
        let dataset = SslDataset::with_parts(
            DatasetKind::Ucm,
            true,
            3,
            "./unused",
            0,
            &NormalizationTable::with_defaults(),
            registry,
        )
        .unwrap();
        assert!(matches!(dataset.get_data(), Err(SslDatasetError::Validation(_))));
    }

    #[test]
    fn test_unregistered_kind_fails_at_construction() {
        let err = SslDataset::with_parts(
            DatasetKind::Aid,
            true,
            30,
            "./data",
            0,
            &NormalizationTable::with_defaults(),
            DatasetRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SslDatasetError::UnsupportedDataset(_)));
    }

    #[test]
    fn test_missing_statistics_fail_at_construction() {
        let err = SslDataset::with_parts(
            DatasetKind::Cifar10,
            true,
            10,
            "./data",
            0,
            &NormalizationTable::new(),
            DatasetRegistry::with_defaults(),
        )
        .unwrap_err();
        assert!(matches!(err, SslDatasetError::Config(_)));
    }

    #[test]
    fn test_train_partition_uses_augmenting_pipeline() {
        let dataset = SslDataset::new(DatasetKind::Cifar10, true, 10, "./data", 0).unwrap();
        assert_eq!(dataset.transform().ops().len(), 2);
        let eval = SslDataset::new(DatasetKind::Cifar10, false, 10, "./data", 0).unwrap();
        assert!(eval.transform().ops().is_empty());
    }

    #[test]
    fn test_zero_classes_rejected() {
        let err = SslDataset::new(DatasetKind::Cifar10, true, 0, "./data", 0).unwrap_err();
        assert!(matches!(err, SslDatasetError::Config(_)));
    }

    #[test]
    fn test_ssl_dset_from_config() {
        let dataset = synthetic(4, 6, false);
        let config = SslConfig {
            num_labels: 8,
            include_labeled_in_unlabeled: false,
            use_strong_transform: false,
            onehot: true,
            ..SslConfig::default()
        };
        let (labeled, unlabeled) = dataset.get_ssl_dset_from_config(&config, None).unwrap();
        assert_eq!(labeled.len(), 8);
        assert_eq!(unlabeled.len(), 16);
        assert!(labeled.is_onehot());
        assert!(!unlabeled.uses_strong_transform());
    }
}
