//! Indexable SSL dataset implementing Burn's `Dataset` trait
//!
//! A [`BasicDataset`] is a view over shared image storage: the labeled and
//! unlabeled datasets produced from one collection hold the same `Arc`ed
//! images and differ only in their index lists and transforms.

use std::sync::Arc;

use burn::data::dataset::Dataset;
use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::transform::TransformPipeline;
use crate::utils::error::{Result, SslDatasetError};

/// One-hot vector of length `num_classes` with a 1.0 at `index`
pub fn one_hot(num_classes: usize, index: usize) -> Result<Vec<f32>> {
    if index >= num_classes {
        return Err(SslDatasetError::Validation(format!(
            "class {} is outside [0, {})",
            index, num_classes
        )));
    }
    let mut vector = vec![0.0f32; num_classes];
    vector[index] = 1.0;
    Ok(vector)
}

/// Target attached to an item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Class(usize),
    OneHot(Vec<f32>),
}

impl Target {
    /// Class index (position of the hot entry for one-hot targets)
    pub fn class(&self) -> usize {
        match self {
            Target::Class(class) => *class,
            Target::OneHot(vector) => vector
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0,
        }
    }
}

/// A single item ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SslItem {
    /// Position of the sample in the original collection
    pub index: usize,
    /// Weakly augmented image, flattened CHW `[3 * H * W]`
    pub image: Vec<f32>,
    /// Strongly augmented view, present when the dataset uses a strong transform
    pub strong_image: Option<Vec<f32>>,
    pub target: Target,
}

/// Images, targets and transforms for one side of an SSL split
#[derive(Clone, Debug)]
pub struct BasicDataset {
    images: Arc<Vec<RgbImage>>,
    targets: Arc<Vec<usize>>,
    /// Positions into `images`/`targets` exposed by this dataset
    indices: Vec<usize>,
    num_classes: usize,
    transform: TransformPipeline,
    strong_transform: Option<TransformPipeline>,
    onehot: bool,
}

impl BasicDataset {
    /// View over `indices` of shared storage
    pub fn from_parts(
        images: Arc<Vec<RgbImage>>,
        targets: Arc<Vec<usize>>,
        indices: Vec<usize>,
        num_classes: usize,
        transform: TransformPipeline,
    ) -> Result<Self> {
        if images.len() != targets.len() {
            return Err(SslDatasetError::Validation(format!(
                "{} images but {} targets",
                images.len(),
                targets.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= images.len()) {
            return Err(SslDatasetError::Validation(format!(
                "index {} is out of range for {} samples",
                bad,
                images.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&idx| targets[idx] >= num_classes) {
            return Err(SslDatasetError::Validation(format!(
                "target {} at index {} is outside [0, {})",
                targets[bad], bad, num_classes
            )));
        }

        Ok(Self {
            images,
            targets,
            indices,
            num_classes,
            transform,
            strong_transform: None,
            onehot: false,
        })
    }

    /// Dataset over every sample of `images`/`targets`
    pub fn new(
        images: Vec<RgbImage>,
        targets: Vec<usize>,
        num_classes: usize,
        transform: TransformPipeline,
    ) -> Result<Self> {
        let indices = (0..targets.len()).collect();
        Self::from_parts(Arc::new(images), Arc::new(targets), indices, num_classes, transform)
    }

    /// Also produce a strongly augmented view per item
    pub fn with_strong_transform(mut self, strong_transform: TransformPipeline) -> Self {
        self.strong_transform = Some(strong_transform);
        self
    }

    /// Emit one-hot targets instead of class indices
    pub fn with_onehot(mut self, onehot: bool) -> Self {
        self.onehot = onehot;
        self
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn uses_strong_transform(&self) -> bool {
        self.strong_transform.is_some()
    }

    pub fn is_onehot(&self) -> bool {
        self.onehot
    }

    /// Targets of the exposed samples, in dataset order
    pub fn targets(&self) -> Vec<usize> {
        self.indices.iter().map(|&idx| self.targets[idx]).collect()
    }

    /// Samples per class among the exposed samples
    pub fn class_distribution(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes];
        for &idx in &self.indices {
            if let Some(count) = counts.get_mut(self.targets[idx]) {
                *count += 1;
            }
        }
        counts
    }

    /// Untransformed image at dataset position `index`
    pub fn raw_image(&self, index: usize) -> Option<&RgbImage> {
        self.indices.get(index).map(|&idx| &self.images[idx])
    }

    /// Build the item at `index` drawing augmentation randomness from `rng`
    pub fn get_with_rng<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Option<SslItem> {
        let &sample = self.indices.get(index)?;
        let image = &self.images[sample];
        let label = self.targets[sample];

        let weak = self.transform.apply(image, rng);
        let strong_image = self
            .strong_transform
            .as_ref()
            .map(|strong| strong.apply(image, rng));
        let target = if self.onehot {
            // from_parts guarantees label < num_classes
            Target::OneHot(one_hot(self.num_classes, label).ok()?)
        } else {
            Target::Class(label)
        };

        Some(SslItem {
            index: sample,
            image: weak,
            strong_image,
            target,
        })
    }
}

impl Dataset<SslItem> for BasicDataset {
    fn get(&self, index: usize) -> Option<SslItem> {
        self.get_with_rng(index, &mut rand::thread_rng())
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::augmentation::RandAugment;
    use crate::dataset::normalization::ChannelStats;
    use image::Rgb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_dataset() -> BasicDataset {
        let images: Vec<RgbImage> = (0..6)
            .map(|i| RgbImage::from_pixel(4, 4, Rgb([i * 40, 0, 0])))
            .collect();
        let targets = vec![0, 1, 2, 0, 1, 2];
        BasicDataset::new(images, targets, 3, TransformPipeline::eval(ChannelStats::identity())).unwrap()
    }

    #[test]
    fn test_one_hot() {
        assert_eq!(one_hot(4, 2).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
        assert!(matches!(one_hot(2, 5), Err(SslDatasetError::Validation(_))));
        assert!(one_hot(3, 3).is_err());
    }

    #[test]
    fn test_target_class() {
        assert_eq!(Target::Class(3).class(), 3);
        assert_eq!(Target::OneHot(one_hot(5, 4).unwrap()).class(), 4);
    }

    #[test]
    fn test_get_item() {
        let dataset = small_dataset();
        assert_eq!(dataset.len(), 6);

        let item = dataset.get(3).unwrap();
        assert_eq!(item.index, 3);
        assert_eq!(item.target, Target::Class(0));
        assert_eq!(item.image.len(), 3 * 4 * 4);
        assert!((item.image[0] - 120.0 / 255.0).abs() < 1e-6);
        assert!(item.strong_image.is_none());
        assert!(dataset.get(6).is_none());
    }

    #[test]
    fn test_onehot_targets() {
        let dataset = small_dataset().with_onehot(true);
        let item = dataset.get(1).unwrap();
        assert_eq!(item.target, Target::OneHot(vec![0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_strong_view() {
        let strong = TransformPipeline::strong(ChannelStats::identity(), 4, RandAugment::new(2, 10));
        let dataset = small_dataset().with_strong_transform(strong);
        let item = dataset
            .get_with_rng(0, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert_eq!(item.strong_image.map(|s| s.len()), Some(3 * 4 * 4));
    }

    #[test]
    fn test_view_over_shared_storage() {
        let base = small_dataset();
        let view = BasicDataset::from_parts(
            base.images.clone(),
            base.targets.clone(),
            vec![5, 1],
            3,
            TransformPipeline::eval(ChannelStats::identity()),
        )
        .unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(view.get(0).unwrap().index, 5);
        assert_eq!(view.targets(), vec![2, 1]);
        assert_eq!(view.class_distribution(), vec![0, 1, 1]);
        assert!(Arc::ptr_eq(&base.images, &view.images));
    }

    #[test]
    fn test_invalid_parts() {
        let base = small_dataset();
        let err = BasicDataset::from_parts(
            base.images.clone(),
            base.targets.clone(),
            vec![0, 6],
            3,
            TransformPipeline::eval(ChannelStats::identity()),
        )
        .unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));

        // Label 2 does not fit in 2 classes
        let err = BasicDataset::from_parts(
            base.images.clone(),
            base.targets.clone(),
            vec![0, 2],
            2,
            TransformPipeline::eval(ChannelStats::identity()),
        )
        .unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));

        let err = BasicDataset::new(
            vec![RgbImage::new(2, 2)],
            vec![0, 1],
            2,
            TransformPipeline::eval(ChannelStats::identity()),
        )
        .unwrap_err();
        assert!(matches!(err, SslDatasetError::Validation(_)));
    }
}
