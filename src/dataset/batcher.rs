//! Burn batcher for SSL items
//!
//! Items arrive already normalized by their transform pipeline, so the
//! batcher only stacks them into tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::dataset::basic::{SslItem, Target};

/// A batch of SSL items
#[derive(Clone, Debug)]
pub struct SslBatch<B: Backend> {
    /// Positions of the samples in the original collection, shape [batch_size]
    pub indices: Tensor<B, 1, Int>,
    /// Weak views with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Strong views with the same shape, when every item carries one
    pub strong_images: Option<Tensor<B, 4>>,
    /// Class indices with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
    /// One-hot targets with shape [batch_size, num_classes], for one-hot datasets
    pub onehot_targets: Option<Tensor<B, 2>>,
}

/// Batcher for creating SSL batches
#[derive(Clone, Debug)]
pub struct SslBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> SslBatcher<B> {
    /// Create a batcher for square images of side `image_size`.
    ///
    /// Every view handed to [`batch`](Batcher::batch) must hold exactly
    /// `3 * image_size * image_size` values, which is what a pipeline produces
    /// for images of the dataset's crop size. Batching a view of any other
    /// length panics, naming the sample.
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }

    fn stack_images(&self, views: Vec<(usize, &[f32])>) -> Tensor<B, 4> {
        let batch_size = views.len();
        let expected = 3 * self.image_size * self.image_size;
        if let Some((index, view)) = views.iter().find(|(_, view)| view.len() != expected) {
            panic!(
                "sample {} has {} values, expected {} for 3x{}x{} images",
                index,
                view.len(),
                expected,
                self.image_size,
                self.image_size
            );
        }
        let data: Vec<f32> = views
            .into_iter()
            .flat_map(|(_, v)| v.iter().copied())
            .collect();
        Tensor::<B, 4>::from_floats(
            TensorData::new(data, [batch_size, 3, self.image_size, self.image_size]),
            &self.device,
        )
    }
}

impl<B: Backend> Batcher<SslItem, SslBatch<B>> for SslBatcher<B> {
    fn batch(&self, items: Vec<SslItem>) -> SslBatch<B> {
        let batch_size = items.len();

        let images = self.stack_images(
            items
                .iter()
                .map(|item| (item.index, item.image.as_slice()))
                .collect(),
        );

        let strong_images = items
            .iter()
            .map(|item| item.strong_image.as_deref().map(|view| (item.index, view)))
            .collect::<Option<Vec<_>>>()
            .filter(|views| !views.is_empty())
            .map(|views| self.stack_images(views));

        let indices_data: Vec<i64> = items.iter().map(|item| item.index as i64).collect();
        let indices = Tensor::<B, 1, Int>::from_data(
            TensorData::new(indices_data, [batch_size]),
            &self.device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.target.class() as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            &self.device,
        );

        let onehot_rows: Option<Vec<&Vec<f32>>> = items
            .iter()
            .map(|item| match &item.target {
                Target::OneHot(vector) => Some(vector),
                Target::Class(_) => None,
            })
            .collect();
        let onehot_targets = onehot_rows.filter(|rows| !rows.is_empty()).map(|rows| {
            let num_classes = rows[0].len();
            let data: Vec<f32> = rows.into_iter().flat_map(|r| r.iter().copied()).collect();
            Tensor::<B, 2>::from_floats(
                TensorData::new(data, [batch_size, num_classes]),
                &self.device,
            )
        });

        SslBatch {
            indices,
            images,
            strong_images,
            targets,
            onehot_targets,
        }
    }
}
