//! Dataset module for semi-supervised data preparation
//!
//! This module provides functionality for:
//! - Identifying supported datasets and their normalization statistics
//! - Reading CIFAR binary batches and class-per-folder image collections
//! - Balanced labeled/unlabeled splitting with a documented remainder rule
//! - Weak and strong (RandAugment + Cutout) augmentation pipelines
//! - Burn `Dataset` and `Batcher` implementations for the resulting views

pub mod augmentation;
pub mod basic;
pub mod batcher;
pub mod kind;
pub mod normalization;
pub mod registry;
pub mod sources;
pub mod split;
pub mod ssl;
pub mod transform;

pub use augmentation::{AugmentOp, Cutout, RandAugment};
pub use basic::{one_hot, BasicDataset, SslItem, Target};
pub use batcher::{SslBatch, SslBatcher};
pub use kind::DatasetKind;
pub use normalization::{ChannelStats, NormalizationTable};
pub use registry::DatasetRegistry;
pub use sources::{CifarSource, DatasetSource, ImageFolderSource, LoadRequest, RawData};
pub use split::{split_ssl_data, split_ssl_indices, SplitStats, SslSplit, SslSplitData};
pub use ssl::SslDataset;
pub use transform::{ImageOp, TransformPipeline};
