//! # SSL Dataset
//!
//! Dataset preparation for semi-supervised image classification built on the
//! Burn framework.
//!
//! ## Features
//!
//! - **Balanced splits**: choose a fixed label budget spread evenly across
//!   classes, reproducibly from a seed, or replay a saved selection
//! - **Six datasets**: CIFAR-10, CIFAR-100, UC Merced, AID, EuroSAT RGB and
//!   EuroSAT multispectral
//! - **Weak and strong views** for consistency-regularization methods
//!
//! ## Modules
//!
//! - `dataset`: Kinds, readers, splitting, transforms and Burn integration
//! - `config`: JSON-backed run configuration
//! - `utils`: Errors, logging and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ssl_dataset::{DatasetKind, SslDataset};
//!
//! let dataset = SslDataset::new(DatasetKind::Cifar10, true, 10, "data", 0)?;
//! let (labeled, unlabeled) = dataset.get_ssl_dset(40, None, true, true, None, false)?;
//! ```

pub mod config;
pub mod dataset;
pub mod utils;

pub use config::SslConfig;
pub use dataset::split::{split_ssl_data, split_ssl_indices, SslSplit, SslSplitData};
pub use dataset::{
    BasicDataset, ChannelStats, DatasetKind, DatasetRegistry, NormalizationTable, SslBatch,
    SslBatcher, SslDataset, SslItem, TransformPipeline,
};
pub use utils::error::{Result, SslDatasetError};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
