//! Dataset source registry
//!
//! Maps each [`DatasetKind`] to the [`DatasetSource`] that reads it. The
//! façade resolves kinds through a registry handed to it at construction, so
//! tests and callers can swap in their own readers.

use std::collections::HashMap;
use std::path::Path;

use crate::dataset::kind::DatasetKind;
use crate::dataset::sources::{CifarSource, DatasetSource, ImageFolderSource, LoadRequest, RawData};
use crate::utils::error::{Result, SslDatasetError};

/// Registry of dataset readers keyed by kind
#[derive(Default)]
pub struct DatasetRegistry {
    sources: HashMap<DatasetKind, Box<dyn DatasetSource>>,
}

impl DatasetRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in readers for every supported kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DatasetKind::Cifar10, CifarSource);
        registry.register(DatasetKind::Cifar100, CifarSource);
        for kind in [
            DatasetKind::Ucm,
            DatasetKind::Aid,
            DatasetKind::EurosatRgb,
            DatasetKind::EurosatMs,
        ] {
            registry.register(kind, ImageFolderSource::default());
        }
        registry
    }

    /// Register (or replace) the reader for a kind
    pub fn register<S: DatasetSource + 'static>(&mut self, kind: DatasetKind, source: S) {
        self.sources.insert(kind, Box::new(source));
    }

    /// Reader for `kind`
    pub fn resolve(&self, kind: DatasetKind) -> Result<&dyn DatasetSource> {
        self.sources
            .get(&kind)
            .map(|source| source.as_ref())
            .ok_or_else(|| {
                SslDatasetError::UnsupportedDataset(format!("no source registered for '{}'", kind))
            })
    }

    /// Load one partition of `kind`
    pub fn load(&self, kind: DatasetKind, data_dir: &Path, train: bool, seed: u64) -> Result<RawData> {
        self.resolve(kind)?.load(&LoadRequest {
            kind,
            data_dir,
            train,
            seed,
        })
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<DatasetKind> {
        let mut kinds: Vec<_> = self.sources.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for DatasetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
