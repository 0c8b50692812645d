//! CIFAR-10 / CIFAR-100 binary format reader
//!
//! CIFAR-10 ships five training batches (`data_batch_1.bin` ..
//! `data_batch_5.bin`) and `test_batch.bin`; every record is one label byte
//! followed by 3072 image bytes (1024 red, 1024 green, 1024 blue, row-major
//! 32x32). CIFAR-100 ships `train.bin` and `test.bin` with a coarse label byte,
//! a fine label byte, then the same 3072 image bytes. Fine labels are used.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tracing::{debug, info};

use crate::dataset::kind::DatasetKind;
use crate::dataset::sources::{DatasetSource, LoadRequest, RawData};
use crate::utils::error::{Result, ResultExt, SslDatasetError};

/// Side length of a CIFAR image
pub const CIFAR_IMAGE_SIZE: u32 = 32;

const IMAGE_BYTES: usize = (CIFAR_IMAGE_SIZE * CIFAR_IMAGE_SIZE * 3) as usize;
const PLANE: usize = (CIFAR_IMAGE_SIZE * CIFAR_IMAGE_SIZE) as usize;

/// Layout of a CIFAR binary record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Label bytes preceding the image
    pub label_bytes: usize,
    /// Which label byte holds the target
    pub label_offset: usize,
}

impl RecordLayout {
    pub const CIFAR10: RecordLayout = RecordLayout {
        label_bytes: 1,
        label_offset: 0,
    };
    pub const CIFAR100: RecordLayout = RecordLayout {
        label_bytes: 2,
        label_offset: 1,
    };

    pub fn record_len(&self) -> usize {
        self.label_bytes + IMAGE_BYTES
    }
}

/// Parse a buffer of concatenated CIFAR records
pub fn parse_records(bytes: &[u8], layout: RecordLayout) -> Result<(Vec<RgbImage>, Vec<usize>)> {
    let record_len = layout.record_len();
    if bytes.len() % record_len != 0 {
        return Err(SslDatasetError::Dataset(format!(
            "CIFAR buffer of {} bytes is not a multiple of the {}-byte record size",
            bytes.len(),
            record_len
        )));
    }

    let count = bytes.len() / record_len;
    let mut images = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);

    for record in bytes.chunks_exact(record_len) {
        targets.push(record[layout.label_offset] as usize);
        let pixels = &record[layout.label_bytes..];
        let image = RgbImage::from_fn(CIFAR_IMAGE_SIZE, CIFAR_IMAGE_SIZE, |x, y| {
            let offset = (y * CIFAR_IMAGE_SIZE + x) as usize;
            Rgb([
                pixels[offset],
                pixels[PLANE + offset],
                pixels[2 * PLANE + offset],
            ])
        });
        images.push(image);
    }

    Ok((images, targets))
}

/// Reader for the CIFAR binary distributions
#[derive(Debug, Clone, Copy, Default)]
pub struct CifarSource;

impl CifarSource {
    /// Batch files making up the requested partition
    pub fn batch_files(kind: DatasetKind, root: &Path, train: bool) -> Result<Vec<PathBuf>> {
        let files = match (kind, train) {
            (DatasetKind::Cifar10, true) => (1..=5)
                .map(|i| root.join(format!("data_batch_{}.bin", i)))
                .collect(),
            (DatasetKind::Cifar10, false) => vec![root.join("test_batch.bin")],
            (DatasetKind::Cifar100, true) => vec![root.join("train.bin")],
            (DatasetKind::Cifar100, false) => vec![root.join("test.bin")],
            (other, _) => {
                return Err(SslDatasetError::UnsupportedDataset(format!(
                    "{} is not a CIFAR dataset",
                    other
                )))
            }
        };
        Ok(files)
    }

    fn layout(kind: DatasetKind) -> RecordLayout {
        if kind == DatasetKind::Cifar100 {
            RecordLayout::CIFAR100
        } else {
            RecordLayout::CIFAR10
        }
    }
}

impl DatasetSource for CifarSource {
    fn load(&self, request: &LoadRequest<'_>) -> Result<RawData> {
        let root = request.data_dir.join(request.kind.dir_name());
        let files = Self::batch_files(request.kind, &root, request.train)?;
        let layout = Self::layout(request.kind);

        info!(
            "Loading {} ({}) from {:?}",
            request.kind,
            if request.train { "train" } else { "test" },
            root
        );

        let mut images = Vec::new();
        let mut targets = Vec::new();
        for file in files {
            if !file.exists() {
                return Err(SslDatasetError::PathNotFound(file));
            }
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read CIFAR batch {:?}", file))?;
            let (batch_images, batch_targets) = parse_records(&bytes, layout)?;
            debug!("{:?}: {} records", file, batch_targets.len());
            images.extend(batch_images);
            targets.extend(batch_targets);
        }

        info!("Loaded {} samples", targets.len());

        Ok(RawData {
            images,
            targets,
            label_encoding: None,
        })
    }
}
