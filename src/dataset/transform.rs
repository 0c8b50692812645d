//! Transform pipelines
//!
//! A [`TransformPipeline`] is an ordered list of image operations followed by
//! conversion to a normalized CHW float tensor:
//!
//! - **Train** (weak): random horizontal flip, random crop with padding
//! - **Eval**: no image operations
//! - **Strong**: RandAugment, then the weak operations, then cutout
//! - **Inverse**: normalization with inverted statistics, for visualization

use image::{imageops, Rgb, RgbImage};
use rand::Rng;

use crate::dataset::augmentation::{Cutout, RandAugment};
use crate::dataset::normalization::ChannelStats;

/// Padding used by the train-time random crop
pub const CROP_PADDING: u32 = 4;

/// Convert an RGB image to a CHW tensor in `[0, 1]` and normalize each channel
pub fn to_normalized_tensor(image: &RgbImage, stats: &ChannelStats) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let plane = width * height;
    let mut tensor = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for c in 0..3 {
            tensor[c * plane + offset] = stats.normalize(c, pixel[c] as f32 / 255.0);
        }
    }

    tensor
}

/// Single image operation applied before tensor conversion
#[derive(Debug, Clone)]
pub enum ImageOp {
    /// Mirror left/right with probability `p`
    HorizontalFlip { p: f64 },
    /// Zero-pad every side by `padding`, then crop a random `size` x `size` window
    RandomCrop { size: u32, padding: u32 },
    /// Apply `n` random photometric/geometric ops at magnitude `m`
    RandAugment(RandAugment),
    /// Blank out a random square patch
    Cutout(Cutout),
}

impl ImageOp {
    pub fn apply<R: Rng + ?Sized>(&self, image: RgbImage, rng: &mut R) -> RgbImage {
        match self {
            ImageOp::HorizontalFlip { p } => {
                if rng.gen_bool(*p) {
                    imageops::flip_horizontal(&image)
                } else {
                    image
                }
            }
            ImageOp::RandomCrop { size, padding } => random_crop(&image, *size, *padding, rng),
            ImageOp::RandAugment(augment) => augment.apply(image, rng),
            ImageOp::Cutout(cutout) => cutout.apply(image, rng),
        }
    }
}

fn random_crop<R: Rng + ?Sized>(image: &RgbImage, size: u32, padding: u32, rng: &mut R) -> RgbImage {
    let (width, height) = image.dimensions();
    let padded_w = (width + 2 * padding).max(size);
    let padded_h = (height + 2 * padding).max(size);

    let mut padded = RgbImage::from_pixel(padded_w, padded_h, Rgb([0, 0, 0]));
    imageops::replace(&mut padded, image, padding as i64, padding as i64);

    let x = rng.gen_range(0..=padded_w - size);
    let y = rng.gen_range(0..=padded_h - size);
    imageops::crop_imm(&padded, x, y, size, size).to_image()
}

/// Ordered image operations plus final normalization
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    ops: Vec<ImageOp>,
    stats: ChannelStats,
}

impl TransformPipeline {
    pub fn new(ops: Vec<ImageOp>, stats: ChannelStats) -> Self {
        Self { ops, stats }
    }

    /// Weak train-time augmentation: flip, padded random crop, normalize
    pub fn train(stats: ChannelStats, crop_size: u32) -> Self {
        Self::new(
            vec![
                ImageOp::HorizontalFlip { p: 0.5 },
                ImageOp::RandomCrop {
                    size: crop_size,
                    padding: CROP_PADDING,
                },
            ],
            stats,
        )
    }

    /// Deterministic evaluation pipeline: normalize only
    pub fn eval(stats: ChannelStats) -> Self {
        Self::new(Vec::new(), stats)
    }

    /// Train or eval pipeline depending on `train`
    pub fn for_split(stats: ChannelStats, crop_size: u32, train: bool) -> Self {
        if train {
            Self::train(stats, crop_size)
        } else {
            Self::eval(stats)
        }
    }

    /// Strong augmentation: RandAugment, the weak ops, then cutout
    pub fn strong(stats: ChannelStats, crop_size: u32, randaugment: RandAugment) -> Self {
        let mut ops = vec![ImageOp::RandAugment(randaugment)];
        ops.extend(Self::train(stats, crop_size).ops);
        ops.push(ImageOp::Cutout(Cutout::new(0.5)));
        Self::new(ops, stats)
    }

    /// Pipeline that maps normalized values back to `[0, 1]` pixel scale
    pub fn inverse(stats: ChannelStats) -> Self {
        Self::eval(stats.inverse())
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn ops(&self) -> &[ImageOp] {
        &self.ops
    }

    /// Run the image operations without tensor conversion
    pub fn augment<R: Rng + ?Sized>(&self, image: &RgbImage, rng: &mut R) -> RgbImage {
        self.ops
            .iter()
            .fold(image.clone(), |img, op| op.apply(img, rng))
    }

    /// Run the full pipeline, returning a normalized CHW tensor
    pub fn apply<R: Rng + ?Sized>(&self, image: &RgbImage, rng: &mut R) -> Vec<f32> {
        let augmented = self.augment(image, rng);
        to_normalized_tensor(&augmented, &self.stats)
    }

    /// Apply this pipeline's normalization to an already normalized tensor.
    /// Used with [`inverse`](Self::inverse) to undo normalization.
    pub fn renormalize(&self, tensor: &[f32]) -> Vec<f32> {
        let plane = tensor.len() / 3;
        tensor
            .iter()
            .enumerate()
            .map(|(i, &v)| self.stats.normalize((i / plane.max(1)).min(2), v))
            .collect()
    }
}
