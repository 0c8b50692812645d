//! Strong augmentation operators
//!
//! RandAugment draws `n` operations uniformly from a fixed list and applies
//! each with probability 0.5 at a magnitude derived from `m` (0-10). The
//! unlabeled objective compares predictions on the weak view against the
//! strong view, so these operators deliberately distort appearance while
//! keeping the class recognizable.

use image::{ImageBuffer, Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Highest supported magnitude
pub const MAX_MAGNITUDE: u32 = 10;

/// Operations RandAugment can choose from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentOp {
    Identity,
    AutoContrast,
    Equalize,
    Rotate,
    Solarize,
    Color,
    Posterize,
    Contrast,
    Brightness,
    Sharpness,
    ShearX,
    TranslateX,
}

impl AugmentOp {
    pub const ALL: [AugmentOp; 12] = [
        AugmentOp::Identity,
        AugmentOp::AutoContrast,
        AugmentOp::Equalize,
        AugmentOp::Rotate,
        AugmentOp::Solarize,
        AugmentOp::Color,
        AugmentOp::Posterize,
        AugmentOp::Contrast,
        AugmentOp::Brightness,
        AugmentOp::Sharpness,
        AugmentOp::ShearX,
        AugmentOp::TranslateX,
    ];

    /// Apply the op. `level` is the magnitude scaled to `[0, 1]`; values
    /// outside that range are clamped.
    pub fn apply<R: Rng + ?Sized>(self, image: &RgbImage, level: f32, rng: &mut R) -> RgbImage {
        let level = level.clamp(0.0, 1.0);
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        match self {
            AugmentOp::Identity => image.clone(),
            AugmentOp::AutoContrast => auto_contrast(image),
            AugmentOp::Equalize => equalize(image),
            AugmentOp::Rotate => rotate(image, sign * level * 30.0),
            AugmentOp::Solarize => solarize(image, (256.0 - level * 256.0) as u16),
            AugmentOp::Color => blend_gray(image, 1.0 + sign * level * 0.9),
            AugmentOp::Posterize => posterize(image, 8u8.saturating_sub((level * 4.0).round() as u8)),
            AugmentOp::Contrast => contrast(image, 1.0 + sign * level * 0.9),
            AugmentOp::Brightness => brightness(image, 1.0 + sign * level * 0.9),
            AugmentOp::Sharpness => sharpness(image, 1.0 + sign * level * 0.9),
            AugmentOp::ShearX => shear_x(image, sign * level * 0.3),
            AugmentOp::TranslateX => {
                let shift = sign * level * 0.3 * image.width() as f32;
                translate_x(image, shift.round() as i64)
            }
        }
    }
}

/// RandAugment with `n` ops per image at magnitude `m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandAugment {
    pub n: usize,
    pub m: u32,
}

impl Default for RandAugment {
    fn default() -> Self {
        Self { n: 3, m: 5 }
    }
}

impl RandAugment {
    pub fn new(n: usize, m: u32) -> Self {
        Self {
            n,
            m: m.min(MAX_MAGNITUDE),
        }
    }

    fn level(&self) -> f32 {
        self.m.min(MAX_MAGNITUDE) as f32 / MAX_MAGNITUDE as f32
    }

    pub fn apply<R: Rng + ?Sized>(&self, image: RgbImage, rng: &mut R) -> RgbImage {
        let level = self.level();
        let mut result = image;
        for _ in 0..self.n {
            let Some(op) = AugmentOp::ALL.choose(rng).copied() else {
                break;
            };
            if rng.gen_bool(0.5) {
                result = op.apply(&result, level, rng);
            }
        }
        result
    }
}

/// Square patch filled with gray, side up to `max_fraction` of the width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutout {
    pub max_fraction: f32,
}

impl Cutout {
    pub fn new(max_fraction: f32) -> Self {
        Self {
            max_fraction: max_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, mut image: RgbImage, rng: &mut R) -> RgbImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || self.max_fraction <= 0.0 {
            return image;
        }
        let fraction = rng.gen_range(0.0..=self.max_fraction);
        let side = ((fraction * width as f32) as u32).max(1);

        let cx = rng.gen_range(0..width);
        let cy = rng.gen_range(0..height);
        let x0 = cx.saturating_sub(side / 2);
        let y0 = cy.saturating_sub(side / 2);
        let x1 = (x0 + side).min(width);
        let y1 = (y0 + side).min(height);

        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x, y, Rgb([127, 127, 127]));
            }
        }
        image
    }
}

fn map_channels(image: &RgbImage, f: impl Fn(usize, u8) -> u8) -> RgbImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        for c in 0..3 {
            pixel[c] = f(c, pixel[c]);
        }
    }
    output
}

fn luminance(pixel: &Rgb<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

fn auto_contrast(image: &RgbImage) -> RgbImage {
    let mut lo = [255u8; 3];
    let mut hi = [0u8; 3];
    for pixel in image.pixels() {
        for c in 0..3 {
            lo[c] = lo[c].min(pixel[c]);
            hi[c] = hi[c].max(pixel[c]);
        }
    }
    map_channels(image, |c, v| {
        if hi[c] <= lo[c] {
            v
        } else {
            let scale = 255.0 / (hi[c] - lo[c]) as f32;
            ((v - lo[c]) as f32 * scale).round().clamp(0.0, 255.0) as u8
        }
    })
}

fn equalize(image: &RgbImage) -> RgbImage {
    let total = (image.width() * image.height()) as f32;
    if total == 0.0 {
        return image.clone();
    }
    let mut lut = [[0u8; 256]; 3];
    for (c, table) in lut.iter_mut().enumerate() {
        let mut hist = [0u32; 256];
        for pixel in image.pixels() {
            hist[pixel[c] as usize] += 1;
        }
        let mut cumulative = 0u32;
        for (v, count) in hist.iter().enumerate() {
            cumulative += count;
            table[v] = (cumulative as f32 / total * 255.0).round() as u8;
        }
    }
    map_channels(image, |c, v| lut[c][v as usize])
}

fn solarize(image: &RgbImage, threshold: u16) -> RgbImage {
    map_channels(image, |_, v| if v as u16 >= threshold { 255 - v } else { v })
}

fn posterize(image: &RgbImage, bits: u8) -> RgbImage {
    let bits = bits.clamp(1, 8);
    let mask = !(0xffu16 >> bits) as u8;
    map_channels(image, |_, v| v & mask)
}

fn brightness(image: &RgbImage, factor: f32) -> RgbImage {
    map_channels(image, |_, v| (v as f32 * factor).clamp(0.0, 255.0) as u8)
}

fn contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let count = (image.width() * image.height()).max(1) as f32;
    let mean = image.pixels().map(luminance).sum::<f32>() / count;
    map_channels(image, |_, v| {
        (mean + factor * (v as f32 - mean)).clamp(0.0, 255.0) as u8
    })
}

/// Interpolate between the grayscale image and the original
fn blend_gray(image: &RgbImage, factor: f32) -> RgbImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let gray = luminance(pixel);
        for c in 0..3 {
            pixel[c] = (gray + factor * (pixel[c] as f32 - gray)).clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Interpolate between a smoothed copy and the original
fn sharpness(image: &RgbImage, factor: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image.clone();
    }
    // PIL smoothing kernel: center weight 5, neighbors 1, normalized by 13
    let mut output = image.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut smooth = [0.0f32; 3];
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5.0 } else { 1.0 };
                    let p = image.get_pixel(x + dx - 1, y + dy - 1);
                    for c in 0..3 {
                        smooth[c] += weight * p[c] as f32;
                    }
                }
            }
            let original = image.get_pixel(x, y);
            let mut blended = [0u8; 3];
            for c in 0..3 {
                let s = smooth[c] / 13.0;
                blended[c] = (s + factor * (original[c] as f32 - s)).clamp(0.0, 255.0) as u8;
            }
            output.put_pixel(x, y, Rgb(blended));
        }
    }
    output
}

/// Sample a pixel using bilinear interpolation; black outside the image
fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > width as f32 - 1.0 || y > height as f32 - 1.0 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        result[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(result)
}

fn rotate(image: &RgbImage, angle_degrees: f32) -> RgbImage {
    if angle_degrees.abs() < 0.1 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let (sin_a, cos_a) = angle_degrees.to_radians().sin_cos();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;

    ImageBuffer::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        bilinear_sample(image, cx + dx * cos_a + dy * sin_a, cy - dx * sin_a + dy * cos_a)
    })
}

fn shear_x(image: &RgbImage, shear: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        bilinear_sample(image, x as f32 + shear * y as f32, y as f32)
    })
}

fn translate_x(image: &RgbImage, shift: i64) -> RgbImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let src = x as i64 - shift;
        if src >= 0 && src < width as i64 {
            *image.get_pixel(src as u32, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}
