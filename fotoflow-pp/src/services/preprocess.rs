//! Image preprocessing for QR decode
//!
//! Marker photos are taken by hand in uneven venue lighting, so a single
//! decode pass misses a lot. The decoder walks two ladders of transforms,
//! cheapest first: enhancement passes that keep the image grayscale, then
//! binarization passes for glare and low-contrast cases. Each transform is a
//! pure `GrayImage -> GrayImage` function so the ladders stay declarative.

use image::GrayImage;
use imageproc::contrast::{self, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter;
use imageproc::morphology;

/// A named preprocessing pass
pub type Transform = (&'static str, fn(&GrayImage) -> GrayImage);

/// Grayscale enhancement passes, tried in order after the plain frame fails
pub const ENHANCEMENT_LADDER: &[Transform] = &[
    ("contrast-stretch", contrast_stretch),
    ("adaptive-threshold", adaptive_binarize),
    ("equalize-histogram", equalize),
    ("bilateral-smooth", bilateral_smooth),
    ("sharpen", sharpen),
    ("gamma-lift", gamma_lift),
];

/// Binarization passes for frames the enhancement ladder could not crack
pub const BINARIZATION_LADDER: &[Transform] = &[
    ("otsu", otsu_binarize),
    ("otsu-inverted", otsu_binarize_inverted),
    ("median-otsu", median_then_otsu),
    ("otsu-closed", otsu_then_close),
];

/// Retry passes for the full-resolution frame after a downscaled miss
pub const FULL_RES_LADDER: &[Transform] = &[
    ("full-res-plain", identity),
    ("full-res-equalize", equalize),
    ("full-res-sharpen", sharpen),
];

fn identity(img: &GrayImage) -> GrayImage {
    img.clone()
}

/// Linear contrast stretch around mid-gray, gain 1.5
fn contrast_stretch(img: &GrayImage) -> GrayImage {
    let lut = build_lut(|v| (v - 128.0) * 1.5 + 128.0);
    map_lut(img, &lut)
}

/// Gamma correction with gamma 1.5, lifting dark marker prints
fn gamma_lift(img: &GrayImage) -> GrayImage {
    let lut = build_lut(|v| (v / 255.0).powf(1.0 / 1.5) * 255.0);
    map_lut(img, &lut)
}

fn equalize(img: &GrayImage) -> GrayImage {
    contrast::equalize_histogram(img)
}

/// Mean-based adaptive threshold, radius 5
fn adaptive_binarize(img: &GrayImage) -> GrayImage {
    contrast::adaptive_threshold(img, 5)
}

/// Edge-preserving smoothing for noisy sensor output
fn bilateral_smooth(img: &GrayImage) -> GrayImage {
    filter::bilateral_filter(img, 9, 75.0, 75.0)
}

fn sharpen(img: &GrayImage) -> GrayImage {
    filter::sharpen3x3(img)
}

fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let level = contrast::otsu_level(img);
    contrast::threshold(img, level, ThresholdType::Binary)
}

/// Inverted Otsu for light-on-dark markers
fn otsu_binarize_inverted(img: &GrayImage) -> GrayImage {
    let level = contrast::otsu_level(img);
    contrast::threshold(img, level, ThresholdType::BinaryInverted)
}

/// Median denoise before Otsu, for salt-and-pepper frames
fn median_then_otsu(img: &GrayImage) -> GrayImage {
    let smoothed = filter::median_filter(img, 2, 2);
    otsu_binarize(&smoothed)
}

/// Otsu followed by a morphological close to heal broken module edges
fn otsu_then_close(img: &GrayImage) -> GrayImage {
    let binary = otsu_binarize(img);
    morphology::close(&binary, Norm::LInf, 1)
}

fn build_lut(f: impl Fn(f32) -> f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = f(i as f32).clamp(0.0, 255.0) as u8;
    }
    lut
}

fn map_lut(img: &GrayImage, lut: &[u8; 256]) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / width.max(1)) as u8]))
    }

    #[test]
    fn ladders_preserve_dimensions() {
        let img = gradient(64, 48);
        for (name, transform) in ENHANCEMENT_LADDER.iter().chain(BINARIZATION_LADDER) {
            let out = transform(&img);
            assert_eq!(out.dimensions(), (64, 48), "{name} changed dimensions");
        }
    }

    #[test]
    fn contrast_stretch_widens_range() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([100 + (x as u8) * 5]));
        let out = contrast_stretch(&img);
        let min_in = img.pixels().map(|p| p.0[0]).min().unwrap();
        let min_out = out.pixels().map(|p| p.0[0]).min().unwrap();
        assert!(min_out < min_in);
    }

    #[test]
    fn otsu_output_is_binary() {
        let out = otsu_binarize(&gradient(32, 32));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn inverted_otsu_flips_polarity() {
        let img = gradient(32, 32);
        let plain = otsu_binarize(&img);
        let inverted = otsu_binarize_inverted(&img);
        for (a, b) in plain.pixels().zip(inverted.pixels()) {
            assert_ne!(a.0[0], b.0[0]);
        }
    }

    #[test]
    fn gamma_lift_brightens_midtones() {
        let img = GrayImage::from_pixel(4, 4, Luma([64]));
        let out = gamma_lift(&img);
        assert!(out.get_pixel(0, 0).0[0] > 64);
    }
}
