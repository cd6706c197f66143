//! Color-space conversion and HSV range thresholding.
//!
//! Hue uses the 8-bit half-degree convention (0..=179) so that pure magenta
//! (#FF00FF, 300°) lands on 150. Saturation and value span 0..=255.

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        // 360° wraps back to 0 on the half-degree scale
        h: ((h / 2.0).round() as u32 % 180) as u8,
        s: s.round() as u8,
        v: v as u8,
    }
}

/// Inclusive HSV band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    pub fn contains(&self, hsv: Hsv) -> bool {
        let px = [hsv.h, hsv.s, hsv.v];
        (0..3).all(|i| self.lower[i] <= px[i] && px[i] <= self.upper[i])
    }
}

/// Binary mask: `MASK_ON` where the pixel falls inside `band`.
pub fn threshold_hsv(image: &RgbImage, band: &HsvBand) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        if band.contains(hsv) {
            mask.put_pixel(x, y, Luma([MASK_ON]));
        }
    }
    mask
}

pub fn count_on(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != MASK_OFF).count()
}

/// Rec. 601 luma in 0..=255.
pub fn luminance(rgb: [u8; 3]) -> f32 {
    0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32
}
