//! Binary morphology on `GrayImage` masks, backed by
//! `imageproc::morphology` with an elliptical structuring element.
//!
//! Mask points falling outside the image are ignored, so shapes touching
//! the border are not eaten away by erosion.

use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

use crate::perception::color::{count_on, MASK_ON};

/// `Mask::from_image` requires the origin to fit in a `u8`.
const MAX_EXTENT: u32 = 511;

/// Structuring element with its origin at the center cell.
#[derive(Debug, Clone)]
pub struct StructuringElement {
    grid: GrayImage,
}

impl StructuringElement {
    /// Filled ellipse inscribed in a `width`×`height` box.
    ///
    /// Rows are spans of `round(c * sqrt(1 - dy²/r²))` around the center,
    /// so a 5×5 element is a plus-capped block:
    ///
    /// ```text
    /// . . # . .
    /// # # # # #
    /// # # # # #
    /// # # # # #
    /// . . # . .
    /// ```
    pub fn ellipse(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_EXTENT);
        let height = height.clamp(1, MAX_EXTENT);
        let r = (height / 2) as f64;
        let c = (width / 2) as f64;
        let mut grid = GrayImage::new(width, height);

        for row in 0..height {
            let dy = row as f64 - r;
            if dy.abs() > r {
                continue;
            }
            let dx = if r > 0.0 {
                (c * ((r * r - dy * dy) / (r * r)).sqrt()).round()
            } else {
                c
            };
            let j1 = (c - dx).max(0.0) as u32;
            let j2 = ((c + dx + 1.0) as u32).min(width);
            for col in j1..j2 {
                grid.put_pixel(col, row, Luma([MASK_ON]));
            }
        }
        Self { grid }
    }

    /// The element as an `imageproc` mask with its origin at the center.
    pub fn mask(&self) -> Mask {
        let (w, h) = self.grid.dimensions();
        Mask::from_image(&self.grid, (w / 2) as u8, (h / 2) as u8)
    }

    pub fn hit_count(&self) -> usize {
        count_on(&self.grid)
    }

    /// Whether the cell at `(dx, dy)` from the origin belongs to the element.
    pub fn hits(&self, dx: i32, dy: i32) -> bool {
        let x = (self.grid.width() / 2) as i32 + dx;
        let y = (self.grid.height() / 2) as i32 + dy;
        x >= 0
            && y >= 0
            && (x as u32) < self.grid.width()
            && (y as u32) < self.grid.height()
            && self.grid.get_pixel(x as u32, y as u32)[0] == MASK_ON
    }
}

pub fn dilate(mask: &GrayImage, se: &StructuringElement) -> GrayImage {
    grayscale_dilate(mask, &se.mask())
}

pub fn erode(mask: &GrayImage, se: &StructuringElement) -> GrayImage {
    grayscale_erode(mask, &se.mask())
}

/// `iterations` dilations followed by the same number of erosions.
pub fn close(mask: &GrayImage, se: &StructuringElement, iterations: u32) -> GrayImage {
    let m = se.mask();
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &m);
    }
    for _ in 0..iterations {
        out = grayscale_erode(&out, &m);
    }
    out
}

/// `iterations` erosions followed by the same number of dilations.
pub fn open(mask: &GrayImage, se: &StructuringElement, iterations: u32) -> GrayImage {
    let m = se.mask();
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = grayscale_erode(&out, &m);
    }
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &m);
    }
    out
}
