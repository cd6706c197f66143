/// Marker locator: find the synthetic magenta dot painted by the vision
/// model and map its centroid back onto the original image.
///
/// 1. HSV threshold against the calibrated magenta band.
/// 2. Closing then opening with a small elliptical element.
/// 3. External contours → largest region → centroid from spatial moments.
/// 4. Normalize by the annotated size, rescale by the original size.
use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::perception::color::{count_on, threshold_hsv, HsvBand};
use crate::perception::morphology::{self, StructuringElement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("No marker detected")]
    NoMarkerDetected,
    #[error("Invalid marker shape")]
    InvalidMarkerShape,
}

/// Segmentation settings, tuned to the annotator's #FF00FF output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerParams {
    pub hue_min: u8,
    pub hue_max: u8,
    pub saturation_min: u8,
    pub saturation_max: u8,
    pub value_min: u8,
    pub value_max: u8,
    pub kernel_size: u32,
    pub close_iterations: u32,
    pub open_iterations: u32,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            hue_min: 130,
            hue_max: 175,
            saturation_min: 50,
            saturation_max: 255,
            value_min: 100,
            value_max: 255,
            kernel_size: 5,
            close_iterations: 2,
            open_iterations: 1,
        }
    }
}

impl MarkerParams {
    pub fn band(&self) -> HsvBand {
        HsvBand {
            lower: [self.hue_min, self.saturation_min, self.value_min],
            upper: [self.hue_max, self.saturation_max, self.value_max],
        }
    }

    pub fn structuring_element(&self) -> StructuringElement {
        StructuringElement::ellipse(self.kernel_size, self.kernel_size)
    }
}

/// Marker position in the original image's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerLocation {
    pub x: i64,
    pub y: i64,
    pub original_width: u32,
    pub original_height: u32,
}

/// An external contour summarized by its spatial moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Region {
    /// Polygon moments of a closed contour (Green's theorem).
    pub fn from_contour(contour: &Contour<i32>) -> Self {
        let pts = &contour.points;
        let (mut a00, mut a10, mut a01) = (0.0f64, 0.0f64, 0.0f64);
        if pts.len() > 1 {
            for i in 0..pts.len() {
                let p = pts[i];
                let q = pts[(i + 1) % pts.len()];
                let (xi, yi, xj, yj) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
                let cross = xi * yj - xj * yi;
                a00 += cross;
                a10 += cross * (xi + xj);
                a01 += cross * (yi + yj);
            }
        }
        let (mut m00, mut m10, mut m01) = (a00 / 2.0, a10 / 6.0, a01 / 6.0);
        // orientation-independent
        if m00 < 0.0 {
            m00 = -m00;
            m10 = -m10;
            m01 = -m01;
        }
        Self { m00, m10, m01 }
    }

    pub fn area(&self) -> f64 {
        self.m00
    }

    /// `None` for degenerate (zero-area) regions.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Threshold and clean the annotated image into a marker mask.
pub fn segment_marker(annotated: &RgbImage, params: &MarkerParams) -> GrayImage {
    let raw = threshold_hsv(annotated, &params.band());
    let se = params.structuring_element();
    let closed = morphology::close(&raw, &se, params.close_iterations);
    let cleaned = morphology::open(&closed, &se, params.open_iterations);
    tracing::debug!(raw = count_on(&raw), cleaned = count_on(&cleaned), "marker mask segmented");
    cleaned
}

/// Outer borders that are not nested inside another region.
pub fn external_regions(mask: &GrayImage) -> Vec<Region> {
    find_contours::<i32>(mask)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(Region::from_contour)
        .collect()
}

/// Largest region by area; the first one found wins ties.
pub fn largest_region(regions: &[Region]) -> Option<&Region> {
    regions.iter().fold(None, |best: Option<&Region>, r| match best {
        Some(b) if b.area() >= r.area() => Some(b),
        _ => Some(r),
    })
}

/// Pixel position → fraction of the image size.
pub fn normalize(point: (f64, f64), dims: (u32, u32)) -> (f64, f64) {
    (point.0 / dims.0 as f64, point.1 / dims.1 as f64)
}

/// Fraction of the image size → nearest pixel.
pub fn rescale(norm: (f64, f64), dims: (u32, u32)) -> (i64, i64) {
    (
        (norm.0 * dims.0 as f64).round() as i64,
        (norm.1 * dims.1 as f64).round() as i64,
    )
}

/// Contours, centroid and remap on an already cleaned mask.
pub fn locate_in_mask(
    mask: &GrayImage,
    original_dims: (u32, u32),
) -> Result<MarkerLocation, MarkerError> {
    let regions = external_regions(mask);
    tracing::debug!(regions = regions.len(), "marker regions found");

    let largest = largest_region(&regions).ok_or(MarkerError::NoMarkerDetected)?;
    let centroid = largest.centroid().ok_or(MarkerError::InvalidMarkerShape)?;

    let norm = normalize(centroid, mask.dimensions());
    let (x, y) = rescale(norm, original_dims);
    tracing::debug!(
        cx = centroid.0,
        cy = centroid.1,
        area = largest.area(),
        x,
        y,
        "marker centroid remapped"
    );

    Ok(MarkerLocation {
        x,
        y,
        original_width: original_dims.0,
        original_height: original_dims.1,
    })
}

/// Full locate: segmentation plus remap. Returns the cleaned mask alongside
/// the outcome so callers can persist it for debugging.
pub fn locate_marker(
    original_dims: (u32, u32),
    annotated: &DynamicImage,
    params: &MarkerParams,
) -> (Result<MarkerLocation, MarkerError>, GrayImage) {
    let mask = segment_marker(&annotated.to_rgb8(), params);
    (locate_in_mask(&mask, original_dims), mask)
}
