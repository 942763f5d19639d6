//! Concentric fill: nested rings from repeated erosion.
//!
//! The mask is eroded by `spacing` pixels (chessboard distance) over and
//! over until nothing is left; the borders of each stage are traced the
//! same way [`crate::contour`] traces them. Rings come out outermost first.

use image::GrayImage;
use imageproc::distance_transform::Norm;

use crate::contour::trace_borders;
use crate::types::Polyline;

/// Ring borders of `mask`, `spacing` pixels apart.
#[must_use = "returns the concentric rings"]
pub fn concentric(mask: &GrayImage, spacing: u32) -> Vec<Polyline> {
    let Ok(k) = u8::try_from(spacing) else {
        return Vec::new();
    };
    if k == 0 || mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    // Every erosion strips at least one pixel from each side.
    let max_stages = mask.width().max(mask.height()) / 2 + 1;

    let mut rings = Vec::new();
    let mut current = mask.clone();
    let mut stages = 0;
    for _ in 0..max_stages {
        let borders = trace_borders(&current);
        if borders.is_empty() {
            break;
        }
        rings.extend(borders);
        stages += 1;
        current = erode(&current, k);
    }

    tracing::debug!(stages, rings = rings.len(), "concentric rings traced");
    rings
}

/// Erode by `k` with the raster edge counting as background.
fn erode(mask: &GrayImage, k: u8) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut padded = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    let eroded = imageproc::morphology::erode(&padded, Norm::LInf, k);
    image::imageops::crop_imm(&eroded, 1, 1, w, h).to_image()
}
