//! Filter stage: tone adjustment, edge detection, thresholding, inversion.
//!
//! [`apply_filters`] is a pure transform from one raster to a new binary
//! raster. The steps run in a fixed order:
//!
//! 1. brightness / contrast (`v * (1 + contrast/100) + brightness`, clamped)
//! 2. optional edge detector ([`EdgeMethod`])
//! 3. binarization: `255` where the sample is above `threshold`, else `0`
//! 4. optional inversion

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::{self, Kernel};
use serde::{Deserialize, Serialize};

use crate::types::{FilterParams, PipelineError};

/// Edge detector applied after tone adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMethod {
    /// Pass the toned raster straight to thresholding.
    #[default]
    None,
    /// Sobel gradient, non-maximum suppression and hysteresis.
    Canny,
    /// Sobel gradient magnitude `sqrt(Gx² + Gy²)`.
    Sobel,
    /// Absolute 4-neighbour Laplacian.
    Laplacian,
}

impl EdgeMethod {
    /// Every edge method, in declaration order.
    pub const ALL: [Self; 4] = [Self::None, Self::Canny, Self::Sobel, Self::Laplacian];

    /// The configuration name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Canny => "canny",
            Self::Sobel => "sobel",
            Self::Laplacian => "laplacian",
        }
    }
}

impl fmt::Display for EdgeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgeMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| PipelineError::UnsupportedMethod {
                kind: "edge",
                name: s.to_owned(),
            })
    }
}

/// Run the whole filter stage.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `params` is out of range.
/// In-range parameters never fail.
pub fn apply_filters(raster: &GrayImage, params: &FilterParams) -> Result<GrayImage, PipelineError> {
    params.validate()?;

    let toned = adjust_tone(raster, params.brightness, params.contrast);

    let is_empty = raster.width() == 0 || raster.height() == 0;
    let edges = match params.edge {
        _ if is_empty => toned,
        EdgeMethod::None => toned,
        EdgeMethod::Canny => {
            let (low, high) = params.canny_thresholds();
            crate::canny::canny(&toned, low, high)
        }
        EdgeMethod::Sobel => sobel_magnitude(&toned),
        EdgeMethod::Laplacian => laplacian_magnitude(&toned),
    };

    let binary = threshold(&edges, params.threshold);
    let out = if params.invert {
        invert(&binary)
    } else {
        binary
    };

    tracing::debug!(
        edge = %params.edge,
        foreground = count_foreground(&out),
        "filters applied"
    );
    Ok(out)
}

/// Linear tone curve `v * (1 + contrast/100) + brightness`, clamped to
/// `0..=255` and rounded to nearest.
#[must_use = "returns the adjusted raster"]
pub fn adjust_tone(raster: &GrayImage, brightness: i32, contrast: i32) -> GrayImage {
    let gain = 1.0 + f64::from(contrast) / 100.0;
    let offset = f64::from(brightness);
    let mut lut = [0u8; 256];
    for (v, slot) in (0u8..=255).zip(lut.iter_mut()) {
        *slot = clamp_u8(f64::from(v).mul_add(gain, offset));
    }
    map_samples(raster, |v| lut[usize::from(v)])
}

/// `255` where the sample is strictly above `level`, `0` elsewhere.
#[must_use = "returns the binary raster"]
pub fn threshold(raster: &GrayImage, level: u8) -> GrayImage {
    map_samples(raster, |v| if v > level { 255 } else { 0 })
}

/// `255 - v` for every sample.
#[must_use = "returns the inverted raster"]
pub fn invert(raster: &GrayImage) -> GrayImage {
    map_samples(raster, |v| !v)
}

/// Sobel gradient magnitude, clamped to 8 bits.
#[must_use = "returns the gradient magnitude raster"]
pub fn sobel_magnitude(raster: &GrayImage) -> GrayImage {
    let (gx, gy) = sobel_gradients(raster);
    GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
        let h = f64::from(gx.get_pixel(x, y).0[0]);
        let v = f64::from(gy.get_pixel(x, y).0[0]);
        Luma([clamp_u8(h.hypot(v))])
    })
}

/// Absolute discrete Laplacian (4-neighbour kernel), clamped to 8 bits.
#[must_use = "returns the Laplacian magnitude raster"]
pub fn laplacian_magnitude(raster: &GrayImage) -> GrayImage {
    const LAPLACIAN_3X3: [i32; 9] = [0, 1, 0, 1, -4, 1, 0, 1, 0];
    let lap: Image<Luma<i16>> = filter_clamped(raster, Kernel::new(&LAPLACIAN_3X3, 3, 3));
    GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
        Luma([clamp_u8(f64::from(lap.get_pixel(x, y).0[0].unsigned_abs()))])
    })
}

/// Horizontal and vertical 3×3 Sobel responses, edge-replicated borders.
pub(crate) fn sobel_gradients(raster: &GrayImage) -> (Image<Luma<i16>>, Image<Luma<i16>>) {
    let gx: Image<Luma<i16>> = filter_clamped(raster, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(raster, kernel::SOBEL_VERTICAL_3X3);
    (gx, gy)
}

/// Number of non-zero samples.
pub(crate) fn count_foreground(raster: &GrayImage) -> u64 {
    raster.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}

fn map_samples(raster: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    let mut out = raster.clone();
    for p in out.pixels_mut() {
        p.0[0] = f(p.0[0]);
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn binary_checkerboard() -> GrayImage {
        GrayImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| if x < 10 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn neutral_filters_are_identity_on_binary_raster() {
        let img = binary_checkerboard();
        let params = FilterParams {
            brightness: 0,
            contrast: 0,
            threshold: 0,
            invert: false,
            edge: EdgeMethod::None,
            ..FilterParams::default()
        };
        assert_eq!(apply_filters(&img, &params).unwrap(), img);
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 100, 250][x as usize]]));
        let out = adjust_tone(&img, 20, 0);
        assert_eq!(out.as_raw(), &vec![20, 120, 255]);
    }

    #[test]
    fn contrast_scales_samples() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[10, 100, 200][x as usize]]));
        let out = adjust_tone(&img, 0, 50);
        assert_eq!(out.as_raw(), &vec![15, 150, 255]);
    }

    #[test]
    fn full_negative_contrast_flattens_to_brightness() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 128, 255][x as usize]]));
        let out = adjust_tone(&img, 40, -100);
        assert_eq!(out.as_raw(), &vec![40, 40, 40]);
    }

    #[test]
    fn threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[127, 128, 129][x as usize]]));
        let out = threshold(&img, 128);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn invert_applies_after_threshold() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([[50, 200][x as usize]]));
        let params = FilterParams {
            invert: true,
            ..FilterParams::default()
        };
        let out = apply_filters(&img, &params).unwrap();
        assert_eq!(out.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn output_is_binary_for_every_edge_method() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 13 + y * 7) % 256) as u8]));
        for edge in EdgeMethod::ALL {
            let params = FilterParams {
                edge,
                threshold: 30,
                ..FilterParams::default()
            };
            let out = apply_filters(&img, &params).unwrap();
            assert!(
                out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255),
                "{edge} produced non-binary output",
            );
            assert_eq!(out.dimensions(), img.dimensions());
        }
    }

    #[test]
    fn sobel_finds_vertical_boundary() {
        let mag = sobel_magnitude(&sharp_edge_image());
        assert_eq!(mag.get_pixel(9, 10).0[0], 255);
        assert_eq!(mag.get_pixel(10, 10).0[0], 255);
        assert_eq!(mag.get_pixel(2, 10).0[0], 0);
        assert_eq!(mag.get_pixel(17, 10).0[0], 0);
    }

    #[test]
    fn laplacian_is_zero_on_flat_regions() {
        let lap = laplacian_magnitude(&sharp_edge_image());
        assert_eq!(lap.get_pixel(3, 5).0[0], 0);
        assert_eq!(lap.get_pixel(16, 5).0[0], 0);
        assert_eq!(lap.get_pixel(9, 5).0[0], 255);
        assert_eq!(lap.get_pixel(10, 5).0[0], 255);
    }

    #[test]
    fn uniform_raster_has_no_edges() {
        let img = GrayImage::from_pixel(12, 12, Luma([90]));
        for edge in [EdgeMethod::Canny, EdgeMethod::Sobel, EdgeMethod::Laplacian] {
            let params = FilterParams {
                edge,
                threshold: 10,
                ..FilterParams::default()
            };
            let out = apply_filters(&img, &params).unwrap();
            assert_eq!(count_foreground(&out), 0, "{edge} found edges in a flat image");
        }
    }

    #[test]
    fn out_of_range_params_fail_fast() {
        let img = GrayImage::new(4, 4);
        let params = FilterParams {
            contrast: -101,
            ..FilterParams::default()
        };
        assert!(matches!(
            apply_filters(&img, &params),
            Err(PipelineError::InvalidParameter {
                name: "contrast",
                ..
            })
        ));
    }

    #[test]
    fn zero_sized_raster_passes_through() {
        let img = GrayImage::new(0, 0);
        for edge in EdgeMethod::ALL {
            let params = FilterParams {
                edge,
                ..FilterParams::default()
            };
            let out = apply_filters(&img, &params).unwrap();
            assert_eq!(out.dimensions(), (0, 0));
        }
    }

    #[test]
    fn filters_are_deterministic() {
        let img = GrayImage::from_fn(24, 24, |x, y| Luma([((x * x + y * 3) % 256) as u8]));
        let params = FilterParams {
            edge: EdgeMethod::Canny,
            threshold: 20,
            ..FilterParams::default()
        };
        let a = apply_filters(&img, &params).unwrap();
        let b = apply_filters(&img, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn edge_method_parses_known_names() {
        for edge in EdgeMethod::ALL {
            assert_eq!(edge.name().parse::<EdgeMethod>().unwrap(), edge);
        }
    }

    #[test]
    fn edge_method_rejects_unknown_name() {
        let err = "prewitt".parse::<EdgeMethod>().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedMethod { kind: "edge", ref name } if name == "prewitt"
        ));
    }
}
