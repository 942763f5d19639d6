//! Procedural raster generators.
//!
//! Each algorithm draws white (255) strokes on a black square raster of
//! side `floor(200 * scale)`. All randomness comes from a [`StdRng`]
//! seeded with [`Generator::seed`], so a seed always reproduces the same
//! raster.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use image::Luma;
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::source::RasterSource;
use crate::types::{PipelineError, Raster, check_range};

const INK: Luma<u8> = Luma([255]);

/// Procedural drawing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorAlgorithm {
    /// Short random walks with a drifting heading.
    #[default]
    FlowField,
    /// Hypotrochoid curve.
    Spirograph,
    /// Dots around random sites.
    Voronoi,
    /// Overlapping hollow circles.
    CirclePacking,
    /// Declared but not implemented.
    LSystem,
    /// Declared but not implemented.
    SineWaves,
    /// Declared but not implemented.
    Maze,
    /// Declared but not implemented.
    Parametric,
}

impl GeneratorAlgorithm {
    /// Every algorithm name the generator recognises.
    pub const ALL: [Self; 8] = [
        Self::FlowField,
        Self::Spirograph,
        Self::Voronoi,
        Self::CirclePacking,
        Self::LSystem,
        Self::SineWaves,
        Self::Maze,
        Self::Parametric,
    ];

    /// The configuration name of this algorithm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FlowField => "flow_field",
            Self::Spirograph => "spirograph",
            Self::Voronoi => "voronoi",
            Self::CirclePacking => "circle_packing",
            Self::LSystem => "l_system",
            Self::SineWaves => "sine_waves",
            Self::Maze => "maze",
            Self::Parametric => "parametric",
        }
    }

    /// Whether [`Generator::produce`] can draw this algorithm.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        matches!(
            self,
            Self::FlowField | Self::Spirograph | Self::Voronoi | Self::CirclePacking
        )
    }
}

impl fmt::Display for GeneratorAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorAlgorithm {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| PipelineError::UnsupportedMethod {
                kind: "generator",
                name: s.to_owned(),
            })
    }
}

/// A seeded procedural raster source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generator {
    /// What to draw.
    pub algorithm: GeneratorAlgorithm,
    /// RNG seed.
    pub seed: u64,
    /// Amount of detail, `1..=10`.
    pub complexity: u32,
    /// Raster size multiplier, `0.5..=3.0`.
    pub scale: f64,
}

impl Generator {
    /// Default RNG seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default complexity.
    pub const DEFAULT_COMPLEXITY: u32 = 5;
    /// Default scale.
    pub const DEFAULT_SCALE: f64 = 1.0;
    /// Raster side in pixels at scale 1.
    pub const BASE_SIZE: f64 = 200.0;

    /// Reject out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_range("complexity", self.complexity, 1..=10, "1..=10")?;
        check_range("scale", self.scale, 0.5..=3.0, "0.5..=3.0")?;
        Ok(())
    }

    /// Side of the generated raster in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let size = (Self::BASE_SIZE * self.scale).floor() as u32;
        size
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            algorithm: GeneratorAlgorithm::default(),
            seed: Self::DEFAULT_SEED,
            complexity: Self::DEFAULT_COMPLEXITY,
            scale: Self::DEFAULT_SCALE,
        }
    }
}

impl RasterSource for Generator {
    /// Draw the raster.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for out-of-range
    /// complexity or scale and [`PipelineError::NotImplemented`] for
    /// algorithms that are declared but not built.
    fn produce(&self) -> Result<Raster, PipelineError> {
        self.validate()?;

        let size = self.size();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut img = Raster::new(size, size);

        match self.algorithm {
            GeneratorAlgorithm::FlowField => flow_field(&mut img, &mut rng, self.complexity),
            GeneratorAlgorithm::Spirograph => spirograph(&mut img, self.complexity, self.scale),
            GeneratorAlgorithm::Voronoi => voronoi(&mut img, &mut rng, self.complexity),
            GeneratorAlgorithm::CirclePacking => circle_packing(&mut img, &mut rng, self.complexity),
            other => {
                return Err(PipelineError::NotImplemented(format!("{other} generator")));
            }
        }

        tracing::debug!(
            algorithm = %self.algorithm,
            seed = self.seed,
            complexity = self.complexity,
            size,
            "generated raster"
        );
        Ok(img)
    }
}

/// `complexity * 10` walks of 10 to 49 steps. Step `j` lands `j` pixels
/// from the walk's origin along the current heading, and the heading
/// drifts by N(0, 0.3) radians after every step.
fn flow_field(img: &mut Raster, rng: &mut StdRng, complexity: u32) {
    let size = img.width();
    for _ in 0..complexity * 10 {
        let x = f64::from(rng.gen_range(0..size));
        let y = f64::from(rng.gen_range(0..size));
        let length: u32 = rng.gen_range(10..50);
        let mut angle = rng.gen_range(0.0..TAU);
        for j in 0..length {
            let (sin, cos) = angle.sin_cos();
            let px = f64::from(j).mul_add(cos, x).floor();
            let py = f64::from(j).mul_add(sin, y).floor();
            let side = 0.0..f64::from(size);
            if side.contains(&px) && side.contains(&py) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                img.put_pixel(px as u32, py as u32, INK);
            }
            angle += standard_normal(rng) * 0.3;
        }
    }
}

/// Hypotrochoid with `R = 50s`, `r = 30s`, `d = 40s`, stretched to fill
/// the raster inside a 10 px margin.
fn spirograph(img: &mut Raster, complexity: u32, scale: f64) {
    let size = f64::from(img.width());
    let (big_r, small_r, d) = (50.0 * scale, 30.0 * scale, 40.0 * scale);
    let samples = 1000 * complexity;
    let t_max = f64::from(complexity) * TAU;

    let curve: Vec<(f64, f64)> = (0..samples)
        .map(|i| {
            let t = t_max * f64::from(i) / f64::from(samples - 1);
            let k = (big_r - small_r) / small_r;
            (
                (big_r - small_r).mul_add(t.cos(), d * (k * t).cos()),
                (big_r - small_r).mul_add(t.sin(), -d * (k * t).sin()),
            )
        })
        .collect();

    let (x_min, x_max) = bounds(curve.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(curve.iter().map(|p| p.1));
    let fit = |v: f64, lo: f64, hi: f64| {
        let span = (hi - lo).max(f64::EPSILON);
        #[allow(clippy::cast_possible_truncation)]
        let px = ((v - lo) / span).mul_add(size - 20.0, 10.0).floor() as f32;
        px
    };

    let pixels: Vec<(f32, f32)> = curve
        .iter()
        .map(|&(x, y)| (fit(x, x_min, x_max), fit(y, y_min, y_max)))
        .collect();
    for pair in pixels.windows(2) {
        draw_line_segment_mut(img, pair[0], pair[1], INK);
    }
}

/// Light every pixel closer than 3 px to one of `complexity * 5` random
/// sites. Brute force over all pixels and sites.
fn voronoi(img: &mut Raster, rng: &mut StdRng, complexity: u32) {
    let size = f64::from(img.width());
    let sites: Vec<(f64, f64)> = (0..complexity * 5)
        .map(|_| (rng.gen_range(0.0..size), rng.gen_range(0.0..size)))
        .collect();

    for (x, y, px) in img.enumerate_pixels_mut() {
        let (fx, fy) = (f64::from(x), f64::from(y));
        let near = sites
            .iter()
            .any(|&(sx, sy)| (sx - fx).hypot(sy - fy) < 3.0);
        if near {
            *px = INK;
        }
    }
}

/// `complexity * 20` one-pixel hollow circles, centres in `[10, size-10)`,
/// radii in `[5, 20)`.
fn circle_packing(img: &mut Raster, rng: &mut StdRng, complexity: u32) {
    let Ok(size) = i32::try_from(img.width()) else {
        return;
    };
    if size <= 20 {
        return;
    }
    for _ in 0..complexity * 20 {
        let cx = rng.gen_range(10..size - 10);
        let cy = rng.gen_range(10..size - 10);
        let r = rng.gen_range(5..20);
        draw_hollow_circle_mut(img, (cx, cy), r, INK);
    }
}

/// One N(0, 1) sample via the Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
