//! Raster sources: where the pipeline's input raster comes from.
//!
//! A source is anything that can produce a single-channel raster: an
//! encoded image file held in memory ([`EncodedImage`]), a procedural
//! [`Generator`](crate::generate::Generator), or a raster that already
//! exists. The pipeline itself only ever sees the resulting [`Raster`].

use crate::types::{PipelineError, Raster};

/// Something that can produce the pipeline's input raster.
pub trait RasterSource {
    /// Produce the raster.
    ///
    /// # Errors
    ///
    /// Source-specific; see each implementation.
    fn produce(&self) -> Result<Raster, PipelineError>;
}

/// Encoded image bytes (PNG, JPEG, BMP, WebP).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(pub Vec<u8>);

impl RasterSource for EncodedImage {
    /// Decode and convert to grayscale with the standard luminance
    /// weights (`0.299 R + 0.587 G + 0.114 B`).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if there are no bytes and
    /// [`PipelineError::ImageDecode`] if the format is unrecognized or the
    /// data is corrupt.
    fn produce(&self) -> Result<Raster, PipelineError> {
        decode_grayscale(&self.0)
    }
}

impl RasterSource for Raster {
    fn produce(&self) -> Result<Raster, PipelineError> {
        Ok(self.clone())
    }
}

/// Decode raw image bytes into a grayscale raster.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_grayscale(bytes: &[u8]) -> Result<Raster, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let gray = img.to_luma8();
    tracing::debug!(width = gray.width(), height = gray.height(), "decoded image");
    Ok(gray)
}
