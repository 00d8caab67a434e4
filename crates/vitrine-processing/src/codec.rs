//! Image codec seam: decode, probe and rendition encoding.
//!
//! The validator and the optimizer talk to [`ImageCodec`] only. The bundled
//! [`ImageRsCodec`] decodes with the `image` crate and encodes JPEG through
//! mozjpeg and WebP through libwebp.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use thiserror::Error;
use vitrine_core::{RenditionFormat, SourceFormat};

use crate::presets::QualityPreset;

/// Codec operation errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Dimensions and detected format of an image, without the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
}

/// A fully decoded image plus its detected source format.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: SourceFormat,
}

/// Codec abstraction for deep validation and rendition encoding.
///
/// Implementations must be cheap to share; the upload path calls them from
/// `spawn_blocking` since decode and encode are CPU-bound.
pub trait ImageCodec: Send + Sync {
    /// Decode and report dimensions and format. Fails on anything that is
    /// not a real, fully decodable image.
    fn probe(&self, data: &[u8]) -> Result<ImageInfo, CodecError>;

    /// Decode the full pixel data.
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, CodecError>;

    /// Encode an image to one rendition format at the given quality.
    fn encode(
        &self,
        image: &DynamicImage,
        format: RenditionFormat,
        quality: QualityPreset,
    ) -> Result<Bytes, CodecError>;
}

/// Production codec backed by `image`, mozjpeg and libwebp.
#[derive(Clone, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    pub fn new() -> Self {
        ImageRsCodec
    }

    fn source_format(format: ImageFormat) -> Result<SourceFormat, CodecError> {
        match format {
            ImageFormat::Jpeg => Ok(SourceFormat::Jpeg),
            ImageFormat::Png => Ok(SourceFormat::Png),
            ImageFormat::WebP => Ok(SourceFormat::Webp),
            other => Err(CodecError::UnsupportedFormat(format!("{:?}", other))),
        }
    }

    /// Encode to JPEG using mozjpeg
    fn encode_jpeg(img: &DynamicImage, quality: QualityPreset) -> Result<Bytes, CodecError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.jpeg_quality() as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        comp.write_scanlines(&rgb_img)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        let jpeg_data = comp
            .finish()
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Encode to WebP
    fn encode_webp(img: &DynamicImage, quality: QualityPreset) -> Result<Bytes, CodecError> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.webp_quality());

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}

impl ImageCodec for ImageRsCodec {
    fn probe(&self, data: &[u8]) -> Result<ImageInfo, CodecError> {
        let decoded = self.decode(data)?;
        let (width, height) = decoded.image.dimensions();
        Ok(ImageInfo {
            width,
            height,
            format: decoded.format,
        })
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedImage, CodecError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let format = reader.format().ok_or_else(|| {
            CodecError::UnsupportedFormat("unrecognized image signature".to_string())
        })?;
        let source_format = Self::source_format(format)?;
        let image = reader
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        Ok(DecodedImage {
            image,
            format: source_format,
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: RenditionFormat,
        quality: QualityPreset,
    ) -> Result<Bytes, CodecError> {
        match format {
            RenditionFormat::Jpeg => Self::encode_jpeg(image, quality),
            RenditionFormat::Webp => Self::encode_webp(image, quality),
        }
    }
}
