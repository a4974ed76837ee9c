//! Image processor - produces resized/reformatted derivative bytes
//!
//! Decodes a source image, resizes it so the longer edge equals the resolved
//! bucket while keeping aspect ratio, and re-encodes to the requested format
//! with deterministic settings. Images already within the bucket are
//! re-encoded without resizing; nothing is ever upscaled.
//!
//! Uses `spawn_blocking` for CPU-intensive operations to avoid blocking the
//! async runtime.

use crate::error::{AppError, Result};
use crate::models::ThumbnailFormat;
use crate::services::sizing::ResolvedSize;
use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Minimum edge length for icon source images.
pub const ICON_MIN_DIMENSION: u32 = 256;

/// Configuration for derivative encoding
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
    /// AVIF quality (0-100)
    pub avif_quality: u8,
    /// AVIF encoder speed (1-10, higher is faster)
    pub avif_speed: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            avif_quality: 80,
            avif_speed: 6,
        }
    }
}

/// Which owner capability this processor serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// Regular images: original, webp and avif outputs.
    Standard,
    /// Icons (apps, app installations): original and webp only.
    Icon,
}

/// A generated derivative ready to be persisted.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Bytes,
    pub content_type: &'static str,
    /// File extension for the derivative's storage path.
    pub extension: &'static str,
}

/// Image processor
pub struct ImageProcessor {
    kind: ProcessorKind,
    config: ProcessorConfig,
}

impl ImageProcessor {
    pub fn new(kind: ProcessorKind, config: ProcessorConfig) -> Self {
        Self { kind, config }
    }

    pub fn standard() -> Self {
        Self::new(ProcessorKind::Standard, ProcessorConfig::default())
    }

    pub fn icon() -> Self {
        Self::new(ProcessorKind::Icon, ProcessorConfig::default())
    }

    /// Whether this processor variant may emit the given format.
    pub fn allows(&self, format: ThumbnailFormat) -> bool {
        match format {
            ThumbnailFormat::Original | ThumbnailFormat::Webp => true,
            ThumbnailFormat::Avif => self.kind == ProcessorKind::Standard,
        }
    }

    /// Produce derivative bytes for the resolved size and format (blocking).
    ///
    /// **Note:** CPU-intensive; call `create_thumbnail_async` from async code.
    pub fn create_thumbnail(
        &self,
        source: &[u8],
        size: ResolvedSize,
        format: Option<ThumbnailFormat>,
    ) -> Result<ProcessedImage> {
        if let Some(requested) = format {
            if !self.allows(requested) {
                return Err(AppError::UnsupportedFormat(
                    "Unsupported image format.".to_string(),
                ));
            }
        }

        let source_format = image::guess_format(source)
            .map_err(|_| AppError::InvalidSourceImage("Invalid image.".to_string()))?;
        let img = image::load_from_memory(source)
            .map_err(|_| AppError::InvalidSourceImage("Invalid image.".to_string()))?;

        let bucket = match size {
            // Full-resolution passthrough: the validated source bytes go out
            // unchanged under the source's own content type.
            ResolvedSize::Original => {
                return Ok(ProcessedImage {
                    data: Bytes::copy_from_slice(source),
                    content_type: mime_for(source_format),
                    extension: extension_for(source_format),
                });
            }
            ResolvedSize::Bucket(px) => px,
        };

        let target_format = match format {
            None | Some(ThumbnailFormat::Original) => source_format,
            Some(ThumbnailFormat::Webp) => ImageFormat::WebP,
            Some(ThumbnailFormat::Avif) => ImageFormat::Avif,
        };

        let (orig_w, orig_h) = img.dimensions();
        debug!(
            original_width = orig_w,
            original_height = orig_h,
            bucket,
            "Processing image for thumbnail"
        );

        // Never upscale: encode as-is when already within the bucket.
        let resized = if orig_w <= bucket && orig_h <= bucket {
            img
        } else {
            let (new_w, new_h) = calculate_dimensions(orig_w, orig_h, bucket);
            img.resize_exact(new_w.max(1), new_h.max(1), FilterType::Triangle)
        };

        let data = self.encode(&resized, target_format)?;

        debug!(
            width = resized.width(),
            height = resized.height(),
            size = data.len(),
            format = ?target_format,
            "Thumbnail generated"
        );

        Ok(ProcessedImage {
            data,
            content_type: mime_for(target_format),
            extension: extension_for(target_format),
        })
    }

    /// Produce derivative bytes asynchronously on the blocking thread pool.
    pub async fn create_thumbnail_async(
        self: Arc<Self>,
        source: Bytes,
        size: ResolvedSize,
        format: Option<ThumbnailFormat>,
    ) -> Result<ProcessedImage> {
        let processor = self.clone();

        tokio::task::spawn_blocking(move || processor.create_thumbnail(&source, size, format))
            .await
            .map_err(|e| AppError::Internal(format!("Thumbnail task panicked: {e}")))?
    }

    /// Encode with deterministic per-format settings.
    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);

        let encode_err =
            |e: image::ImageError| AppError::Internal(format!("Failed to encode thumbnail: {e}"));

        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut cursor, self.config.jpeg_quality);
                encoder.encode_image(&rgb).map_err(encode_err)?;
            }
            ImageFormat::Png => {
                let rgba = img.to_rgba8();
                PngEncoder::new(&mut cursor)
                    .write_image(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)
                    .map_err(encode_err)?;
            }
            ImageFormat::WebP => {
                let rgba = img.to_rgba8();
                WebPEncoder::new_lossless(&mut cursor)
                    .encode(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)
                    .map_err(encode_err)?;
            }
            ImageFormat::Avif => {
                let rgba = img.to_rgba8();
                AvifEncoder::new_with_speed_quality(
                    &mut cursor,
                    self.config.avif_speed,
                    self.config.avif_quality,
                )
                .write_image(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)
                .map_err(encode_err)?;
            }
            // Keep-source formats without bespoke settings (gif, bmp, ...).
            // The source already decoded by this point, so a failure here is
            // an encoder fault, not bad client data.
            other => {
                img.write_to(&mut cursor, other).map_err(encode_err)?;
            }
        }

        Ok(Bytes::from(buf))
    }
}

/// Validate an icon source image: square and at least 256x256.
///
/// Enforced when icons are uploaded, not at thumbnail-generation time.
pub fn validate_icon(source: &[u8]) -> Result<()> {
    let img = image::load_from_memory(source)
        .map_err(|_| AppError::InvalidSourceImage("Invalid image.".to_string()))?;

    let (w, h) = img.dimensions();
    if w != h {
        return Err(AppError::InvalidSourceImage(
            "Icon image must be square.".to_string(),
        ));
    }
    if w < ICON_MIN_DIMENSION {
        return Err(AppError::InvalidSourceImage(format!(
            "Icon image must be at least {px}x{px} pixels.",
            px = ICON_MIN_DIMENSION
        )));
    }

    Ok(())
}

/// New dimensions with the longer edge equal to `max_dim`, aspect preserved.
fn calculate_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width > height {
        let ratio = max_dim as f32 / width as f32;
        (max_dim, ((height as f32) * ratio).round() as u32)
    } else {
        let ratio = max_dim as f32 / height as f32;
        (((width as f32) * ratio).round() as u32, max_dim)
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Avif => "image/avif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn extension_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Avif => "avif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "img",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 40, 200]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_calculate_dimensions_landscape() {
        let (w, h) = calculate_dimensions(1200, 800, 600);
        assert_eq!(w, 600);
        assert_eq!(h, 400);
    }

    #[test]
    fn test_calculate_dimensions_portrait() {
        let (w, h) = calculate_dimensions(800, 1200, 600);
        assert_eq!(w, 400);
        assert_eq!(h, 600);
    }

    #[test]
    fn test_calculate_dimensions_square() {
        let (w, h) = calculate_dimensions(1000, 1000, 600);
        assert_eq!(w, 600);
        assert_eq!(h, 600);
    }

    #[test]
    fn test_resize_to_bucket() {
        let processor = ImageProcessor::standard();
        let source = png_bytes(800, 600);

        let out = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(128), None)
            .unwrap();
        assert_eq!(out.content_type, "image/png");
        assert_eq!(out.extension, "png");

        let thumb = image::load_from_memory(&out.data).unwrap();
        assert_eq!(thumb.dimensions(), (128, 96));
    }

    #[test]
    fn test_no_upscale_when_within_bucket() {
        let processor = ImageProcessor::standard();
        let source = png_bytes(100, 80);

        let out = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(256), None)
            .unwrap();
        let thumb = image::load_from_memory(&out.data).unwrap();
        assert_eq!(thumb.dimensions(), (100, 80));
    }

    #[test]
    fn test_original_is_passthrough() {
        let processor = ImageProcessor::standard();
        let source = png_bytes(800, 600);

        // Format is ignored on the original path.
        let out = processor
            .create_thumbnail(&source, ResolvedSize::Original, Some(ThumbnailFormat::Webp))
            .unwrap();
        assert_eq!(out.data.as_ref(), source.as_slice());
        assert_eq!(out.content_type, "image/png");
    }

    #[test]
    fn test_webp_reencode() {
        let processor = ImageProcessor::standard();
        let source = png_bytes(400, 400);

        let out = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(64), Some(ThumbnailFormat::Webp))
            .unwrap();
        assert_eq!(out.content_type, "image/webp");
        assert_eq!(out.extension, "webp");
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_gif_keeps_format_through_fallback_encoder() {
        let processor = ImageProcessor::standard();
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            400,
            300,
            image::Rgb([200, 10, 10]),
        ));
        let mut source = Vec::new();
        img.write_to(&mut Cursor::new(&mut source), ImageFormat::Gif)
            .unwrap();

        let out = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(64), None)
            .unwrap();
        assert_eq!(out.content_type, "image/gif");
        assert_eq!(out.extension, "gif");
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::Gif);
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        let processor = ImageProcessor::standard();
        let err = processor
            .create_thumbnail(b"definitely not an image", ResolvedSize::Bucket(64), None)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSourceImage(_)));
    }

    #[test]
    fn test_icon_processor_rejects_avif() {
        let processor = ImageProcessor::icon();
        let source = png_bytes(512, 512);

        let err = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(64), Some(ThumbnailFormat::Avif))
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_icon_processor_allows_webp() {
        let processor = ImageProcessor::icon();
        let source = png_bytes(512, 512);

        let out = processor
            .create_thumbnail(&source, ResolvedSize::Bucket(64), Some(ThumbnailFormat::Webp))
            .unwrap();
        assert_eq!(out.content_type, "image/webp");
    }

    #[test]
    fn test_validate_icon() {
        assert!(validate_icon(&png_bytes(256, 256)).is_ok());
        assert!(validate_icon(&png_bytes(512, 512)).is_ok());
        assert!(matches!(
            validate_icon(&png_bytes(300, 200)),
            Err(AppError::InvalidSourceImage(_))
        ));
        assert!(matches!(
            validate_icon(&png_bytes(128, 128)),
            Err(AppError::InvalidSourceImage(_))
        ));
    }
}
