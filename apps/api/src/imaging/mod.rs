//! Image post-processing: the deterministic resize → sharpen → encode chain every generated
//! image passes through before it is stored.
//!
//! The chain never branches on image content:
//! 1. fetch bytes (HTTP or data URI) when handed a URL
//! 2. fit within `max_dimension` on both axes, aspect preserved, never upscaled
//! 3. unsharp mask with fixed parameters
//! 4. lossless PNG at best compression; the alpha channel is dropped when fully opaque
//!
//! Running the chain on its own output leaves the dimensions unchanged.

pub mod source;

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::imaging::source::{decode_data_uri, ImageSource};

/// Gaussian sigma of the fixed sharpening pass.
pub const SHARPEN_SIGMA: f32 = 0.8;
/// Minimum brightness difference the sharpening pass acts on.
pub const SHARPEN_THRESHOLD: i32 = 2;
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("failed to fetch image from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed data URI")]
    InvalidDataUri,

    #[error("image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),

    #[error("image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image processing task failed: {0}")]
    Task(String),
}

/// Final, encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl ProcessedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

#[derive(Clone)]
pub struct ImagePostProcessor {
    http: Client,
    max_dimension: u32,
}

impl ImagePostProcessor {
    pub fn new(http: Client, max_dimension: u32) -> Self {
        Self {
            http,
            max_dimension: max_dimension.max(1),
        }
    }

    /// Runs the full chain. Decoding and encoding happen on the blocking pool.
    pub async fn process(&self, input: ImageSource) -> Result<ProcessedImage, ImagingError> {
        let bytes = fetch_bytes(&self.http, input).await?;
        let max_dimension = self.max_dimension;

        tokio::task::spawn_blocking(move || process_bytes(&bytes, max_dimension))
            .await
            .map_err(|e| ImagingError::Task(e.to_string()))?
    }
}

/// Resolves an `ImageSource` to raw bytes.
pub async fn fetch_bytes(http: &Client, input: ImageSource) -> Result<Bytes, ImagingError> {
    match input {
        ImageSource::Bytes(bytes) => Ok(bytes),
        ImageSource::Url(url) if url.starts_with("data:") => decode_data_uri(&url)
            .map(|(_, bytes)| Bytes::from(bytes))
            .ok_or(ImagingError::InvalidDataUri),
        ImageSource::Url(url) => {
            debug!("Fetching image from {url}");
            let response = http
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            let response = match response {
                Ok(r) => r,
                Err(source) => return Err(ImagingError::Fetch { url, source }),
            };
            response
                .bytes()
                .await
                .map_err(|source| ImagingError::Fetch { url, source })
        }
    }
}

/// Synchronous core of the chain.
pub fn process_bytes(bytes: &[u8], max_dimension: u32) -> Result<ProcessedImage, ImagingError> {
    let image = image::load_from_memory(bytes).map_err(ImagingError::Decode)?;
    let (src_w, src_h) = (image.width(), image.height());

    let (width, height) = fit_within(src_w, src_h, max_dimension);
    let image = if (width, height) == (src_w, src_h) {
        image
    } else {
        image.resize_exact(width, height, RESIZE_FILTER)
    };

    let image = image.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);
    let image = optimize_color_type(image);

    let mut buffer = Cursor::new(Vec::new());
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(ImagingError::Encode)?;

    debug!(
        "Post-processed image {}x{} -> {}x{} ({} bytes)",
        src_w,
        src_h,
        width,
        height,
        buffer.get_ref().len()
    );

    Ok(ProcessedImage {
        bytes: Bytes::from(buffer.into_inner()),
        width,
        height,
        format: ImageFormat::Png,
    })
}

/// Largest size that fits in `max × max` with the source aspect ratio. Never upscales.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / width.max(height) as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

/// Normalises to 8-bit RGB(A), dropping alpha when every pixel is opaque.
fn optimize_color_type(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }

    let rgba = image.to_rgba8();
    if rgba.pixels().all(|p| p[3] == u8::MAX) {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(rgba)
    }
}
