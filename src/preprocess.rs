//! Image normalization into the network's canonical input.
//!
//! Any decodable image (color or grayscale, any size) becomes a
//! `[1, 1, 28, 28]` f32 tensor in `[0, 1]` with bright ink on a dark
//! background, which is how the training digits look. User drawings are
//! dark ink on a light canvas, so every image is inverted unconditionally.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use burn::prelude::*;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::Result;
use crate::ml::network::IMAGE_SIZE;

/// Number of pixels in a canonical image
pub const CANONICAL_PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;

/// An image as supplied by a client, resolved once at the request boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Base64 text, optionally prefixed with a `data:image/...;base64,` header
    Base64Payload(String),
    /// Encoded image bytes (PNG, JPEG, BMP, ...)
    RawBytesPayload(Vec<u8>),
}

impl ImageInput {
    /// Decode into an in-memory image
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            Self::Base64Payload(text) => decode_base64_image(text),
            Self::RawBytesPayload(bytes) => decode_image_bytes(bytes),
        }
    }
}

/// Strip a data-URL header: everything up to and including the first comma
pub fn strip_data_url_header(payload: &str) -> &str {
    let payload = payload.trim();
    match payload.split_once(',') {
        Some((_, body)) => body.trim(),
        None => payload,
    }
}

/// Decode base64 text (raw or data URL) to the encoded image bytes
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(strip_data_url_header(payload))?)
}

/// Decode base64 text (raw or data URL) into an image
pub fn decode_base64_image(payload: &str) -> Result<DynamicImage> {
    let bytes = decode_base64_payload(payload)?;
    decode_image_bytes(&bytes)
}

/// Decode encoded image bytes, sniffing the container format
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "decoded image"
    );
    Ok(image)
}

/// Reduce to 8-bit luma with ITU-R 601 weights (0.299, 0.587, 0.114).
///
/// `DynamicImage::to_luma8` uses 709 weights; the 601 mix matches the
/// grayscale conversion the training pipeline used. Alpha is dropped.
pub fn luma601(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// Grayscale, resize to 28x28 with Lanczos resampling and invert.
///
/// Returns the 8-bit canonical image before scaling.
pub fn canonical_image(image: &DynamicImage) -> GrayImage {
    let gray = luma601(image);
    let side = IMAGE_SIZE as u32;
    let mut resized = imageops::resize(&gray, side, side, FilterType::Lanczos3);
    imageops::invert(&mut resized);
    resized
}

/// Row-major pixel intensities in `[0, 1]` of the canonical image
pub fn normalize_pixels(image: &DynamicImage) -> Vec<f32> {
    canonical_image(image)
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect()
}

/// Full normalization to a `[1, 1, 28, 28]` tensor on `device`
pub fn normalize_image<B: Backend>(image: &DynamicImage, device: &B::Device) -> Tensor<B, 4> {
    let pixels = normalize_pixels(image);
    let data = TensorData::new(pixels, [1, 1, IMAGE_SIZE, IMAGE_SIZE]);
    Tensor::<B, 4>::from_data(data.convert::<B::FloatElem>(), device)
}
