//! Cover art normalization and embedding
//!
//! Artwork from the service comes in whatever format and size the CDN serves.
//! Before embedding it is decoded, scaled down to fit `MAX_COVER_SIZE` and
//! re-encoded as baseline JPEG so every tag format and player accepts it.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::Tag;
use std::io::Cursor;
use tracing::{debug, warn};

/// Maximum dimension for cover art (width or height)
const MAX_COVER_SIZE: u32 = 1000;

/// JPEG quality (0-100)
const JPEG_QUALITY: u8 = 90;

/// Lowest quality the encoder loop will go down to
const MIN_JPEG_QUALITY: u8 = 60;

/// Maximum embedded cover size in bytes (500KB)
const MAX_COVER_BYTES: usize = 500 * 1024;

/// Decode, resize and re-encode cover art as JPEG
///
/// Reduces quality in steps of 10 while the result exceeds `MAX_COVER_BYTES`.
pub fn process_cover_art(data: &[u8]) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .context("Failed to decode cover art")?;

    let img = resize_to_fit(img);

    let mut quality = JPEG_QUALITY;
    loop {
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode_image(&img)
            .context("Failed to encode cover art as JPEG")?;

        if output.len() <= MAX_COVER_BYTES || quality <= MIN_JPEG_QUALITY {
            debug!(
                "Processed cover art: {}x{} -> {} bytes (quality {})",
                img.width(),
                img.height(),
                output.len(),
                quality
            );
            return Ok(output);
        }

        warn!(
            "Cover art too large ({} bytes), reducing quality from {} to {}",
            output.len(),
            quality,
            quality - 10
        );
        quality -= 10;
    }
}

/// Resize image to fit within MAX_COVER_SIZE while maintaining aspect ratio
fn resize_to_fit(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_COVER_SIZE && height <= MAX_COVER_SIZE {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = MAX_COVER_SIZE as f64 / width as f64;
        (MAX_COVER_SIZE, (height as f64 * ratio) as u32)
    } else {
        let ratio = MAX_COVER_SIZE as f64 / height as f64;
        ((width as f64 * ratio) as u32, MAX_COVER_SIZE)
    };

    debug!(
        "Resizing cover art: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

/// Replace the front cover of `tag` with already processed JPEG data
pub fn attach_front_cover(tag: &mut Tag, jpeg: Vec<u8>) {
    let picture = Picture::new_unchecked(PictureType::CoverFront, Some(MimeType::Jpeg), None, jpeg);
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);
}
