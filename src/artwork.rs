/*
 *  artwork.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 *
 *  Cover-art pipeline: fetch, JPEG decode, downscale, dim
 */

use image::ImageFormat;
use log::debug;
use reqwest::Client;
use thiserror::Error;

use crate::pixel;

/// Edge length of the rendered cover bitmap. Source images are 64x64 and
/// downscale by one power-of-two step.
pub const COVER_SIZE: u32 = 32;

/// Brightness applied to the cover so scrolling text stays legible over it.
const DIM_FACTOR: f32 = 0.3;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cover fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("cover decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("out of memory buffering cover image: {0}")]
    Resource(#[from] std::collections::TryReserveError),
}

/// The 32x32 cover bitmap in the panel's byte-swapped RGB565 layout.
///
/// The sample buffer is allocated once and reused across loads; nothing in
/// the render path reallocates per frame.
#[derive(Debug)]
pub struct CoverArt {
    samples: Vec<u16>,
}

impl CoverArt {
    pub fn new() -> Self {
        Self {
            samples: vec![0; (COVER_SIZE * COVER_SIZE) as usize],
        }
    }

    /// Row-major samples, `COVER_SIZE * COVER_SIZE` long.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Fetch `url`, decode it as JPEG, downscale to 32x32, and write the
    /// dimmed result over the reused buffer.
    ///
    /// On failure the buffer keeps the previous cover. The single-threaded
    /// loop never refreshes the panel mid-load, so the swap is atomic from
    /// the panel's point of view.
    pub async fn load(&mut self, http: &Client, url: &str) -> Result<(), ImageError> {
        let response = http.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        // Bound the copy explicitly; allocation failure skips the cycle
        // rather than latching the display into error mode.
        let mut raw: Vec<u8> = Vec::new();
        raw.try_reserve_exact(body.len())?;
        raw.extend_from_slice(&body);
        debug!("fetched cover image: {} bytes", raw.len());

        let decoded = image::load_from_memory_with_format(&raw, ImageFormat::Jpeg)?;
        let small = decoded.thumbnail_exact(COVER_SIZE, COVER_SIZE).to_rgb8();

        for (slot, px) in self.samples.iter_mut().zip(small.pixels()) {
            let [r, g, b] = px.0;
            *slot = pixel::dim(pixel::swap(pixel::pack(r, g, b)), DIM_FACTOR);
        }
        Ok(())
    }
}

impl Default for CoverArt {
    fn default() -> Self {
        Self::new()
    }
}
