/*
 *  pixel.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 *
 *  Packed RGB565 color transforms for the panel framebuffer
 */

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;

/// Swap the bytes of a packed sample.
///
/// The panel framebuffer stores RGB565 samples byte-swapped relative to the
/// packing convention, so `swap` is applied before `unpack` and after `pack`.
pub const fn swap(sample: u16) -> u16 {
    sample.rotate_left(8)
}

/// Unpack an RGB565 sample into 8-bit channels.
///
/// Each channel is widened to the full byte range: 5-bit channels scale by
/// 255/31, the 6-bit green channel by 255/63.
pub const fn unpack(sample: u16) -> (u8, u8, u8) {
    let r = ((sample >> 11) & 0x1F) as u32 * 255 / 31;
    let g = ((sample >> 5) & 0x3F) as u32 * 255 / 63;
    let b = (sample & 0x1F) as u32 * 255 / 31;
    (r as u8, g as u8, b as u8)
}

/// Pack 8-bit channels into an RGB565 sample, masking to 5/6/5 bits.
pub const fn pack(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Dim a byte-swapped RGB565 sample by `factor` (0.0..=1.0).
///
/// Channels are scaled independently, truncating toward zero. The swap is
/// applied symmetrically so the result stays in the panel's byte order.
pub fn dim(sample: u16, factor: f32) -> u16 {
    let (r, g, b) = unpack(swap(sample));
    let r = (r as f32 * factor) as u8;
    let g = (g as f32 * factor) as u8;
    let b = (b as f32 * factor) as u8;
    swap(pack(r, g, b))
}

/// Scale an 8-bit-per-channel color by `factor`, truncating toward zero.
pub fn scale_rgb(color: Rgb888, factor: f32) -> Rgb888 {
    Rgb888::new(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
    )
}
