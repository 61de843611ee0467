/*
 *  panel.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 *
 *  Panel driver abstraction and a mock driver for testing without hardware
 */

use embedded_graphics::geometry::Point;
use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::Rgb888;
use thiserror::Error;

/// Panel width in pixels.
pub const PANEL_WIDTH: u32 = 64;
/// Panel height in pixels.
pub const PANEL_HEIGHT: u32 = 32;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel transfer failed: {0}")]
    Transfer(String),
}

/// One positioned text layer.
#[derive(Clone, Copy)]
pub struct Label<'a> {
    pub text: &'a str,
    /// Baseline origin; `x` moves as the line scrolls.
    pub origin: Point,
    pub color: Rgb888,
    pub font: &'static MonoFont<'static>,
}

/// The full set of drawable layers for one refresh.
///
/// Borrows the render state; nothing here owns pixel data.
#[derive(Clone, Copy)]
pub struct FramePlan<'a> {
    pub line1: Label<'a>,
    pub line2: Label<'a>,
    /// 32x32 cover bitmap, byte-swapped RGB565 samples, drawn at the origin.
    pub cover: &'a [u16],
    /// Progress strip palette indices, one per column.
    pub progress: &'a [u8],
    pub progress_origin: Point,
    /// Palette for the progress strip: `[primary, secondary]`.
    pub progress_palette: [Rgb888; 2],
}

/// Minimal hardware abstraction for the matrix panel.
///
/// Implementors take a finished frame plan and make it visible. `None`
/// blanks the display. The frame-rate pair is advisory: the driver aims for
/// `target_fps` and may drop frames down to `minimum_fps` under load.
pub trait PanelDriver {
    /// Panel dimensions as (width, height).
    fn dimensions(&self) -> (u32, u32);

    fn refresh(
        &mut self,
        plan: Option<&FramePlan<'_>>,
        target_fps: u32,
        minimum_fps: u32,
    ) -> Result<(), PanelError>;
}

/// Owned copy of a frame plan, recorded by [`MockPanel`] for assertions.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub line1_text: String,
    pub line1_origin: Point,
    pub line1_color: Rgb888,
    pub line2_text: String,
    pub line2_origin: Point,
    pub line2_color: Rgb888,
    pub cover: Vec<u16>,
    pub progress: Vec<u8>,
    pub progress_palette: [Rgb888; 2],
    pub target_fps: u32,
    pub minimum_fps: u32,
}

/// Panel driver that records refreshes instead of driving hardware.
///
/// Used by unit and integration tests, and as the stand-in driver when the
/// binary is built without a hardware backend.
#[derive(Debug, Default)]
pub struct MockPanel {
    /// Refreshes that carried a frame plan.
    pub frame_count: usize,
    /// Refreshes that blanked the display.
    pub blank_count: usize,
    pub last_frame: Option<FrameSnapshot>,
    /// When set, every refresh fails (for error-path testing).
    pub simulate_failure: bool,
}

impl MockPanel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PanelDriver for MockPanel {
    fn dimensions(&self) -> (u32, u32) {
        (PANEL_WIDTH, PANEL_HEIGHT)
    }

    fn refresh(
        &mut self,
        plan: Option<&FramePlan<'_>>,
        target_fps: u32,
        minimum_fps: u32,
    ) -> Result<(), PanelError> {
        if self.simulate_failure {
            return Err(PanelError::Transfer("simulated failure".to_string()));
        }
        match plan {
            None => {
                self.blank_count += 1;
                self.last_frame = None;
            }
            Some(plan) => {
                self.frame_count += 1;
                self.last_frame = Some(FrameSnapshot {
                    line1_text: plan.line1.text.to_string(),
                    line1_origin: plan.line1.origin,
                    line1_color: plan.line1.color,
                    line2_text: plan.line2.text.to_string(),
                    line2_origin: plan.line2.origin,
                    line2_color: plan.line2.color,
                    cover: plan.cover.to_vec(),
                    progress: plan.progress.to_vec(),
                    progress_palette: plan.progress_palette,
                    target_fps,
                    minimum_fps,
                });
            }
        }
        Ok(())
    }
}
