/*
 *  screen.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 *
 *  Render state machine: marquee lines, progress bar, error latch
 */

use embedded_graphics::geometry::Point;
use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_6X10};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;

use crate::artwork::CoverArt;
use crate::panel::{FramePlan, Label, PANEL_WIDTH, PanelDriver, PanelError};
use crate::pixel;

const LINE1_Y: i32 = 8;
const LINE2_Y: i32 = 20;
const PROGRESS_X: i32 = 34;
const PROGRESS_Y: i32 = 28;
/// Progress strip width in columns.
pub const PROGRESS_WIDTH: usize = 28;

const PROGRESS_PRIMARY: Rgb888 = Rgb888::new(0x1D, 0xB9, 0x54);
const PROGRESS_SECONDARY: Rgb888 = Rgb888::new(0x18, 0x18, 0x1B);
const ERROR_COLOR: Rgb888 = Rgb888::new(0xFF, 0x00, 0x00);

/// White is far too hot on the matrix at full duty cycle.
const TEXT_BRIGHTNESS: f32 = 0.1;

const TARGET_FPS: u32 = 5;
const MINIMUM_FPS: u32 = 0;

/// Display mode. `Error` is latched: once entered, the enable/disable
/// transitions driven by poll results are suppressed for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Panel shows nothing.
    Disabled,
    /// Panel shows live content.
    Enabled,
    /// Panel shows a fixed error message; only a restart clears this.
    Error,
}

/// One horizontally scrolling text line.
struct MarqueeLine {
    text: String,
    x: i32,
    y: i32,
    color: Rgb888,
    font: &'static MonoFont<'static>,
}

impl MarqueeLine {
    fn new(y: i32, color: Rgb888, font: &'static MonoFont<'static>) -> Self {
        Self {
            text: String::new(),
            x: PANEL_WIDTH as i32,
            y,
            color,
            font,
        }
    }

    fn set_text(&mut self, text: &str, color: Rgb888) {
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
            self.x = PANEL_WIDTH as i32;
        }
        self.color = color;
    }

    /// Rendered width in pixels, from the font's fixed glyph advance.
    fn text_width(&self) -> i32 {
        self.text.chars().count() as i32 * self.font.character_size.width as i32
    }

    /// Advance one pixel leftward; reset to just off the right edge once the
    /// left edge passes `panel_width - text_width`.
    fn scroll(&mut self) {
        self.x -= 1;
        if self.x < PANEL_WIDTH as i32 - self.text_width() {
            self.x = PANEL_WIDTH as i32;
        }
    }
}

/// Owns everything the panel shows: mode, marquee lines, progress strip,
/// and the cover bitmap. Mutated every frame (scroll) and every successful
/// poll (text, progress, track id).
pub struct Screen<D: PanelDriver> {
    driver: D,
    mode: Mode,
    line1: MarqueeLine,
    line2: MarqueeLine,
    progress: f32,
    progress_px: [u8; PROGRESS_WIDTH],
    cover: CoverArt,
    last_track_id: Option<String>,
}

impl<D: PanelDriver> Screen<D> {
    pub fn new(driver: D) -> Self {
        let text_color = pixel::scale_rgb(Rgb888::WHITE, TEXT_BRIGHTNESS);
        Self {
            driver,
            mode: Mode::Disabled,
            line1: MarqueeLine::new(LINE1_Y, text_color, &FONT_6X10),
            line2: MarqueeLine::new(LINE2_Y, text_color, &FONT_5X8),
            progress: 0.0,
            progress_px: [1; PROGRESS_WIDTH],
            cover: CoverArt::new(),
            last_track_id: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The underlying panel driver (mock inspection in tests).
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn has_error(&self) -> bool {
        self.mode == Mode::Error
    }

    /// Latch into error mode and show the fixed message. Irreversible
    /// within a run.
    pub fn show_error(&mut self, msg: &str) {
        self.mode = Mode::Error;
        self.line1.set_text("Error", ERROR_COLOR);
        self.line2.set_text(msg, ERROR_COLOR);
    }

    /// Show live content. Suppressed while latched in error mode.
    pub fn enable(&mut self) {
        if self.mode != Mode::Error {
            self.mode = Mode::Enabled;
        }
    }

    /// Blank the panel ("nothing playing"). Suppressed while latched.
    pub fn disable(&mut self) {
        if self.mode != Mode::Error {
            self.mode = Mode::Disabled;
        }
    }

    /// Set the progress-bar fill, clamped into `[0, 1]`.
    ///
    /// The source is trusted to keep progress <= duration, but an
    /// inconsistent pair must not over-fill the bar.
    pub fn set_progress(&mut self, fraction: f32) {
        self.progress = fraction.clamp(0.0, 1.0);
    }

    /// Whether the polled record is a different track than the one shown.
    /// Gates cover reload and text replacement so a steady poll timer does
    /// not redo network and decode work every cycle.
    pub fn needs_track_refresh(&self, id: &str) -> bool {
        self.last_track_id.as_deref() != Some(id)
    }

    /// Replace both text lines and remember the shown track id.
    pub fn set_track(&mut self, track: &str, artists: &str, id: &str) {
        let text_color = pixel::scale_rgb(Rgb888::WHITE, TEXT_BRIGHTNESS);
        self.line1.set_text(track, text_color);
        self.line2.set_text(artists, text_color);
        self.last_track_id = Some(id.to_string());
    }

    /// The cover bitmap, for the artwork pipeline to load into.
    pub fn cover_mut(&mut self) -> &mut CoverArt {
        &mut self.cover
    }

    /// Per-frame update, run every loop iteration regardless of mode:
    /// advance both marquees, recompute the progress strip, and submit the
    /// layer group (or a blank when disabled) to the panel driver.
    pub fn update(&mut self) -> Result<(), PanelError> {
        self.line1.scroll();
        self.line2.scroll();

        let fill = (self.progress * PROGRESS_WIDTH as f32) as usize;
        for (x, px) in self.progress_px.iter_mut().enumerate() {
            *px = if x < fill { 0 } else { 1 };
        }

        if self.mode == Mode::Disabled {
            return self.driver.refresh(None, TARGET_FPS, MINIMUM_FPS);
        }

        let plan = FramePlan {
            line1: Label {
                text: &self.line1.text,
                origin: Point::new(self.line1.x, self.line1.y),
                color: self.line1.color,
                font: self.line1.font,
            },
            line2: Label {
                text: &self.line2.text,
                origin: Point::new(self.line2.x, self.line2.y),
                color: self.line2.color,
                font: self.line2.font,
            },
            cover: self.cover.samples(),
            progress: &self.progress_px,
            progress_origin: Point::new(PROGRESS_X, PROGRESS_Y),
            progress_palette: [PROGRESS_PRIMARY, PROGRESS_SECONDARY],
        };
        self.driver.refresh(Some(&plan), TARGET_FPS, MINIMUM_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::MockPanel;

    fn screen() -> Screen<MockPanel> {
        Screen::new(MockPanel::new())
    }

    #[test]
    fn starts_disabled_and_blanks_the_panel() {
        let mut s = screen();
        assert_eq!(s.mode(), Mode::Disabled);
        s.update().unwrap();
        assert_eq!(s.driver.blank_count, 1);
        assert_eq!(s.driver.frame_count, 0);
    }

    #[test]
    fn error_mode_latches_against_poll_transitions() {
        let mut s = screen();
        s.show_error("Missing spotify credentials");
        assert_eq!(s.mode(), Mode::Error);

        // "nothing playing" must not blank a latched display
        s.disable();
        assert_eq!(s.mode(), Mode::Error);

        // a playing record must not re-enable it either
        s.enable();
        assert_eq!(s.mode(), Mode::Error);
    }

    #[test]
    fn error_frame_shows_fixed_message_in_error_color() {
        let mut s = screen();
        s.show_error("No wifi connection");
        s.update().unwrap();

        let frame = s.driver.last_frame.as_ref().unwrap();
        assert_eq!(frame.line1_text, "Error");
        assert_eq!(frame.line2_text, "No wifi connection");
        assert_eq!(frame.line1_color, Rgb888::new(255, 0, 0));
        assert_eq!(frame.line2_color, Rgb888::new(255, 0, 0));
    }

    #[test]
    fn marquee_scrolls_left_and_wraps_at_text_width() {
        let mut s = screen();
        s.enable();
        // 20 chars * 6 px = 120 px, wider than the 64 px panel
        s.set_track("aaaaaaaaaaaaaaaaaaaa", "b", "t1");
        let width = 120;

        let mut previous = PANEL_WIDTH as i32;
        // scroll until just before the wrap point
        for _ in 0..(previous - (PANEL_WIDTH as i32 - width)) {
            s.update().unwrap();
            let x = s.driver.last_frame.as_ref().unwrap().line1_origin.x;
            assert_eq!(x, previous - 1, "must move exactly one pixel left");
            previous = x;
        }
        assert_eq!(previous, PANEL_WIDTH as i32 - width);

        // one more step crosses the threshold and resets to the right edge
        s.update().unwrap();
        let x = s.driver.last_frame.as_ref().unwrap().line1_origin.x;
        assert_eq!(x, PANEL_WIDTH as i32);
    }

    #[test]
    fn lines_scroll_independently() {
        let mut s = screen();
        s.enable();
        s.set_track("aaaaaaaaaaaaaaaaaaaa", "bbb", "t1");
        s.update().unwrap();
        let frame = s.driver.last_frame.as_ref().unwrap();
        // both moved one pixel from the right edge this frame
        assert_eq!(frame.line1_origin.x, PANEL_WIDTH as i32 - 1);
        assert_eq!(frame.line2_origin.x, PANEL_WIDTH as i32 - 1);
        // line2 is short (3 chars * 5 px) so it wraps long before line1
        for _ in 0..60 {
            s.update().unwrap();
        }
        let frame = s.driver.last_frame.as_ref().unwrap();
        assert_ne!(frame.line1_origin.x, frame.line2_origin.x);
    }

    #[test]
    fn progress_half_fills_fourteen_columns() {
        let mut s = screen();
        s.enable();
        s.set_progress(0.5);
        s.update().unwrap();

        let frame = s.driver.last_frame.as_ref().unwrap();
        assert_eq!(frame.progress.len(), PROGRESS_WIDTH);
        assert!(frame.progress[..14].iter().all(|&px| px == 0));
        assert!(frame.progress[14..].iter().all(|&px| px == 1));
    }

    #[test]
    fn progress_is_clamped() {
        let mut s = screen();
        s.enable();
        s.set_progress(1.7);
        s.update().unwrap();
        let frame = s.driver.last_frame.as_ref().unwrap();
        assert!(frame.progress.iter().all(|&px| px == 0));

        s.set_progress(-0.5);
        s.update().unwrap();
        let frame = s.driver.last_frame.as_ref().unwrap();
        assert!(frame.progress.iter().all(|&px| px == 1));
    }

    #[test]
    fn track_refresh_only_on_id_change() {
        let mut s = screen();
        assert!(s.needs_track_refresh("t1"));
        s.set_track("Go!", "PSB", "t1");
        assert!(!s.needs_track_refresh("t1"));
        assert!(s.needs_track_refresh("t2"));
    }

    #[test]
    fn frame_rate_pair_reaches_the_driver() {
        let mut s = screen();
        s.enable();
        s.update().unwrap();
        let frame = s.driver.last_frame.as_ref().unwrap();
        assert_eq!(frame.target_fps, 5);
        assert_eq!(frame.minimum_fps, 0);
    }
}
