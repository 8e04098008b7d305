//! 64×32 monochrome pixel buffer.
//!
//! One byte per pixel (0 or 1), row-major. Sprites are composited by
//! XOR-ing individual pixels; coordinates wrap at both edges. Two one-shot
//! signals tell the presentation layer what happened since it last looked:
//! `redraw` after a draw instruction, `cleared` after a clear-screen.

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Pixel color used by [`Display::to_u32`] for lit pixels (0RGB white).
const PIXEL_ON: u32 = 0x00FF_FFFF;

/// 64×32 pixel state plus the redraw/clear one-shot signals.
pub struct Display {
    buf: [u8; SCREEN_WIDTH * SCREEN_HEIGHT],
    /// Raised by the draw instruction; reset by the presentation layer
    pub redraw: bool,
    /// Raised by the clear-screen instruction; reset by the presentation layer
    pub cleared: bool,
}

impl Display {
    pub fn new() -> Self {
        Display {
            buf: [0; SCREEN_WIDTH * SCREEN_HEIGHT],
            redraw: false,
            cleared: false,
        }
    }

    /// Zero every pixel and raise the clear signal.
    pub fn clear(&mut self) {
        self.buf.fill(0);
        self.cleared = true;
    }

    /// XOR one pixel, wrapping coordinates at the screen edges.
    ///
    /// Returns `true` when a lit pixel was erased (sprite collision).
    pub fn xor_pixel(&mut self, x: usize, y: usize) -> bool {
        let idx = (y % SCREEN_HEIGHT) * SCREEN_WIDTH + (x % SCREEN_WIDTH);
        let erased = self.buf[idx] == 1;
        self.buf[idx] ^= 1;
        erased
    }

    #[inline(always)]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.buf[(y % SCREEN_HEIGHT) * SCREEN_WIDTH + (x % SCREEN_WIDTH)]
    }

    /// Whole buffer, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.buf
    }

    /// Convert to 0RGB words (white on black) for windowing backends.
    pub fn to_u32(&self) -> Vec<u32> {
        self.buf
            .iter()
            .map(|&p| if p != 0 { PIXEL_ON } else { 0 })
            .collect()
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_pixel_toggles_and_reports_erase() {
        let mut d = Display::new();
        assert!(!d.xor_pixel(3, 4));
        assert_eq!(d.pixel(3, 4), 1);
        assert!(d.xor_pixel(3, 4));
        assert_eq!(d.pixel(3, 4), 0);
    }

    #[test]
    fn test_xor_pixel_wraps() {
        let mut d = Display::new();
        d.xor_pixel(64, 32);
        assert_eq!(d.pixel(0, 0), 1);
        d.xor_pixel(67, 33);
        assert_eq!(d.pixel(3, 1), 1);
    }

    #[test]
    fn test_clear_raises_clear_signal_only() {
        let mut d = Display::new();
        d.xor_pixel(1, 1);
        d.clear();
        assert!(d.cleared);
        assert!(!d.redraw);
        assert!(d.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_to_u32_maps_lit_pixels_white() {
        let mut d = Display::new();
        d.xor_pixel(0, 0);
        let fb = d.to_u32();
        assert_eq!(fb[0], 0x00FF_FFFF);
        assert_eq!(fb[1], 0);
        assert_eq!(fb.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    }
}
