//! Packed 1-bit monochrome canvas
//!
//! Matches the SRAM layout of black/white EPD controllers: row-major,
//! eight horizontal pixels per byte, MSB first, bit set = white. Clearing
//! to white therefore fills with 0xFF, which is also what the controllers
//! expect for a blank frame.

use crate::config::{PanelColor, PanelConfig};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

/// Fixed-size packed bitmap sized exactly to the panel's addressable area
///
/// Allocated once at panel-configuration time and reused every update
/// cycle. Pixel state carries no meaning between cycles; callers clear
/// before painting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoCanvas {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl MonoCanvas {
    /// Create a canvas cleared to white
    // SAFETY: width and height are panel dimensions (~800×480 max), so every
    // product and sum below fits comfortably in usize.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn new(width: u32, height: u32) -> Self {
        let row_bytes = (width as usize + 7) / 8;
        Self {
            width,
            height,
            bytes: vec![0xFF; row_bytes * height as usize],
        }
    }

    /// Create a canvas sized from a panel configuration
    pub fn for_panel(config: &PanelConfig) -> Self {
        Self::new(config.width, config.height)
    }

    /// Canvas width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row
    // SAFETY: width is a panel dimension; width + 7 cannot overflow usize.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn row_bytes(&self) -> usize {
        (self.width as usize + 7) / 8
    }

    /// The packed buffer, ready to hand to a controller push
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// Fill the whole canvas with one color
    pub fn clear(&mut self, color: PanelColor) {
        let fill = match color {
            PanelColor::White => 0xFF,
            PanelColor::Black => 0x00,
        };
        self.bytes.fill(fill);
    }

    /// Set one pixel; out-of-range coordinates are ignored
    // SAFETY: x < width and y < height are checked before use, so the byte
    // index is bounded by row_bytes * height == bytes.len().
    #[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: PanelColor) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.row_bytes() + x as usize / 8;
        let mask = 0x80u8 >> (x % 8);
        match color {
            PanelColor::White => self.bytes[idx] |= mask,
            PanelColor::Black => self.bytes[idx] &= !mask,
        }
    }

    /// Get one pixel, or None when out of range
    // SAFETY: bounds checked as in set_pixel.
    #[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<PanelColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.row_bytes() + x as usize / 8;
        let mask = 0x80u8 >> (x % 8);
        if self.bytes[idx] & mask != 0 {
            Some(PanelColor::White)
        } else {
            Some(PanelColor::Black)
        }
    }

    /// Count black pixels (test and diagnostics helper)
    pub fn black_pixel_count(&self) -> usize {
        let mut count = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) == Some(PanelColor::Black) {
                    count = count.saturating_add(1);
                }
            }
        }
        count
    }
}

impl OriginDimensions for MonoCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// embedded-graphics integration: `BinaryColor::On` paints black.
///
/// Lets diagnostics and overlays draw primitives straight onto the canvas
/// the same way they would onto any other e-ink draw target.
impl DrawTarget for MonoCanvas {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let paint = match color {
                BinaryColor::On => PanelColor::Black,
                BinaryColor::Off => PanelColor::White,
            };
            // SAFETY: non-negative is checked above; set_pixel clips to the
            // canvas bounds.
            #[allow(clippy::cast_sign_loss)]
            self.set_pixel(point.x as u32, point.y as u32, paint);
        }
        Ok(())
    }
}
