//! Framebuffer → monochrome conversion
//!
//! Walks the overlap between the source frame and the panel canvas, decodes
//! each pixel per the source depth, reduces it to an integer luminance, and
//! thresholds it onto the canvas.
//!
//! Two deliberate sharp edges, both product behavior:
//!
//! - **Tone inversion**: pixels *brighter* than the threshold are painted
//!   *black*. The panel shows a negative of the framebuffer ("INVERTED"
//!   mode). Tests assert this explicitly rather than silently preserving it.
//! - **Channel order**: 32/24-bit frames are decoded as little-endian
//!   BGR(A/X), the layout of common Linux framebuffers. A port to hardware
//!   with a different layout changes [`PixelFormat`], not the conversion.

use crate::framesource::FrameSnapshot;
use epd::{MonoCanvas, PanelColor};

/// One decoded source pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red, 0-255
    pub r: u8,
    /// Green, 0-255
    pub g: u8,
    /// Blue, 0-255
    pub b: u8,
}

/// Source pixel memory layouts, selected by fbdev pixel depth
///
/// Variant names describe the byte order actually read, lowest address
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32bpp little-endian: bytes B, G, R, then an ignored alpha/padding byte
    Bgra8888,
    /// 24bpp little-endian: bytes B, G, R
    Bgr888,
    /// 16bpp little-endian RGB565
    Rgb565,
    /// Anything else: one byte, shared by all three channels
    Gray8,
}

impl PixelFormat {
    /// Select the decode layout for an fbdev pixel depth
    pub fn from_bpp(bits_per_pixel: u32) -> Self {
        match bits_per_pixel {
            32 => PixelFormat::Bgra8888,
            24 => PixelFormat::Bgr888,
            16 => PixelFormat::Rgb565,
            _ => PixelFormat::Gray8,
        }
    }
}

/// Decode one pixel at `offset` into `data`
///
/// Reads are bounds-checked; a truncated pixel at the very end of the
/// buffer decodes its missing bytes as zero.
// SAFETY: the 16-bit assembly shifts a u8-sourced value by 8 within a u16;
// no overflow is possible.
#[allow(clippy::arithmetic_side_effects)]
pub fn decode_pixel(data: &[u8], offset: usize, format: PixelFormat) -> Rgb {
    let byte = |i: usize| data.get(i).copied().unwrap_or(0);
    match format {
        PixelFormat::Bgra8888 | PixelFormat::Bgr888 => Rgb {
            b: byte(offset),
            g: byte(offset.saturating_add(1)),
            r: byte(offset.saturating_add(2)),
        },
        PixelFormat::Rgb565 => {
            let lo = byte(offset) as u16;
            let hi = byte(offset.saturating_add(1)) as u16;
            let pixel = (hi << 8) | lo;
            expand_rgb565(pixel)
        }
        PixelFormat::Gray8 => {
            let v = byte(offset);
            Rgb { r: v, g: v, b: v }
        }
    }
}

/// Unpack a little-endian RGB565 value to 8-bit channels
///
/// Channels are expanded by replicating their top bits into the low bits
/// (`(c5 << 3) | (c5 >> 2)`, `(c6 << 2) | (c6 >> 4)`) so full-scale 5/6-bit
/// values map to 255, not 248/252.
// SAFETY: all shifts operate on masked 5/6-bit values; results fit in u8.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub fn expand_rgb565(pixel: u16) -> Rgb {
    let r5 = ((pixel >> 11) & 0x1F) as u8;
    let g6 = ((pixel >> 5) & 0x3F) as u8;
    let b5 = (pixel & 0x1F) as u8;
    Rgb {
        r: (r5 << 3) | (r5 >> 2),
        g: (g6 << 2) | (g6 >> 4),
        b: (b5 << 3) | (b5 >> 2),
    }
}

/// Luminance formula choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LumaFormula {
    /// ITU-R BT.601 integer weights: `(r*299 + g*587 + b*114) / 1000`
    Bt601Weighted,
    /// Flat channel average: `(r + g + b) / 3`
    FlatAverage,
}

/// Conversion policy: luminance formula plus black threshold
///
/// Formula and threshold are policy, not algorithm — the historical flat
/// and weighted conversion routines collapse into one parameterized pass
/// over these presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumaPolicy {
    formula: LumaFormula,
    /// Luminance above this paints black (strict comparison)
    pub threshold: u8,
}

impl LumaPolicy {
    /// Perceptual BT.601 weighting with threshold 64 — the daemon default
    pub const WEIGHTED: Self = Self {
        formula: LumaFormula::Bt601Weighted,
        threshold: 64,
    };

    /// Legacy flat average with threshold 128
    pub const FLAT: Self = Self {
        formula: LumaFormula::FlatAverage,
        threshold: 128,
    };

    /// Compute the 0-255 luminance of one pixel
    // SAFETY: with u8 channels the weighted sum is at most 255_000 (fits in
    // u32) and both quotients are at most 255.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    pub fn luminance(&self, rgb: Rgb) -> u8 {
        let (r, g, b) = (rgb.r as u32, rgb.g as u32, rgb.b as u32);
        match self.formula {
            LumaFormula::Bt601Weighted => ((r * 299 + g * 587 + b * 114) / 1000) as u8,
            LumaFormula::FlatAverage => ((r + g + b) / 3) as u8,
        }
    }

    /// Whether a pixel of this luminance is painted black
    ///
    /// Strict `>`: luminance exactly at the threshold stays background.
    /// Bright source pixels become black — the inverted product mode.
    pub fn paints_black(&self, luminance: u8) -> bool {
        luminance > self.threshold
    }
}

impl Default for LumaPolicy {
    fn default() -> Self {
        Self::WEIGHTED
    }
}

/// Binarize one frame onto the canvas
///
/// Clears the canvas to white, then paints the overlap
/// `min(frame, canvas)` in both axes; pixels outside the overlap stay
/// white. Pure data transform — no error paths.
// SAFETY: y and x are clipped below the visible resolution, and the
// snapshot validated that visible rows fit inside the stride and that the
// buffer covers virtual_height × stride bytes, so every computed offset is
// in range.
#[allow(clippy::arithmetic_side_effects)]
pub fn convert(frame: &FrameSnapshot, canvas: &mut MonoCanvas, policy: LumaPolicy) {
    canvas.clear(PanelColor::White);

    let geometry = frame.geometry();
    let data = frame.data();
    let format = PixelFormat::from_bpp(geometry.bits_per_pixel);
    let bytes_per_pixel = geometry.bytes_per_pixel();

    let rows = canvas.height().min(geometry.height);
    let cols = canvas.width().min(geometry.width);

    for y in 0..rows {
        let row_base = y as usize * geometry.stride;
        for x in 0..cols {
            let offset = row_base + x as usize * bytes_per_pixel;
            let rgb = decode_pixel(data, offset, format);
            if policy.paints_black(policy.luminance(rgb)) {
                canvas.set_pixel(x, y, PanelColor::Black);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
    use super::*;
    use crate::framesource::FrameGeometry;
    use epd::PanelColor;

    fn snapshot(width: u32, height: u32, bpp: u32, bytes: Vec<u8>) -> FrameSnapshot {
        let geometry = FrameGeometry {
            width,
            height,
            virtual_height: height,
            bits_per_pixel: bpp,
            stride: width as usize * (bpp / 8).max(1) as usize,
        };
        FrameSnapshot::from_bytes(geometry, bytes).unwrap()
    }

    #[test]
    fn test_bgr_decode_order() {
        // Bytes on disk: B=10, G=20, R=30
        let rgb = decode_pixel(&[10, 20, 30, 0], 0, PixelFormat::Bgra8888);
        assert_eq!(rgb, Rgb { r: 30, g: 20, b: 10 });

        let rgb = decode_pixel(&[10, 20, 30], 0, PixelFormat::Bgr888);
        assert_eq!(rgb, Rgb { r: 30, g: 20, b: 10 });
    }

    #[test]
    fn test_rgb565_full_scale_expands_to_255() {
        let rgb = expand_rgb565(0xFFFF);
        assert_eq!(rgb, Rgb { r: 255, g: 255, b: 255 });
    }

    #[test]
    fn test_rgb565_expansion_replicates_top_bits() {
        // Red = 0b10000 → (16 << 3) | (16 >> 2) = 128 | 4 = 132
        let rgb = expand_rgb565(0b10000_000000_00000);
        assert_eq!(rgb.r, 132);
        // Green = 0b100000 → (32 << 2) | (32 >> 4) = 128 | 2 = 130
        let rgb = expand_rgb565(0b00000_100000_00000);
        assert_eq!(rgb.g, 130);
        // Blue = 0b00001 → (1 << 3) | 0 = 8
        let rgb = expand_rgb565(0b00000_000000_00001);
        assert_eq!(rgb.b, 8);
    }

    #[test]
    fn test_gray8_fallback_shares_byte() {
        let rgb = decode_pixel(&[77], 0, PixelFormat::Gray8);
        assert_eq!(rgb, Rgb { r: 77, g: 77, b: 77 });
    }

    #[test]
    fn test_format_from_bpp() {
        assert_eq!(PixelFormat::from_bpp(32), PixelFormat::Bgra8888);
        assert_eq!(PixelFormat::from_bpp(24), PixelFormat::Bgr888);
        assert_eq!(PixelFormat::from_bpp(16), PixelFormat::Rgb565);
        assert_eq!(PixelFormat::from_bpp(8), PixelFormat::Gray8);
        assert_eq!(PixelFormat::from_bpp(1), PixelFormat::Gray8);
    }

    #[test]
    fn test_weighted_luminance_truncates() {
        // (30*299 + 20*587 + 10*114) / 1000 = (8970 + 11740 + 1140) / 1000 = 21
        let luma = LumaPolicy::WEIGHTED.luminance(Rgb { r: 30, g: 20, b: 10 });
        assert_eq!(luma, 21);
        let luma = LumaPolicy::WEIGHTED.luminance(Rgb { r: 255, g: 255, b: 255 });
        assert_eq!(luma, 255);
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        assert!(!LumaPolicy::WEIGHTED.paints_black(64));
        assert!(LumaPolicy::WEIGHTED.paints_black(65));
        assert!(!LumaPolicy::FLAT.paints_black(128));
        assert!(LumaPolicy::FLAT.paints_black(129));
    }

    #[test]
    fn test_inverted_checkerboard_scenario() {
        // 2×2 BGRA: white, black / black, white — the spec's worked example
        let frame = snapshot(
            2,
            2,
            32,
            vec![
                255, 255, 255, 0, /* (0,0) white */
                0, 0, 0, 0, /* (1,0) black */
                0, 0, 0, 0, /* (0,1) black */
                255, 255, 255, 0, /* (1,1) white */
            ],
        );
        let mut canvas = MonoCanvas::new(2, 2);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);

        // Inverted: bright source pixels render black
        assert_eq!(canvas.get_pixel(0, 0), Some(PanelColor::Black));
        assert_eq!(canvas.get_pixel(1, 1), Some(PanelColor::Black));
        assert_eq!(canvas.get_pixel(1, 0), Some(PanelColor::White));
        assert_eq!(canvas.get_pixel(0, 1), Some(PanelColor::White));
    }

    #[test]
    fn test_source_smaller_than_canvas_leaves_margin_white() {
        // 1×1 bright frame on a 4×4 canvas
        let frame = snapshot(1, 1, 32, vec![255, 255, 255, 0]);
        let mut canvas = MonoCanvas::new(4, 4);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);

        assert_eq!(canvas.get_pixel(0, 0), Some(PanelColor::Black));
        assert_eq!(canvas.black_pixel_count(), 1);
    }

    #[test]
    fn test_source_larger_than_canvas_clips() {
        // 4×4 all-bright frame on a 2×2 canvas: converts without panicking,
        // everything in range is black
        let frame = snapshot(4, 4, 32, vec![255u8; 64]);
        let mut canvas = MonoCanvas::new(2, 2);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);
        assert_eq!(canvas.black_pixel_count(), 4);
    }

    #[test]
    fn test_convert_clears_previous_contents() {
        let mut canvas = MonoCanvas::new(2, 2);
        canvas.clear(PanelColor::Black);

        let frame = snapshot(2, 2, 32, vec![0u8; 16]); // all-dark source
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);
        // Dark source + inversion → fully white output, stale black gone
        assert_eq!(canvas.black_pixel_count(), 0);
    }

    #[test]
    fn test_flat_preset_matches_legacy_behavior() {
        // Flat average 150 > 128 paints black; weighted would also, but a
        // saturated blue (flat 85, weighted 29) shows the presets diverge.
        let gray = Rgb { r: 150, g: 150, b: 150 };
        assert!(LumaPolicy::FLAT.paints_black(LumaPolicy::FLAT.luminance(gray)));

        let blue = Rgb { r: 0, g: 0, b: 255 };
        assert!(!LumaPolicy::FLAT.paints_black(LumaPolicy::FLAT.luminance(blue)));
        assert!(!LumaPolicy::WEIGHTED.paints_black(LumaPolicy::WEIGHTED.luminance(blue)));

        // Saturated green: flat 85 stays white, weighted 149 paints black
        let green = Rgb { r: 0, g: 255, b: 0 };
        assert!(!LumaPolicy::FLAT.paints_black(LumaPolicy::FLAT.luminance(green)));
        assert!(LumaPolicy::WEIGHTED.paints_black(LumaPolicy::WEIGHTED.luminance(green)));
    }

    #[test]
    fn test_rgb565_frame_converts() {
        // One white (0xFFFF) and one black (0x0000) 16-bit pixel
        let frame = snapshot(2, 1, 16, vec![0xFF, 0xFF, 0x00, 0x00]);
        let mut canvas = MonoCanvas::new(2, 1);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);
        assert_eq!(canvas.get_pixel(0, 0), Some(PanelColor::Black));
        assert_eq!(canvas.get_pixel(1, 0), Some(PanelColor::White));
    }

    #[test]
    fn test_gray8_frame_converts() {
        let frame = snapshot(2, 1, 8, vec![200, 10]);
        let mut canvas = MonoCanvas::new(2, 1);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);
        assert_eq!(canvas.get_pixel(0, 0), Some(PanelColor::Black));
        assert_eq!(canvas.get_pixel(1, 0), Some(PanelColor::White));
    }

    #[test]
    fn test_stride_padding_respected() {
        // 1 visible pixel per row, stride 8: the padding bytes are bright
        // but must never be decoded as pixels.
        let geometry = FrameGeometry {
            width: 1,
            height: 2,
            virtual_height: 2,
            bits_per_pixel: 32,
            stride: 8,
        };
        let bytes = vec![
            0, 0, 0, 0, 255, 255, 255, 255, // row 0: dark pixel + padding
            0, 0, 0, 0, 255, 255, 255, 255, // row 1
        ];
        let frame = FrameSnapshot::from_bytes(geometry, bytes).unwrap();
        let mut canvas = MonoCanvas::new(4, 4);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);
        assert_eq!(canvas.black_pixel_count(), 0);
    }
}
