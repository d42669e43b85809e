//! Property-based tests for the conversion math.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use epd::{MonoCanvas, PanelColor};
use fbmirror::convert::{convert, decode_pixel, expand_rgb565, LumaPolicy, PixelFormat};
use fbmirror::framesource::{FrameGeometry, FrameSnapshot};

proptest::proptest! {
    /// RGB565 expansion replicates top bits for every 16-bit value.
    #[test]
    fn rgb565_expansion_matches_formula(pixel in 0u16..=u16::MAX) {
        let rgb = expand_rgb565(pixel);
        let r5 = ((pixel >> 11) & 0x1F) as u8;
        let g6 = ((pixel >> 5) & 0x3F) as u8;
        let b5 = (pixel & 0x1F) as u8;
        assert_eq!(rgb.r, (r5 << 3) | (r5 >> 2));
        assert_eq!(rgb.g, (g6 << 2) | (g6 >> 4));
        assert_eq!(rgb.b, (b5 << 3) | (b5 >> 2));
    }

    /// Full-scale channels always expand to exactly 255 and zero to 0.
    #[test]
    fn rgb565_expansion_covers_full_range(pixel in 0u16..=u16::MAX) {
        let rgb = expand_rgb565(pixel);
        if pixel & 0xF800 == 0xF800 { assert_eq!(rgb.r, 255); }
        if pixel & 0x07E0 == 0x07E0 { assert_eq!(rgb.g, 255); }
        if pixel & 0x001F == 0x001F { assert_eq!(rgb.b, 255); }
        if pixel & 0xF800 == 0 { assert_eq!(rgb.r, 0); }
    }

    /// BT.601 weighted luminance of a [B,G,R] triple matches the integer
    /// formula, independent of surrounding bytes.
    #[test]
    fn weighted_luminance_matches_formula(b in 0u8..=255, g in 0u8..=255, r in 0u8..=255) {
        let data = [b, g, r, 0];
        let rgb = decode_pixel(&data, 0, PixelFormat::Bgra8888);
        let expected = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
        assert_eq!(LumaPolicy::WEIGHTED.luminance(rgb) as u32, expected);
    }

    /// A single-pixel frame lands black iff its luminance exceeds the
    /// threshold, and the conversion never touches out-of-overlap pixels.
    #[test]
    fn threshold_decides_pixel_color(b in 0u8..=255, g in 0u8..=255, r in 0u8..=255) {
        let geometry = FrameGeometry {
            width: 1,
            height: 1,
            virtual_height: 1,
            bits_per_pixel: 32,
            stride: 4,
        };
        let frame = FrameSnapshot::from_bytes(geometry, vec![b, g, r, 0]).unwrap();
        let mut canvas = MonoCanvas::new(3, 3);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);

        let rgb = decode_pixel(&[b, g, r, 0], 0, PixelFormat::Bgra8888);
        let expect_black = LumaPolicy::WEIGHTED.luminance(rgb) > 64;
        let expected = if expect_black { PanelColor::Black } else { PanelColor::White };
        assert_eq!(canvas.get_pixel(0, 0), Some(expected));

        // Everything outside the 1×1 overlap stays white
        assert_eq!(canvas.black_pixel_count(), usize::from(expect_black));
    }

    /// The painted area is exactly the overlap min(source, panel) for any
    /// combination of source and panel sizes (all-bright source).
    #[test]
    fn overlap_clipping_is_exact(
        src_w in 1u32..=6, src_h in 1u32..=6,
        panel_w in 1u32..=6, panel_h in 1u32..=6,
    ) {
        let geometry = FrameGeometry {
            width: src_w,
            height: src_h,
            virtual_height: src_h,
            bits_per_pixel: 32,
            stride: src_w as usize * 4,
        };
        let bytes = vec![255u8; geometry.mapped_len()];
        let frame = FrameSnapshot::from_bytes(geometry, bytes).unwrap();

        let mut canvas = MonoCanvas::new(panel_w, panel_h);
        convert(&frame, &mut canvas, LumaPolicy::WEIGHTED);

        let overlap = (src_w.min(panel_w) * src_h.min(panel_h)) as usize;
        assert_eq!(canvas.black_pixel_count(), overlap);
    }
}
