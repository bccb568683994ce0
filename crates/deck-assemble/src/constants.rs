//! Shared constants for deck assembly
//!
//! Unit conversion lives here so every caller agrees on the same DPI
//! assumption.

// =============================================================================
// Unit Conversion
// =============================================================================

/// English Metric Units per inch (the presentation length unit)
pub const EMU_PER_INCH: i64 = 914_400;

/// Pixel density assumed for images that carry no physical size
pub const DEFAULT_DPI: f64 = 96.0;

/// Convert pixels to EMU at the given pixel density
#[inline]
pub fn px_to_emu(px: f64, dpi: f64) -> f64 {
    px / dpi * EMU_PER_INCH as f64
}

/// Convert EMU to pixels at the given pixel density
#[inline]
pub fn emu_to_px(emu: f64, dpi: f64) -> f64 {
    emu / EMU_PER_INCH as f64 * dpi
}

// =============================================================================
// Slide Defaults
// =============================================================================

/// Slide width used when the presentation part declares none (10")
pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;

/// Slide height used when the presentation part declares none (7.5")
pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

/// Default cap on inserted image width, in source pixels
pub const DEFAULT_MAX_IMAGE_WIDTH_PX: u32 = 600;

/// Largest size one package part may inflate to
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

// =============================================================================
// Placeholders
// =============================================================================

/// Category name reserved for full-bleed style images
pub const STYLE_CATEGORY: &str = "style";

/// Extensions tried, in order, when looking up a style image file
pub const STYLE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_to_emu_at_96_dpi() {
        assert_eq!(px_to_emu(96.0, DEFAULT_DPI), EMU_PER_INCH as f64);
        assert_eq!(px_to_emu(1.0, DEFAULT_DPI), 9525.0);
    }

    #[test]
    fn test_dpi_is_a_parameter() {
        assert_eq!(px_to_emu(72.0, 72.0), EMU_PER_INCH as f64);
        assert!((emu_to_px(px_to_emu(600.0, 150.0), 150.0) - 600.0).abs() < 1e-9);
    }
}
