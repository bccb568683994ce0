//! Image placement within placeholder boxes
//!
//! Two policies live here and are deliberately separate:
//! - [`fit_image`] for ordinary image placeholders: cap width, convert to
//!   EMU, shrink to the box, center, clamp to the slide
//! - [`full_bleed`] for style images, which cover the whole slide

use crate::constants::px_to_emu;

use super::{ImagePlacement, Rect, SlideSize};

/// Compute where an image of `native_px` pixels goes for a placeholder.
///
/// # Arguments
/// * `native_px` - Decoded (width, height) of the image in pixels
/// * `bounds` - The placeholder's box, read before it is removed
/// * `slide` - Slide size; the result never extends past it
/// * `max_width_px` - Optional cap applied to the pixel width first
/// * `dpi` - Pixel density for the pixel to EMU conversion
pub fn fit_image(
    native_px: (u32, u32),
    bounds: &Rect,
    slide: SlideSize,
    max_width_px: Option<u32>,
    dpi: f64,
) -> ImagePlacement {
    let (mut width_px, mut height_px) = (native_px.0.max(1) as f64, native_px.1.max(1) as f64);

    if let Some(max) = max_width_px.filter(|m| *m > 0).map(f64::from) {
        if width_px > max {
            height_px *= max / width_px;
            width_px = max;
        }
    }

    let width_emu = px_to_emu(width_px, dpi);
    let height_emu = px_to_emu(height_px, dpi);

    let scale = calculate_scale(
        width_emu,
        height_emu,
        &[
            (bounds.width, bounds.height),
            (slide.width, slide.height),
        ],
    );

    let width = ((width_emu * scale).floor() as i64).max(1);
    let height = ((height_emu * scale).floor() as i64).max(1);

    let x = center_on_axis(bounds.x, bounds.width, width);
    let y = center_on_axis(bounds.y, bounds.height, height);

    ImagePlacement {
        rect: Rect::new(
            clamp_to_slide(x, width, slide.width),
            clamp_to_slide(y, height, slide.height),
            width,
            height,
        ),
        capped_px: (width_px, height_px),
        scale,
    }
}

/// Frame covering the whole slide
pub fn full_bleed(slide: SlideSize) -> Rect {
    slide.bounds()
}

/// Largest scale, never above 1, that fits every limiting box.
///
/// A non-positive box axis places no constraint on that axis.
fn calculate_scale(width: f64, height: f64, limits: &[(i64, i64)]) -> f64 {
    limits
        .iter()
        .flat_map(|&(w, h)| [(w, width), (h, height)])
        .filter(|&(limit, _)| limit > 0)
        .map(|(limit, size)| limit as f64 / size)
        .fold(1.0_f64, f64::min)
}

fn center_on_axis(start: i64, box_len: i64, len: i64) -> i64 {
    if box_len > len {
        start + (box_len - len) / 2
    } else {
        start
    }
}

fn clamp_to_slide(pos: i64, len: i64, slide_len: i64) -> i64 {
    if slide_len <= 0 {
        return pos.max(0);
    }
    pos.min(slide_len - len).max(0)
}
