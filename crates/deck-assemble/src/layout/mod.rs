//! Geometry for picture insertion
//!
//! - Rectangles and slide size in EMU
//! - Fitting decoded images into placeholder boxes
//! - Full-bleed frames for style images

mod placement;
mod types;

pub use placement::*;
pub use types::*;
