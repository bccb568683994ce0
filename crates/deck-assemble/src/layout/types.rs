//! Geometry types shared by placement and the deck model
//!
//! All lengths are integer EMU, the unit slide markup stores them in.

/// Axis-aligned rectangle, origin at the slide's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Size of a slide in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideSize {
    pub width: i64,
    pub height: i64,
}

impl SlideSize {
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// Result of fitting an image into a placeholder box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    /// Final frame of the picture on the slide
    pub rect: Rect,
    /// Source pixel size after the max-width cap
    pub capped_px: (f64, f64),
    /// Factor applied after pixel to EMU conversion (at most 1)
    pub scale: f64,
}
