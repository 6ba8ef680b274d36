//! Common geometry shared by the input pipeline and the video compositor.
//!
//! This crate provides:
//! - [`Point`] - 2D point with i32 coordinates
//! - [`Rect`] - Rectangle with position and dimensions
//! - [`scale_source_to_destination`] - aspect-correct fit of the stream into a window

/// A 2D point with integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle defined by top-left position and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Get the right edge (x + width).
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Get the bottom edge (y + height).
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Check if a point is contained within this rectangle.
    pub const fn contains_point(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// True when either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Translate a point into this rectangle's local space, clamped to
    /// `0..=width` and `0..=height`.
    pub fn relative_clamped(&self, px: i32, py: i32) -> Point {
        let x = (px - self.x).clamp(0, self.width as i32);
        let y = (py - self.y).clamp(0, self.height as i32);
        Point::new(x, y)
    }
}

/// Fit `src` into `dst` preserving the source aspect ratio, centering the
/// result along the axis with spare room.
///
/// Only the dimensions of `src` matter. Integer division truncates exactly
/// like the stream's own scaling, so letterbox bars may differ by a pixel.
/// A degenerate source returns `dst` unchanged.
pub fn scale_source_to_destination(src: Rect, dst: Rect) -> Rect {
    if src.is_empty() || dst.is_empty() {
        return dst;
    }

    let (src_w, src_h) = (i64::from(src.width), i64::from(src.height));
    let (dst_w, dst_h) = (i64::from(dst.width), i64::from(dst.height));

    let fit_h = dst_w * src_h / src_w;
    let fit_w = dst_h * src_w / src_h;

    let mut out = dst;
    if fit_h > dst_h {
        out.x += ((dst_w - fit_w) / 2) as i32;
        out.width = fit_w as u32;
    } else {
        out.y += ((dst_h - fit_h) / 2) as i32;
        out.height = fit_h as u32;
    }
    out
}
