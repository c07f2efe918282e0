//! Pixel sizes and preview fitting.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// The empty size. A decoder whose output size is zero refuses to decode.
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    /// Create a size from a width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// The same size with width and height exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Scale `source_width` × `source_height` down to fit inside `bound`.
///
/// The width is fitted first, then the height; aspect ratio is preserved and
/// each resulting dimension is rounded up to the next whole pixel (clamped so
/// it never exceeds the bound). Sources already inside the bound are returned
/// unchanged.
///
/// ```
/// use seekframe::{Size, geometry::scaled_size};
///
/// let preview = scaled_size(3840.0, 2160.0, Size::new(1920, 1920));
/// assert_eq!(preview, Size::new(1920, 1080));
/// ```
pub fn scaled_size(source_width: f64, source_height: f64, bound: Size) -> Size {
    if source_width <= 0.0 || source_height <= 0.0 {
        return Size::ZERO;
    }

    let bound_width = f64::from(bound.width);
    let bound_height = f64::from(bound.height);

    let mut width = source_width;
    let mut height = source_height;
    if width > bound_width {
        let scale = bound_width / width;
        width *= scale;
        height *= scale;
    }
    if height > bound_height {
        let scale = bound_height / height;
        width *= scale;
        height *= scale;
    }

    Size {
        width: (width.ceil() as u32).min(bound.width),
        height: (height.ceil() as u32).min(bound.height),
    }
}
