//! Display orientation decoded from a track's geometric transform.
//!
//! Containers describe how a track should be displayed with a 2×3 affine
//! matrix (`a b c d tx ty`). Only the four right-angle rotations, optionally
//! combined with a horizontal flip, are meaningful for video; anything else
//! is treated as a corrupt transform and falls back to no rotation.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A 2D affine transform in the `[a b 0; c d 0; tx ty 1]` convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    /// Row 0, column 0.
    pub a: f64,
    /// Row 0, column 1.
    pub b: f64,
    /// Row 1, column 0.
    pub c: f64,
    /// Row 1, column 1.
    pub d: f64,
    /// Horizontal translation in pixels.
    pub tx: f64,
    /// Vertical translation in pixels.
    pub ty: f64,
}

impl AffineTransform {
    /// The identity transform.
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Build a transform from its six components.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Decode an FFmpeg display matrix (nine `i32` values, 16.16 fixed point
    /// for the affine part) into a transform.
    pub fn from_display_matrix(matrix: &[i32; 9]) -> Self {
        let fixed = |value: i32| f64::from(value) / 65536.0;
        Self {
            a: fixed(matrix[0]),
            b: fixed(matrix[1]),
            c: fixed(matrix[3]),
            d: fixed(matrix[4]),
            tx: fixed(matrix[6]),
            ty: fixed(matrix[7]),
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Canonical clockwise rotation applied when displaying a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// Quarter turn clockwise.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three quarter turns clockwise.
    Deg270,
}

impl Rotation {
    /// Snap an angle in degrees onto a canonical rotation.
    ///
    /// The angle is first normalized into `[0, 360)` so `450` and `-270` both
    /// map to [`Rotation::Deg90`]. Angles that are not an exact right angle
    /// yield [`Rotation::Deg0`].
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    /// The rotation in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Returns `true` for 90° and 270°, where width and height trade places.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl Display for Rotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}°", self.degrees())
    }
}

/// Rotation plus horizontal mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Orientation {
    /// Clockwise rotation.
    pub rotation: Rotation,
    /// Whether the image is flipped horizontally.
    pub mirrored: bool,
}

impl Orientation {
    /// Classify `transform` for a track whose natural size is
    /// `width` × `height`.
    ///
    /// The angle is `atan2(b, a)` in degrees, rounded up. Four mirror
    /// patterns are recognised by comparing the translation against the
    /// natural size; each one sets the mirror flag and corrects the angle.
    pub fn from_transform(transform: &AffineTransform, width: f64, height: f64) -> Self {
        let AffineTransform { a, b, c, d, tx, ty } = *transform;

        let mut degrees = b.atan2(a).to_degrees().ceil() as i64;
        let mut mirrored = false;

        if tx == width && a == -1.0 && d == 1.0 {
            // Horizontal flip.
            mirrored = true;
            degrees -= 180;
        } else if tx == height && b == -1.0 && c == -1.0 {
            // 90° then flip.
            mirrored = true;
            degrees = (360 - degrees) % 360;
        } else if ty == height && a == 1.0 && d == -1.0 {
            // 180° then flip.
            mirrored = true;
            degrees += 180;
        } else if ty == 0.0 && b == 1.0 && c == 1.0 {
            // 270° then flip.
            mirrored = true;
            degrees = 360 - degrees;
        }

        Self {
            rotation: Rotation::from_degrees(degrees),
            mirrored,
        }
    }
}
