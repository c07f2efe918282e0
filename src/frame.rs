//! Decoded frames handed to consumers.
//!
//! A [`DecodedFrame`] holds chroma-subsampled 4:2:0 image data in one of two
//! layouts: bi-planar (a luma plane followed by one interleaved CbCr plane,
//! NV12) or planar (three separate Y, Cb, Cr planes, I420). Consumers such as
//! GPU renderers dispatch on [`DecodedFrame::layout`]; for everything else
//! [`DecodedFrame::to_rgb_image`] produces an [`image::RgbImage`].

use image::RgbImage;

use crate::{error::SeekFrameError, geometry::Size};

/// Memory layout of a decoded 4:2:0 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelLayout {
    /// Two planes: Y, then interleaved CbCr (NV12). This is the default.
    #[default]
    BiPlanar,
    /// Three planes: Y, Cb, Cr (YUV420P / I420).
    Planar,
}

impl PixelLayout {
    /// Number of planes a frame of this layout carries.
    pub fn plane_count(self) -> usize {
        match self {
            PixelLayout::BiPlanar => 2,
            PixelLayout::Planar => 3,
        }
    }
}

/// One tightly-packed image plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    /// Row-major pixel bytes without padding.
    pub data: Vec<u8>,
    /// Bytes per row.
    pub stride: usize,
}

/// A decoded video sample with its presentation timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    presentation_time: Option<f64>,
    size: Size,
    layout: PixelLayout,
    planes: Vec<Plane>,
}

impl DecodedFrame {
    /// Assemble a frame from already-packed planes.
    ///
    /// `presentation_time` is `None` when the source did not provide a
    /// usable timestamp; such frames are skipped by the decoder.
    pub fn new(
        presentation_time: Option<f64>,
        size: Size,
        layout: PixelLayout,
        planes: Vec<Plane>,
    ) -> Self {
        Self {
            presentation_time,
            size,
            layout,
            planes,
        }
    }

    /// Presentation timestamp in seconds, if it is valid.
    pub fn presentation_time(&self) -> Option<f64> {
        self.presentation_time.filter(|time| time.is_finite())
    }

    /// Pixel dimensions of the luma plane.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Plane layout.
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// All planes, luma first.
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Convert to packed RGB using BT.601 limited-range coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`SeekFrameError::UnsupportedPixelLayout`] if the planes do not
    /// match the frame's layout and size.
    pub fn to_rgb_image(&self) -> Result<RgbImage, SeekFrameError> {
        let width = self.size.width as usize;
        let height = self.size.height as usize;
        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);

        if self.planes.len() != self.layout.plane_count() {
            return Err(SeekFrameError::UnsupportedPixelLayout(format!(
                "{:?} frame carries {} planes",
                self.layout,
                self.planes.len()
            )));
        }

        let luma = &self.planes[0];
        check_plane(luma, width, height, "luma")?;
        match self.layout {
            PixelLayout::BiPlanar => {
                check_plane(&self.planes[1], chroma_width * 2, chroma_height, "CbCr")?
            }
            PixelLayout::Planar => {
                check_plane(&self.planes[1], chroma_width, chroma_height, "Cb")?;
                check_plane(&self.planes[2], chroma_width, chroma_height, "Cr")?;
            }
        }

        let mut buffer = Vec::with_capacity(width * height * 3);
        for row in 0..height {
            for column in 0..width {
                let y = luma.data[row * luma.stride + column];
                let (cb, cr) = self.chroma_at(row / 2, column / 2);
                buffer.extend_from_slice(&ycbcr_to_rgb(y, cb, cr));
            }
        }

        RgbImage::from_raw(self.size.width, self.size.height, buffer).ok_or_else(|| {
            SeekFrameError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }

    fn chroma_at(&self, row: usize, column: usize) -> (u8, u8) {
        match self.layout {
            PixelLayout::BiPlanar => {
                let plane = &self.planes[1];
                let offset = row * plane.stride + column * 2;
                (plane.data[offset], plane.data[offset + 1])
            }
            PixelLayout::Planar => {
                let cb = &self.planes[1];
                let cr = &self.planes[2];
                (
                    cb.data[row * cb.stride + column],
                    cr.data[row * cr.stride + column],
                )
            }
        }
    }
}

fn check_plane(
    plane: &Plane,
    row_bytes: usize,
    rows: usize,
    name: &str,
) -> Result<(), SeekFrameError> {
    if plane.stride < row_bytes || plane.data.len() < plane.stride * rows {
        return Err(SeekFrameError::UnsupportedPixelLayout(format!(
            "{name} plane is too small: {} bytes with stride {} for {row_bytes}x{rows}",
            plane.data.len(),
            plane.stride
        )));
    }
    Ok(())
}

fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(cb) - 128;
    let e = i32::from(cr) - 128;
    let clamp = |value: i32| ((value + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e),
        clamp(298 * c - 100 * d - 208 * e),
        clamp(298 * c + 516 * d),
    ]
}
