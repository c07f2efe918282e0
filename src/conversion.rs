//! Internal FFmpeg conversion helpers.
//!
//! Timestamp rescaling and plane packing shared by the FFmpeg source and
//! reader.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

use crate::{
    frame::{PixelLayout, Plane},
    geometry::Size,
};

/// Microseconds per second; the unit `Input::seek` expects.
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Convert a rational to `f64`, `0.0` when the denominator is zero.
pub(crate) fn rational_to_f64(value: Rational) -> f64 {
    if value.denominator() == 0 {
        0.0
    } else {
        f64::from(value.numerator()) / f64::from(value.denominator())
    }
}

/// Rescale a timestamp from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * rational_to_f64(time_base)
}

/// Convert seconds to a container seek timestamp in `AV_TIME_BASE` units.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * AV_TIME_BASE) as i64
}

/// Convert a container duration in `AV_TIME_BASE` units to seconds.
pub(crate) fn container_duration_seconds(duration: i64) -> f64 {
    if duration > 0 {
        duration as f64 / AV_TIME_BASE
    } else {
        0.0
    }
}

/// Copy `rows` rows of `row_bytes` each out of a strided buffer.
pub(crate) fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Vec<u8> {
    if stride == row_bytes {
        return data[..row_bytes * rows].to_vec();
    }
    let mut buffer = Vec::with_capacity(row_bytes * rows);
    for row in 0..rows {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_bytes]);
    }
    buffer
}

/// Pack the planes of a scaled NV12 or YUV420P frame of `size`.
pub(crate) fn frame_planes(frame: &VideoFrame, layout: PixelLayout, size: Size) -> Vec<Plane> {
    let width = size.width as usize;
    let height = size.height as usize;
    let chroma_width = width.div_ceil(2);
    let chroma_height = height.div_ceil(2);

    let plane = |index: usize, row_bytes: usize, rows: usize| Plane {
        data: pack_rows(frame.data(index), frame.stride(index), row_bytes, rows),
        stride: row_bytes,
    };

    match layout {
        PixelLayout::BiPlanar => vec![
            plane(0, width, height),
            plane(1, chroma_width * 2, chroma_height),
        ],
        PixelLayout::Planar => vec![
            plane(0, width, height),
            plane(1, chroma_width, chroma_height),
            plane(2, chroma_width, chroma_height),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_rows_strips_padding() {
        let data = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(pack_rows(&data, 4, 2, 2), vec![1, 2, 3, 4]);
    }

    #[test]
    fn pack_rows_copies_tight_buffers() {
        let data = [1, 2, 3, 4, 5, 6];
        assert_eq!(pack_rows(&data, 3, 3, 2), data.to_vec());
    }

    #[test]
    fn rational_with_zero_denominator() {
        assert_eq!(rational_to_f64(Rational::new(30, 0)), 0.0);
        assert_eq!(rational_to_f64(Rational::new(30000, 1001)), 30000.0 / 1001.0);
    }

    #[test]
    fn timestamps_rescale() {
        assert_eq!(pts_to_seconds(45_000, Rational::new(1, 90_000)), 0.5);
        assert_eq!(seconds_to_seek_timestamp(1.25), 1_250_000);
        assert_eq!(seconds_to_seek_timestamp(-1.0), 0);
        assert_eq!(container_duration_seconds(-5), 0.0);
        assert_eq!(container_duration_seconds(2_000_000), 2.0);
    }
}
