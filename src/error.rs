//! Error types for the `seekframe` crate.
//!
//! This module defines [`SeekFrameError`], the unified error type returned by
//! fallible operations in the crate. Most decode-time failures never reach the
//! caller as an error: the decoder absorbs them and reports "no frame"
//! instead. The variants here cover probing, reader start-up, and API misuse.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `seekframe` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeekFrameError {
    /// The source identifier does not resolve to an existing file.
    #[error("Media source not found: {0}")]
    NotFound(PathBuf),

    /// The media file exists but could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source does not contain a decodable video track.
    #[error("No video stream found in {0}")]
    NoVideoStream(String),

    /// A decode was requested before any output geometry was known.
    #[error("Output size is unknown; call update_output_size before decoding")]
    UnknownGeometry,

    /// A sequential reader could not be positioned or started.
    #[error("Failed to start reader at {offset:.3}s: {reason}")]
    ReaderStart {
        /// Start offset in seconds that was requested.
        offset: f64,
        /// Underlying reason the reader could not start.
        reason: String,
    },

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The frame's pixel layout cannot be used for the requested operation.
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while probing or writing images.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for SeekFrameError {
    fn from(error: FfmpegError) -> Self {
        SeekFrameError::FfmpegError(error.to_string())
    }
}
