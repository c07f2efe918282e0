//! Collaborator interfaces for media sources and sequential readers.
//!
//! The decoder never talks to a container or codec directly. It asks a
//! [`MediaOpener`] for a [`MediaSource`], reads track information from it,
//! and pulls frames from a forward-only [`SampleReader`] positioned at a
//! start offset. [`crate::ffmpeg_source::FfmpegOpener`] is the FFmpeg
//! implementation; tests substitute in-memory ones.

use std::sync::Arc;

use crate::{
    error::SeekFrameError,
    frame::{DecodedFrame, PixelLayout},
    geometry::Size,
    orientation::AffineTransform,
};

/// Whether an identifier refers to a still image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// A video container with (at least) one video track.
    Video,
    /// A still image.
    Image,
}

/// Properties of the primary decodable video track.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrack {
    /// Container stream index of the track.
    pub stream_index: usize,
    /// Coded size before any display transform.
    pub natural_size: Size,
    /// Nominal frame rate as reported by the container. May be `0.0`.
    pub nominal_frame_rate: f64,
    /// Display transform.
    pub transform: AffineTransform,
    /// Time units per second used by the track's timestamps.
    pub timescale: i32,
    /// Track duration in seconds, `0.0` if unknown.
    pub duration: f64,
}

/// How a reader should deliver frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputSettings {
    /// Plane layout of produced frames.
    pub pixel_layout: PixelLayout,
    /// Output size in the track's natural orientation. [`Size::ZERO`] keeps
    /// the coded size.
    pub size: Size,
}

/// Lifecycle of a sequential reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    /// More samples may be available.
    Reading,
    /// All samples have been delivered.
    Finished,
    /// The reader stopped because of an error; see [`SampleReader::fault`].
    Failed,
    /// The reader was cancelled.
    Cancelled,
}

/// Why a reader stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderFault {
    /// The reader was interrupted by something outside the decode itself
    /// (system interruption, retryable I/O). Rebuilding the reader is
    /// expected to succeed.
    Interrupted(String),
    /// Any other failure.
    Failed(String),
}

impl ReaderFault {
    /// Returns `true` for faults that a fresh reader should recover from.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReaderFault::Interrupted(_))
    }
}

/// A forward-only producer of decoded frames in presentation order.
pub trait SampleReader: Send {
    /// Pull the next decoded frame, or `None` when the reader is no longer
    /// [`ReaderStatus::Reading`]. May block on I/O and decoding.
    fn next_sample(&mut self) -> Option<DecodedFrame>;

    /// Current status.
    fn status(&self) -> ReaderStatus;

    /// The fault that stopped the reader, if any.
    fn fault(&self) -> Option<&ReaderFault>;

    /// Stop reading and release decoding resources.
    fn cancel(&mut self);
}

/// An opened media resource.
pub trait MediaSource: Send + Sync {
    /// The identifier the source was opened from.
    fn identifier(&self) -> &str;

    /// Returns `false` once the underlying resource can no longer be read
    /// (deleted, moved, revoked).
    fn is_readable(&self) -> bool;

    /// Container duration in seconds.
    fn duration(&self) -> f64;

    /// The primary video track, if the source has one.
    fn video_track(&self) -> Option<VideoTrack>;

    /// Returns `true` if the source carries an alpha channel.
    fn has_alpha_track(&self) -> bool;

    /// Open a reader on `track` that starts delivering frames at
    /// `start_offset` seconds.
    fn open_reader(
        &self,
        track: &VideoTrack,
        start_offset: f64,
        output: &OutputSettings,
    ) -> Result<Box<dyn SampleReader>, SeekFrameError>;
}

/// Opens media sources by identifier.
pub trait MediaOpener: Send + Sync {
    /// Open `identifier`.
    ///
    /// # Errors
    ///
    /// [`SeekFrameError::NotFound`] when the identifier does not resolve to
    /// an existing resource; any other error when it exists but cannot be
    /// opened.
    fn open(&self, identifier: &str) -> Result<Arc<dyn MediaSource>, SeekFrameError>;
}
