//! FFmpeg-backed media sources.
//!
//! [`FfmpegOpener`] resolves identifiers as file paths, probes them once with
//! `ffmpeg-next`, and returns an [`FfmpegSource`] that remembers the probed
//! track. Every reader opens its own demuxer, so a source can be shared
//! between threads and decoders freely.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::stream::Stream, media::Type};
use ffmpeg_sys_next::{
    AV_PIX_FMT_FLAG_ALPHA, AVPacketSideDataType, AVPixelFormat, av_packet_side_data_get,
    av_pix_fmt_desc_get,
};

use crate::{
    conversion::{container_duration_seconds, pts_to_seconds, rational_to_f64},
    error::SeekFrameError,
    ffmpeg_reader::FfmpegSampleReader,
    geometry::Size,
    orientation::AffineTransform,
    source::{MediaOpener, MediaSource, OutputSettings, SampleReader, VideoTrack},
};

/// Opens files with FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl FfmpegOpener {
    /// Create an opener.
    pub fn new() -> Self {
        Self
    }
}

impl MediaOpener for FfmpegOpener {
    fn open(&self, identifier: &str) -> Result<Arc<dyn MediaSource>, SeekFrameError> {
        Ok(Arc::new(FfmpegSource::open(identifier)?))
    }
}

/// A media file probed with FFmpeg.
pub struct FfmpegSource {
    identifier: String,
    path: PathBuf,
    duration: f64,
    track: Option<VideoTrack>,
    has_alpha: bool,
}

impl Debug for FfmpegSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegSource")
            .field("path", &self.path)
            .field("duration", &self.duration)
            .field("track", &self.track)
            .field("has_alpha", &self.has_alpha)
            .finish_non_exhaustive()
    }
}

impl FfmpegSource {
    /// Probe the file at `identifier`.
    ///
    /// # Errors
    ///
    /// - [`SeekFrameError::NotFound`] if the file does not exist.
    /// - [`SeekFrameError::FileOpen`] if FFmpeg cannot open it or read its
    ///   video codec parameters.
    pub fn open(identifier: &str) -> Result<Self, SeekFrameError> {
        let path = PathBuf::from(identifier);
        if !path.exists() {
            return Err(SeekFrameError::NotFound(path));
        }

        ffmpeg_next::init().map_err(|error| SeekFrameError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| SeekFrameError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let duration = container_duration_seconds(input.duration());
        let (track, has_alpha) = match input.streams().best(Type::Video) {
            Some(stream) => {
                let (track, has_alpha) =
                    read_track(&stream).map_err(|reason| SeekFrameError::FileOpen {
                        path: path.clone(),
                        reason,
                    })?;
                (Some(track), has_alpha)
            }
            None => (None, false),
        };

        log::debug!(
            "Opened {identifier} ({}): {duration:.3}s, video track {:?}",
            input.format().name(),
            track.as_ref().map(|track| track.stream_index),
        );

        Ok(Self {
            identifier: identifier.to_string(),
            path,
            duration,
            track,
            has_alpha,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSource for FfmpegSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_readable(&self) -> bool {
        self.path.is_file()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn video_track(&self) -> Option<VideoTrack> {
        self.track.clone()
    }

    fn has_alpha_track(&self) -> bool {
        self.has_alpha
    }

    fn open_reader(
        &self,
        track: &VideoTrack,
        start_offset: f64,
        output: &OutputSettings,
    ) -> Result<Box<dyn SampleReader>, SeekFrameError> {
        let reader = FfmpegSampleReader::open(&self.path, track, start_offset, output)?;
        Ok(Box::new(reader))
    }
}

fn read_track(stream: &Stream) -> Result<(VideoTrack, bool), String> {
    let parameters = stream.parameters();
    let context = CodecContext::from_parameters(parameters)
        .map_err(|error| format!("Failed to read video codec parameters: {error}"))?;
    let decoder = context
        .decoder()
        .video()
        .map_err(|error| format!("Failed to create video decoder: {error}"))?;

    let mut nominal_frame_rate = rational_to_f64(stream.avg_frame_rate());
    if nominal_frame_rate <= 0.0 {
        nominal_frame_rate = rational_to_f64(stream.rate());
    }

    let time_base = stream.time_base();
    let duration = if stream.duration() > 0 {
        pts_to_seconds(stream.duration(), time_base)
    } else {
        0.0
    };

    let has_alpha = pixel_format_has_alpha(decoder.format().into())
        || stream.metadata().get("alpha_mode") == Some("1");

    let track = VideoTrack {
        stream_index: stream.index(),
        natural_size: Size::new(decoder.width(), decoder.height()),
        nominal_frame_rate,
        transform: display_transform(stream),
        timescale: time_base.denominator(),
        duration,
    };
    Ok((track, has_alpha))
}

/// The stream's display matrix as an affine transform, identity if absent.
fn display_transform(stream: &Stream) -> AffineTransform {
    // SAFETY: `codecpar` belongs to a stream of an open input and outlives
    // this call. `av_packet_side_data_get` only reads the side-data array
    // whose length FFmpeg stores next to it, and a display matrix entry is
    // nine packed `i32`s when its size says so.
    unsafe {
        let parameters = (*stream.as_ptr()).codecpar;
        if parameters.is_null() {
            return AffineTransform::IDENTITY;
        }
        let side_data = av_packet_side_data_get(
            (*parameters).coded_side_data,
            (*parameters).nb_coded_side_data,
            AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
        );
        if side_data.is_null() || (*side_data).size < size_of::<[i32; 9]>() {
            return AffineTransform::IDENTITY;
        }
        let matrix = std::ptr::read_unaligned((*side_data).data as *const [i32; 9]);
        AffineTransform::from_display_matrix(&matrix)
    }
}

fn pixel_format_has_alpha(format: AVPixelFormat) -> bool {
    // SAFETY: `av_pix_fmt_desc_get` returns a pointer into a static table or
    // null for unknown formats.
    unsafe {
        let descriptor = av_pix_fmt_desc_get(format);
        !descriptor.is_null() && (*descriptor).flags & u64::from(AV_PIX_FMT_FLAG_ALPHA) != 0
    }
}
