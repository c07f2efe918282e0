//! FFmpeg sequential reader.
//!
//! [`FfmpegSampleReader`] owns a private demuxer and decoder for one video
//! stream. It seeks to the keyframe at or before its start offset, then
//! decodes forward, discarding frames that precede the offset and scaling
//! the rest into the requested layout and size.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::error::{EAGAIN, EINTR},
};

use crate::{
    conversion::{frame_planes, pts_to_seconds, seconds_to_seek_timestamp},
    error::SeekFrameError,
    frame::{DecodedFrame, PixelLayout},
    geometry::Size,
    source::{OutputSettings, ReaderFault, ReaderStatus, SampleReader, VideoTrack},
    timing::is_less,
};

fn output_pixel(layout: PixelLayout) -> Pixel {
    match layout {
        PixelLayout::BiPlanar => Pixel::NV12,
        PixelLayout::Planar => Pixel::YUV420P,
    }
}

/// Consecutive unreadable packets tolerated before the reader gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 32;

/// Demuxer errors that a fresh reader is expected to get past.
fn is_interruption(error: &FfmpegError) -> bool {
    match error {
        FfmpegError::Exit => true,
        FfmpegError::Other { errno } => *errno == EINTR || *errno == EAGAIN,
        _ => false,
    }
}

/// Forward-only reader over one video stream of a file.
pub struct FfmpegSampleReader {
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    start_offset: f64,
    layout: PixelLayout,
    output_size: Size,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    read_errors: u32,
    status: ReaderStatus,
    fault: Option<ReaderFault>,
}

// SAFETY: the reader exclusively owns its demuxer, decoder, and scaler
// contexts. None of them are shared, and the trait only hands out `&mut`
// access, so the contexts are never used from two threads at once.
unsafe impl Send for FfmpegSampleReader {}

impl Debug for FfmpegSampleReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegSampleReader")
            .field("stream_index", &self.stream_index)
            .field("start_offset", &self.start_offset)
            .field("layout", &self.layout)
            .field("output_size", &self.output_size)
            .field("status", &self.status)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl FfmpegSampleReader {
    /// Open `path` and position the reader at `start_offset` seconds.
    ///
    /// # Errors
    ///
    /// - [`SeekFrameError::ReaderStart`] if the file cannot be reopened or
    ///   the seek fails.
    /// - [`SeekFrameError::NoVideoStream`] if the track's stream is gone.
    /// - [`SeekFrameError::FfmpegError`] if the decoder or scaler cannot be
    ///   created.
    pub fn open(
        path: &Path,
        track: &VideoTrack,
        start_offset: f64,
        output: &OutputSettings,
    ) -> Result<Self, SeekFrameError> {
        let reader_start = |reason: String| SeekFrameError::ReaderStart {
            offset: start_offset,
            reason,
        };

        let mut input =
            ffmpeg_next::format::input(&path).map_err(|error| reader_start(error.to_string()))?;

        let (decoder, time_base) = {
            let stream = input
                .stream(track.stream_index)
                .ok_or_else(|| SeekFrameError::NoVideoStream(path.display().to_string()))?;
            let context = CodecContext::from_parameters(stream.parameters())?;
            (context.decoder().video()?, stream.time_base())
        };

        let output_size = if output.size.is_zero() {
            Size::new(decoder.width(), decoder.height())
        } else {
            output.size
        };

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            output_pixel(output.pixel_layout),
            output_size.width,
            output_size.height,
            ScalingFlags::BILINEAR,
        )?;

        if start_offset > 0.0 {
            // RangeTo lets FFmpeg land on the keyframe before the offset.
            let position = seconds_to_seek_timestamp(start_offset);
            input
                .seek(position, ..position)
                .map_err(|error| reader_start(error.to_string()))?;
        }

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index: track.stream_index,
            time_base,
            start_offset,
            layout: output.pixel_layout,
            output_size,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            read_errors: 0,
            status: ReaderStatus::Reading,
            fault: None,
        })
    }

    fn fail(&mut self, fault: ReaderFault) {
        log::debug!("Reader stopped at stream {}: {fault:?}", self.stream_index);
        self.status = ReaderStatus::Failed;
        self.fault = Some(fault);
    }

    fn convert_current_frame(&mut self, time: Option<f64>) -> Result<DecodedFrame, SeekFrameError> {
        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;
        let planes = frame_planes(&self.scaled_frame, self.layout, self.output_size);
        Ok(DecodedFrame::new(time, self.output_size, self.layout, planes))
    }

    /// Feed the decoder one packet. Returns `false` once nothing more can be
    /// fed.
    fn feed(&mut self) -> bool {
        if self.eof_sent {
            self.status = ReaderStatus::Finished;
            return false;
        }

        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => {
                self.read_errors = 0;
                if packet.stream() == self.stream_index {
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        self.fail(ReaderFault::Failed(error.to_string()));
                        return false;
                    }
                }
            }
            Err(FfmpegError::Eof) => {
                if let Err(error) = self.decoder.send_eof() {
                    self.fail(ReaderFault::Failed(error.to_string()));
                    return false;
                }
                self.eof_sent = true;
            }
            Err(error) if is_interruption(&error) => {
                self.fail(ReaderFault::Interrupted(error.to_string()));
                return false;
            }
            Err(error) => {
                self.read_errors += 1;
                if self.read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    self.fail(ReaderFault::Failed(error.to_string()));
                    return false;
                }
                // Damaged packet; keep going.
                log::trace!("Skipping unreadable packet: {error}");
            }
        }
        true
    }
}

impl SampleReader for FfmpegSampleReader {
    fn next_sample(&mut self) -> Option<DecodedFrame> {
        while self.status == ReaderStatus::Reading {
            match self.decoder.receive_frame(&mut self.decoded_frame) {
                Ok(()) => {
                    let time = self
                        .decoded_frame
                        .timestamp()
                        .or_else(|| self.decoded_frame.pts())
                        .map(|pts| pts_to_seconds(pts, self.time_base));

                    if time.is_some_and(|time| is_less(time, self.start_offset)) {
                        continue;
                    }

                    match self.convert_current_frame(time) {
                        Ok(frame) => return Some(frame),
                        Err(error) => {
                            self.fail(ReaderFault::Failed(error.to_string()));
                            return None;
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.status = ReaderStatus::Finished;
                    return None;
                }
                Err(_) => {
                    if !self.feed() {
                        return None;
                    }
                }
            }
        }
        None
    }

    fn status(&self) -> ReaderStatus {
        self.status
    }

    fn fault(&self) -> Option<&ReaderFault> {
        self.fault.as_ref()
    }

    fn cancel(&mut self) {
        if self.status == ReaderStatus::Reading {
            self.decoder.flush();
            self.status = ReaderStatus::Cancelled;
        }
    }
}
