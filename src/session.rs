//! One lifetime of a sequential reader.
//!
//! A [`DecodeSession`] owns a [`SampleReader`] positioned at a start offset
//! and hands out frames in presentation order until the reader is exhausted
//! or the session is replaced. Dropping a session cancels its reader.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::{
    error::SeekFrameError,
    frame::DecodedFrame,
    source::{MediaSource, OutputSettings, ReaderFault, ReaderStatus, SampleReader, VideoTrack},
};

/// A reader bound to a start offset and output configuration.
pub struct DecodeSession {
    reader: Box<dyn SampleReader>,
    start_offset: f64,
    output: OutputSettings,
    samples_pulled: u64,
}

impl Debug for DecodeSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodeSession")
            .field("start_offset", &self.start_offset)
            .field("output", &self.output)
            .field("status", &self.reader.status())
            .field("samples_pulled", &self.samples_pulled)
            .finish()
    }
}

impl DecodeSession {
    /// Open a reader on `track` of `source`, positioned at `start_offset`.
    ///
    /// # Errors
    ///
    /// Returns whatever [`MediaSource::open_reader`] reports.
    pub fn start(
        source: &dyn MediaSource,
        track: &VideoTrack,
        start_offset: f64,
        output: OutputSettings,
    ) -> Result<Self, SeekFrameError> {
        let start_offset = start_offset.max(0.0);
        let reader = source.open_reader(track, start_offset, &output)?;
        log::debug!(
            "Started session on {} at {start_offset:.3}s ({:?}, {})",
            source.identifier(),
            output.pixel_layout,
            output.size,
        );
        Ok(Self {
            reader,
            start_offset,
            output,
            samples_pulled: 0,
        })
    }

    /// Offset in seconds the reader was positioned at.
    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }

    /// Output configuration the reader was opened with.
    pub fn output(&self) -> &OutputSettings {
        &self.output
    }

    /// Current reader status.
    pub fn status(&self) -> ReaderStatus {
        self.reader.status()
    }

    /// Returns `true` while more samples may be pulled.
    pub fn is_reading(&self) -> bool {
        self.reader.status() == ReaderStatus::Reading
    }

    /// Returns `true` if the reader failed.
    pub fn has_failed(&self) -> bool {
        self.reader.status() == ReaderStatus::Failed
    }

    /// Returns `true` if the reader reported a transient fault.
    pub fn is_interrupted(&self) -> bool {
        self.reader.fault().is_some_and(ReaderFault::is_transient)
    }

    /// The reader's fault, if any.
    pub fn fault(&self) -> Option<&ReaderFault> {
        self.reader.fault()
    }

    /// Number of samples pulled from this session so far.
    pub fn samples_pulled(&self) -> u64 {
        self.samples_pulled
    }

    /// Pull the next frame in presentation order.
    pub fn next_sample(&mut self) -> Option<DecodedFrame> {
        let sample = self.reader.next_sample()?;
        self.samples_pulled += 1;
        Some(sample)
    }

    /// Cancel the reader. Further pulls return `None`.
    pub fn cancel(&mut self) {
        if self.reader.status() == ReaderStatus::Reading {
            self.reader.cancel();
        }
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
