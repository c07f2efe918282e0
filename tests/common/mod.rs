//! In-memory media sources for decoder tests.
//!
//! [`MockSource`] serves a fixed list of presentation times. Readers opened
//! on it deliver every frame at or after their start offset, record what
//! they were asked for, and can be told to fail partway through.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use seekframe::{
    AffineTransform, DecodedFrame, MediaOpener, MediaSource, OutputSettings, ReaderFault,
    ReaderStatus, SampleReader, SeekFrameError, Size, VideoTrack,
};

pub const FPS: f64 = 30.0;

/// Frame times `k / fps` for every frame inside `duration`.
pub fn frame_times(fps: f64, duration: f64) -> Vec<Option<f64>> {
    let count = (duration * fps).round() as usize;
    (0..count).map(|index| Some(index as f64 / fps)).collect()
}

pub fn close(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() < 1e-9
}

/// What the next reader should do after delivering some samples.
#[derive(Debug, Clone)]
pub struct PlannedFault {
    pub after_samples: usize,
    pub fault: ReaderFault,
}

pub struct MockSource {
    identifier: String,
    readable: AtomicBool,
    duration: f64,
    track: Option<VideoTrack>,
    has_alpha: bool,
    times: Vec<Option<f64>>,
    fail_next_open: AtomicBool,
    planned_fault: Mutex<Option<PlannedFault>>,
    opened_at: Mutex<Vec<(f64, OutputSettings)>>,
    pulls: Arc<AtomicU64>,
}

impl MockSource {
    /// A 1920x1080 track at `fps` with one frame per `1 / fps` seconds.
    pub fn video(identifier: &str, fps: f64, duration: f64) -> Self {
        Self::with_times(identifier, fps, duration, frame_times(fps, duration))
    }

    pub fn with_times(identifier: &str, fps: f64, duration: f64, times: Vec<Option<f64>>) -> Self {
        Self {
            identifier: identifier.to_string(),
            readable: AtomicBool::new(true),
            duration,
            track: Some(VideoTrack {
                stream_index: 0,
                natural_size: Size::new(1920, 1080),
                nominal_frame_rate: fps,
                transform: AffineTransform::IDENTITY,
                timescale: 90_000,
                duration,
            }),
            has_alpha: false,
            times,
            fail_next_open: AtomicBool::new(false),
            planned_fault: Mutex::new(None),
            opened_at: Mutex::new(Vec::new()),
            pulls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A source that opens but has no video track.
    pub fn without_track(identifier: &str) -> Self {
        let mut source = Self::with_times(identifier, 0.0, 0.0, Vec::new());
        source.track = None;
        source
    }

    pub fn with_track(mut self, update: impl FnOnce(&mut VideoTrack)) -> Self {
        if let Some(track) = self.track.as_mut() {
            update(track);
        }
        self
    }

    pub fn with_alpha(mut self) -> Self {
        self.has_alpha = true;
        self
    }

    pub fn set_readable(&self, readable: bool) {
        self.readable.store(readable, Ordering::SeqCst);
    }

    pub fn fail_next_open(&self) {
        self.fail_next_open.store(true, Ordering::SeqCst);
    }

    /// The next reader stops with `fault` right after delivering
    /// `after_samples` samples.
    pub fn fault_next_reader(&self, after_samples: usize, fault: ReaderFault) {
        *self.planned_fault.lock().unwrap() = Some(PlannedFault {
            after_samples,
            fault,
        });
    }

    /// Start offsets and output settings of every reader opened so far.
    pub fn opened(&self) -> Vec<(f64, OutputSettings)> {
        self.opened_at.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened_at.lock().unwrap().len()
    }

    pub fn last_offset(&self) -> Option<f64> {
        self.opened_at.lock().unwrap().last().map(|(offset, _)| *offset)
    }

    /// Samples pulled across all readers.
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::SeqCst)
    }
}

impl MediaSource for MockSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_readable(&self) -> bool {
        self.readable.load(Ordering::SeqCst)
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
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(SeekFrameError::ReaderStart {
                offset: start_offset,
                reason: "mock open failure".to_string(),
            });
        }
        self.opened_at
            .lock()
            .unwrap()
            .push((start_offset, *output));

        let size = if output.size.is_zero() {
            track.natural_size
        } else {
            output.size
        };
        let frames = self
            .times
            .iter()
            .filter(|time| time.is_none_or(|time| time + 1e-9 >= start_offset))
            .copied()
            .collect();
        Ok(Box::new(MockReader {
            frames,
            next: 0,
            delivered: 0,
            size,
            output: *output,
            status: ReaderStatus::Reading,
            fault: None,
            planned_fault: self.planned_fault.lock().unwrap().take(),
            pulls: Arc::clone(&self.pulls),
        }))
    }
}

pub struct MockReader {
    frames: Vec<Option<f64>>,
    next: usize,
    delivered: usize,
    size: Size,
    output: OutputSettings,
    status: ReaderStatus,
    fault: Option<ReaderFault>,
    planned_fault: Option<PlannedFault>,
    pulls: Arc<AtomicU64>,
}

impl SampleReader for MockReader {
    fn next_sample(&mut self) -> Option<DecodedFrame> {
        if self.status != ReaderStatus::Reading {
            return None;
        }
        let Some(time) = self.frames.get(self.next).copied() else {
            self.status = ReaderStatus::Finished;
            return None;
        };
        self.next += 1;
        self.delivered += 1;
        self.pulls.fetch_add(1, Ordering::SeqCst);

        if let Some(planned) = &self.planned_fault {
            if self.delivered >= planned.after_samples {
                self.status = ReaderStatus::Failed;
                self.fault = Some(planned.fault.clone());
            }
        }

        Some(DecodedFrame::new(
            time,
            self.size,
            self.output.pixel_layout,
            Vec::new(),
        ))
    }

    fn status(&self) -> ReaderStatus {
        self.status
    }

    fn fault(&self) -> Option<&ReaderFault> {
        self.fault.as_ref()
    }

    fn cancel(&mut self) {
        self.status = ReaderStatus::Cancelled;
    }
}

/// Opener backed by a registry of mock sources.
#[derive(Default)]
pub struct MockOpener {
    sources: Mutex<HashMap<String, Arc<MockSource>>>,
    broken: Mutex<Vec<String>>,
    opens: AtomicU64,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source: MockSource) -> Arc<MockSource> {
        let source = Arc::new(source);
        self.sources
            .lock()
            .unwrap()
            .insert(source.identifier.clone(), Arc::clone(&source));
        source
    }

    /// Make `identifier` exist but fail to open.
    pub fn break_source(&self, identifier: &str) {
        self.broken.lock().unwrap().push(identifier.to_string());
    }

    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }
}

impl MediaOpener for MockOpener {
    fn open(&self, identifier: &str) -> Result<Arc<dyn MediaSource>, SeekFrameError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().iter().any(|id| id == identifier) {
            return Err(SeekFrameError::FileOpen {
                path: PathBuf::from(identifier),
                reason: "corrupt container".to_string(),
            });
        }
        match self.sources.lock().unwrap().get(identifier) {
            Some(source) => Ok(Arc::clone(source) as Arc<dyn MediaSource>),
            None => Err(SeekFrameError::NotFound(PathBuf::from(identifier))),
        }
    }
}
