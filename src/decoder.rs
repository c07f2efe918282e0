//! Random-access decoding on top of a forward-only reader.
//!
//! [`SeekingDecoder`] answers "give me the frame for time `t`" for arbitrary,
//! possibly backward-jumping sequences of `t`. Sequential readers can only
//! move forward, so for every request the decoder decides whether the live
//! [`DecodeSession`] can be scanned forward to the target or has to be torn
//! down and reopened just before it. The last produced frame is kept so that
//! repeated or nearby requests do not touch the reader at all.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{DecoderOptions, FfmpegOpener, MetadataCache, SeekingDecoder};
//!
//! let cache = Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())));
//! let decoder = SeekingDecoder::new("input.mp4", cache, DecoderOptions::new());
//!
//! for time in [0.0, 0.5, 0.25, 4.0] {
//!     match decoder.decode(time)? {
//!         Some(frame) => println!("{time}s -> {:?}", frame.presentation_time()),
//!         None => println!("{time}s -> no frame"),
//!     }
//! }
//! # Ok::<(), seekframe::SeekFrameError>(())
//! ```

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use crate::{
    cache::MetadataCache,
    configuration::DecoderOptions,
    error::SeekFrameError,
    events::{DecodeEvent, DecodeObserver, ObserverList, SubscriptionId},
    frame::DecodedFrame,
    geometry::Size,
    metadata::MediaDescriptor,
    orientation::Rotation,
    session::DecodeSession,
    source::{MediaKind, MediaSource, OutputSettings, VideoTrack},
    timing::{FrameTiming, floor_to_frame, is_greater, is_greater_or_equal, nearly_equal},
};

/// Coarse lifecycle of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No session has been created since construction or the last clear.
    Uninitialized,
    /// A session is open and still reading.
    SessionActive,
    /// The session ran out of samples, failed, was interrupted, or could not
    /// be created.
    SessionExhausted,
}

/// Why a decode request replaced the reader session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildReason {
    /// First request since construction or clear.
    FirstRequest,
    /// The request is earlier than the previous one.
    BackwardSeek,
    /// The output size changed since the session was opened.
    OutputSizeChanged,
    /// The reader reported a transient fault.
    Interrupted,
    /// The reader failed.
    ReaderFailed,
    /// There was no live session (a previous start failed).
    NoSession,
    /// The request jumped forward by at least the rebuild gap.
    GapExceeded,
}

impl Display for RebuildReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            RebuildReason::FirstRequest => "first request",
            RebuildReason::BackwardSeek => "backward seek",
            RebuildReason::OutputSizeChanged => "output size changed",
            RebuildReason::Interrupted => "reader interrupted",
            RebuildReason::ReaderFailed => "reader failed",
            RebuildReason::NoSession => "no session",
            RebuildReason::GapExceeded => "forward gap exceeded",
        };
        f.write_str(text)
    }
}

/// Counters accumulated over a decoder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStatistics {
    /// Reader sessions successfully started.
    pub sessions_created: u64,
    /// Samples pulled from readers.
    pub samples_pulled: u64,
    /// Pulled samples discarded for lacking a valid timestamp.
    pub invalid_samples_skipped: u64,
    /// Requests answered from the cached frame.
    pub cached_frame_hits: u64,
    /// Requests answered with a freshly pulled frame.
    pub frames_produced: u64,
    /// Requests that produced no frame.
    pub misses: u64,
}

/// Floor `target` onto the frame grid. Flooring absorbs drift between a
/// variable-rate source and a fixed-rate caller.
fn corrected_time(target: f64, frames_per_second: f64) -> f64 {
    if target > 0.0 {
        floor_to_frame(target, frames_per_second)
    } else {
        0.0
    }
}

struct Binding {
    source: Arc<dyn MediaSource>,
    track: VideoTrack,
    rotation: Rotation,
}

struct DecoderInner {
    binding: Option<Binding>,
    session: Option<DecodeSession>,
    last_requested: Option<f64>,
    /// Corrected time the cached frame was last handed out for.
    last_produced: Option<f64>,
    cached_frame: Option<Arc<DecodedFrame>>,
    output_size: Size,
    output_size_changed: bool,
    frames_per_second: f64,
    timing: FrameTiming,
    last_rebuild: Option<RebuildReason>,
    statistics: DecodeStatistics,
}

impl DecoderInner {
    fn new(descriptor: Option<&MediaDescriptor>, options: &DecoderOptions) -> Self {
        let mut inner = Self {
            binding: None,
            session: None,
            last_requested: None,
            last_produced: None,
            cached_frame: None,
            output_size: Size::ZERO,
            output_size_changed: false,
            frames_per_second: options.fallback_frame_rate,
            timing: FrameTiming::new(0.0, options.fallback_frame_rate, 0.0),
            last_rebuild: None,
            statistics: DecodeStatistics::default(),
        };
        if let Some(descriptor) = descriptor {
            inner.bind(descriptor, options);
            inner.output_size = descriptor.display_size();
        }
        inner
    }

    /// Adopt the source, track, and timing of `descriptor`.
    fn bind(&mut self, descriptor: &MediaDescriptor, options: &DecoderOptions) {
        self.binding = match (descriptor.source(), descriptor.track()) {
            (Some(source), Some(track)) => Some(Binding {
                source: Arc::clone(source),
                track: track.clone(),
                rotation: descriptor.rotation,
            }),
            _ => None,
        };

        self.frames_per_second = if descriptor.frames_per_second > 0.0 {
            descriptor.frames_per_second
        } else {
            options.fallback_frame_rate
        };
        let duration = descriptor
            .track()
            .map(|track| track.duration)
            .filter(|duration| *duration > 0.0)
            .unwrap_or(descriptor.duration);
        self.timing = FrameTiming::new(
            self.frames_per_second,
            options.fallback_frame_rate,
            duration,
        );
    }

    fn state(&self) -> DecoderState {
        match (&self.session, self.last_requested) {
            (None, None) => DecoderState::Uninitialized,
            (Some(session), _) if session.is_reading() => DecoderState::SessionActive,
            _ => DecoderState::SessionExhausted,
        }
    }
}

/// Frame-accurate random-access decoder for one source.
///
/// All public methods are internally serialized: concurrent calls on the same
/// decoder block on each other, and results are observed in call order.
/// Decoders for different sources never contend with each other; they only
/// share the [`MetadataCache`], which has its own lock.
pub struct SeekingDecoder {
    identifier: String,
    cache: Arc<MetadataCache>,
    options: DecoderOptions,
    inner: Mutex<DecoderInner>,
    observers: ObserverList,
}

impl Debug for SeekingDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let inner = self.lock();
        f.debug_struct("SeekingDecoder")
            .field("identifier", &self.identifier)
            .field("state", &inner.state())
            .field("output_size", &inner.output_size)
            .field("frames_per_second", &inner.frames_per_second)
            .field("last_requested", &inner.last_requested)
            .field("session", &inner.session)
            .finish_non_exhaustive()
    }
}

impl SeekingDecoder {
    /// Create a decoder for `identifier`.
    ///
    /// Metadata is fetched from `cache` (probing the source on first use).
    /// The output size starts as the source's display size; a source that
    /// cannot be probed leaves it at zero, and decoding is refused until
    /// [`update_output_size`](SeekingDecoder::update_output_size) is called.
    pub fn new(
        identifier: impl Into<String>,
        cache: Arc<MetadataCache>,
        options: DecoderOptions,
    ) -> Self {
        let identifier = identifier.into();
        let descriptor = cache.get(&identifier, MediaKind::Video);
        if descriptor.is_none() {
            log::warn!("No metadata for {identifier}; decoding will produce no frames");
        }
        let inner = DecoderInner::new(descriptor.as_deref(), &options);
        Self {
            identifier,
            cache,
            options,
            inner: Mutex::new(inner),
            observers: ObserverList::default(),
        }
    }

    /// Decode the frame that matches `target` seconds.
    ///
    /// The target is first floored to the source's frame grid. Returns
    /// `Ok(None)` when no frame could be produced (missing source, reader
    /// exhausted or failed); the decoder stays usable and a later request may
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns [`SeekFrameError::UnknownGeometry`] if the output size is zero.
    pub fn decode(&self, target: f64) -> Result<Option<Arc<DecodedFrame>>, SeekFrameError> {
        let started = Instant::now();
        let mut events = Vec::new();

        let frame = {
            let mut inner = self.lock();
            if inner.output_size.is_zero() {
                return Err(SeekFrameError::UnknownGeometry);
            }

            let corrected = corrected_time(target, inner.frames_per_second);
            self.decode_locked(&mut inner, target, corrected, &mut events)
        };

        self.observers.notify(&events);
        log::trace!(
            "decode {target:.4}s for {} took {:.2}ms (hit={})",
            self.identifier,
            started.elapsed().as_secs_f64() * 1000.0,
            frame.is_some(),
        );
        Ok(frame)
    }

    fn decode_locked(
        &self,
        inner: &mut DecoderInner,
        target: f64,
        mut corrected: f64,
        events: &mut Vec<DecodeEvent>,
    ) -> Option<Arc<DecodedFrame>> {
        if let (Some(last), Some(frame)) = (inner.last_produced, &inner.cached_frame) {
            if nearly_equal(last, corrected) {
                inner.statistics.cached_frame_hits += 1;
                events.push(DecodeEvent::CachedFrameReused {
                    requested: corrected,
                });
                return Some(Arc::clone(frame));
            }
        }

        if let Some(reason) = self.rebuild_reason(inner, corrected) {
            // A re-probe may bring a different frame rate.
            self.ensure_readable_binding(inner);
            corrected = corrected_time(target, inner.frames_per_second);
            let offset = self.start_offset(inner, target, corrected);
            self.rebuild_session(inner, offset, reason, events);
            inner.cached_frame = None;
            inner.last_produced = None;
            inner.output_size_changed = false;
        }

        inner.last_requested = Some(corrected);

        let timing = inner.timing;
        if let Some(frame) = &inner.cached_frame {
            if frame
                .presentation_time()
                .is_some_and(|time| timing.is_match(corrected, time))
            {
                inner.last_produced = Some(corrected);
                inner.statistics.cached_frame_hits += 1;
                events.push(DecodeEvent::CachedFrameReused {
                    requested: corrected,
                });
                return Some(Arc::clone(frame));
            }
        }

        let nominal_frame_rate = inner
            .binding
            .as_ref()
            .map_or(0.0, |binding| binding.track.nominal_frame_rate);

        if let Some(session) = inner.session.as_mut() {
            while session.is_reading() && nominal_frame_rate > 0.0 {
                let Some(sample) = session.next_sample() else {
                    break;
                };
                inner.statistics.samples_pulled += 1;

                let Some(time) = sample.presentation_time() else {
                    inner.statistics.invalid_samples_skipped += 1;
                    continue;
                };

                if timing.is_match(corrected, time) {
                    let frame = Arc::new(sample);
                    inner.cached_frame = Some(Arc::clone(&frame));
                    inner.last_produced = Some(corrected);
                    inner.statistics.frames_produced += 1;
                    events.push(DecodeEvent::FrameProduced {
                        requested: corrected,
                        presentation_time: time,
                    });
                    return Some(frame);
                }
            }
        }

        log::debug!(
            "No frame for {corrected:.4}s in {} (state {:?})",
            self.identifier,
            inner.state(),
        );
        inner.statistics.misses += 1;
        events.push(DecodeEvent::NoFrame {
            requested: corrected,
        });
        None
    }

    fn rebuild_reason(&self, inner: &DecoderInner, corrected: f64) -> Option<RebuildReason> {
        let Some(last) = inner.last_requested else {
            return Some(RebuildReason::FirstRequest);
        };
        // Readers only move forward.
        if is_greater(last, corrected) {
            return Some(RebuildReason::BackwardSeek);
        }
        if inner.output_size_changed {
            return Some(RebuildReason::OutputSizeChanged);
        }
        match &inner.session {
            None => return Some(RebuildReason::NoSession),
            Some(session) if session.is_interrupted() => return Some(RebuildReason::Interrupted),
            Some(session) if session.has_failed() => return Some(RebuildReason::ReaderFailed),
            Some(_) => {}
        }
        if is_greater_or_equal(corrected - last, self.options.rebuild_gap) {
            return Some(RebuildReason::GapExceeded);
        }
        None
    }

    /// One frame before the corrected time, pulled back further near the end
    /// of the asset where readers tend to drop the trailing frames.
    fn start_offset(&self, inner: &DecoderInner, target: f64, corrected: f64) -> f64 {
        let mut offset = (corrected - inner.timing.one_frame_duration).max(0.0);
        if inner.timing.asset_duration - target < self.options.end_guard {
            offset = (offset - self.options.end_guard).max(0.0);
        }
        offset
    }

    fn rebuild_session(
        &self,
        inner: &mut DecoderInner,
        offset: f64,
        reason: RebuildReason,
        events: &mut Vec<DecodeEvent>,
    ) {
        if let Some(mut previous) = inner.session.take() {
            previous.cancel();
        }

        let Some(binding) = inner.binding.as_ref() else {
            log::warn!(
                "Cannot start a session for {}: no readable video track",
                self.identifier
            );
            return;
        };

        let output = OutputSettings {
            pixel_layout: self.options.pixel_layout,
            size: if binding.rotation.swaps_axes() {
                inner.output_size.swapped()
            } else {
                inner.output_size
            },
        };

        match DecodeSession::start(binding.source.as_ref(), &binding.track, offset, output) {
            Ok(session) => {
                log::debug!(
                    "Rebuilt session for {} at {offset:.4}s ({reason})",
                    self.identifier
                );
                inner.session = Some(session);
                inner.statistics.sessions_created += 1;
                inner.last_rebuild = Some(reason);
                events.push(DecodeEvent::SessionStarted { offset, reason });
            }
            Err(error) => {
                log::warn!(
                    "Failed to start session for {} at {offset:.4}s: {error}",
                    self.identifier
                );
            }
        }
    }

    /// Re-probe the source through the cache if the bound handle is gone or
    /// no longer readable.
    fn ensure_readable_binding(&self, inner: &mut DecoderInner) {
        let descriptor = match &inner.binding {
            Some(binding) if binding.source.is_readable() => return,
            Some(_) => {
                log::info!(
                    "{} is no longer readable, refreshing metadata",
                    self.identifier
                );
                self.cache.refresh(&self.identifier, MediaKind::Video)
            }
            None => self.cache.get(&self.identifier, MediaKind::Video),
        };
        if let Some(descriptor) = descriptor {
            inner.bind(&descriptor, &self.options);
        }
    }

    /// Change the output size (display orientation).
    ///
    /// The next decode rebuilds the reader at the new size. Setting the
    /// current size again is a no-op.
    pub fn update_output_size(&self, size: Size) {
        let mut inner = self.lock();
        if inner.output_size == size {
            return;
        }
        log::debug!(
            "Output size for {} changed {} -> {size}",
            self.identifier,
            inner.output_size
        );
        inner.cached_frame = None;
        inner.last_produced = None;
        inner.output_size = size;
        inner.output_size_changed = true;
    }

    /// Release the session, the cached frame, and the track binding.
    ///
    /// The decoder returns to [`DecoderState::Uninitialized`]; the next
    /// decode rebinds through the cache. Calling this repeatedly is harmless.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            if let Some(mut session) = inner.session.take() {
                session.cancel();
            }
            inner.cached_frame = None;
            inner.binding = None;
            inner.last_requested = None;
            inner.last_produced = None;
        }
        self.observers.notify(&[DecodeEvent::Cleared]);
    }

    /// Register `observer` for decode events.
    pub fn subscribe(&self, observer: Arc<dyn DecodeObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Remove a previously registered observer. Returns `false` if `id` was
    /// not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Identifier this decoder reads from.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Options the decoder was created with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DecoderState {
        self.lock().state()
    }

    /// Current output size (display orientation).
    pub fn output_size(&self) -> Size {
        self.lock().output_size
    }

    /// Frame rate used to align requests.
    pub fn frames_per_second(&self) -> f64 {
        self.lock().frames_per_second
    }

    /// Duration of one frame in seconds.
    pub fn one_frame_duration(&self) -> f64 {
        self.lock().timing.one_frame_duration
    }

    /// Asset duration in seconds used for end-of-asset handling.
    pub fn asset_duration(&self) -> f64 {
        self.lock().timing.asset_duration
    }

    /// Frame-aligned time of the most recent request.
    pub fn last_requested_time(&self) -> Option<f64> {
        self.lock().last_requested
    }

    /// The cached frame, if any.
    pub fn cached_frame(&self) -> Option<Arc<DecodedFrame>> {
        self.lock().cached_frame.clone()
    }

    /// Start offset of the live session, if any.
    pub fn session_start_offset(&self) -> Option<f64> {
        self.lock()
            .session
            .as_ref()
            .map(DecodeSession::start_offset)
    }

    /// Reason for the most recent session rebuild.
    pub fn last_rebuild_reason(&self) -> Option<RebuildReason> {
        self.lock().last_rebuild
    }

    /// Lifetime counters.
    pub fn statistics(&self) -> DecodeStatistics {
        self.lock().statistics
    }

    fn lock(&self) -> MutexGuard<'_, DecoderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
