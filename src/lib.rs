//! # seekframe
//!
//! Frame-accurate random access to video: ask for any timestamp, in any
//! order, and get back the decoded frame that belongs to it.
//!
//! Video decoders read forward. `seekframe` puts a small state machine on top
//! of a forward-only reader that decides, per request, whether to keep
//! scanning the live reader or to reopen it just before the target, and it
//! keeps the last produced frame so repeated requests cost nothing. Decoding
//! is powered by FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate; the decoder itself only talks to the [`MediaOpener`],
//! [`MediaSource`], and [`SampleReader`] traits.
//!
//! ## Quick Start
//!
//! ### Scrub a video
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{DecoderOptions, FfmpegOpener, MetadataCache, SeekingDecoder};
//!
//! let cache = Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())));
//! let decoder = SeekingDecoder::new("input.mp4", Arc::clone(&cache), DecoderOptions::new());
//!
//! // Forward, backward, repeated: each request gets the matching frame.
//! for time in [1.0, 1.04, 0.5, 0.5, 7.25] {
//!     if let Some(frame) = decoder.decode(time)? {
//!         println!("{time:.2}s -> pts {:?}", frame.presentation_time());
//!     }
//! }
//! # Ok::<(), seekframe::SeekFrameError>(())
//! ```
//!
//! ### Inspect a source
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{FfmpegOpener, MediaKind, MetadataCache};
//!
//! let cache = MetadataCache::new(Arc::new(FfmpegOpener::new()));
//! if let Some(descriptor) = cache.get("input.mp4", MediaKind::Video) {
//!     println!(
//!         "{} @ {} fps, rotated {}, preview {}",
//!         descriptor.natural_size,
//!         descriptor.frames_per_second,
//!         descriptor.rotation,
//!         descriptor.preview_size,
//!     );
//! }
//! ```
//!
//! ### Save a frame
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{DecoderOptions, FfmpegOpener, MetadataCache, SeekingDecoder};
//!
//! let cache = Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())));
//! let decoder = SeekingDecoder::new("input.mp4", cache, DecoderOptions::new());
//! if let Some(frame) = decoder.decode(3.0)? {
//!     frame.to_rgb_image()?.save("frame.png")?;
//! }
//! # Ok::<(), seekframe::SeekFrameError>(())
//! ```
//!
//! ## Features
//!
//! - **Frame matching**: requests are floored to the source's frame grid and
//!   matched at five decimal places, with a fallback for the last frame
//! - **Reader reuse**: small forward steps scan the live reader; backward
//!   seeks, large jumps, size changes, and reader faults reopen it
//! - **Metadata cache**: shared, explicitly constructed, self-healing when a
//!   source stops being readable
//! - **Orientation**: display matrices decoded into rotation and mirroring
//! - **Frame layouts**: NV12 (bi-planar) or I420 (planar), with RGB
//!   conversion for saving
//! - **Events and statistics**: observers for rebuilds and decode outcomes
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod cache;
pub mod configuration;
mod conversion;
pub mod decoder;
pub mod error;
pub mod events;
pub mod ffmpeg;
pub mod ffmpeg_reader;
pub mod ffmpeg_source;
pub mod frame;
pub mod geometry;
pub mod metadata;
pub mod orientation;
pub mod probe;
pub mod session;
pub mod source;
pub mod timing;

pub use cache::{DEFAULT_PREVIEW_BOUND, MetadataCache};
pub use configuration::DecoderOptions;
pub use decoder::{DecodeStatistics, DecoderState, RebuildReason, SeekingDecoder};
pub use error::SeekFrameError;
pub use events::{DecodeEvent, DecodeObserver, SubscriptionId};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use ffmpeg_reader::FfmpegSampleReader;
pub use ffmpeg_source::{FfmpegOpener, FfmpegSource};
pub use frame::{DecodedFrame, PixelLayout, Plane};
pub use geometry::{Size, scaled_size};
pub use metadata::MediaDescriptor;
pub use orientation::{AffineTransform, Orientation, Rotation};
pub use probe::MetadataProbe;
pub use session::DecodeSession;
pub use source::{
    MediaKind, MediaOpener, MediaSource, OutputSettings, ReaderFault, ReaderStatus, SampleReader,
    VideoTrack,
};
pub use timing::FrameTiming;
