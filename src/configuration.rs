//! Decoder configuration.
//!
//! [`DecoderOptions`] is a builder for the knobs of
//! [`SeekingDecoder`](crate::SeekingDecoder). The defaults reproduce the
//! behaviour the decoder was tuned for: bi-planar output, rebuilding the
//! reader when a request jumps two seconds or more ahead, and starting half a
//! second earlier near the end of an asset.
//!
//! # Example
//!
//! ```
//! use seekframe::{DecoderOptions, PixelLayout};
//!
//! let options = DecoderOptions::new()
//!     .with_pixel_layout(PixelLayout::Planar)
//!     .with_rebuild_gap(1.0);
//! assert_eq!(options.rebuild_gap(), 1.0);
//! ```

use crate::frame::PixelLayout;

/// Default forward jump, in seconds, that triggers a reader rebuild.
pub const DEFAULT_REBUILD_GAP: f64 = 2.0;

/// Default distance from the end of the asset, in seconds, inside which a
/// rebuilt reader starts an extra [`DEFAULT_END_GUARD`] earlier.
pub const DEFAULT_END_GUARD: f64 = 0.5;

/// Frame rate assumed when a source does not report one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Settings for a [`SeekingDecoder`](crate::SeekingDecoder).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderOptions {
    pub(crate) pixel_layout: PixelLayout,
    pub(crate) rebuild_gap: f64,
    pub(crate) end_guard: f64,
    pub(crate) fallback_frame_rate: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            pixel_layout: PixelLayout::BiPlanar,
            rebuild_gap: DEFAULT_REBUILD_GAP,
            end_guard: DEFAULT_END_GUARD,
            fallback_frame_rate: DEFAULT_FRAME_RATE,
        }
    }

    /// Set the plane layout readers deliver.
    #[must_use]
    pub fn with_pixel_layout(mut self, layout: PixelLayout) -> Self {
        self.pixel_layout = layout;
        self
    }

    /// Set the forward jump (seconds) at which the reader is rebuilt instead
    /// of scanned forward. Negative values are clamped to zero.
    #[must_use]
    pub fn with_rebuild_gap(mut self, seconds: f64) -> Self {
        self.rebuild_gap = seconds.max(0.0);
        self
    }

    /// Set the end-of-asset guard window (seconds). Negative values are
    /// clamped to zero.
    #[must_use]
    pub fn with_end_guard(mut self, seconds: f64) -> Self {
        self.end_guard = seconds.max(0.0);
        self
    }

    /// Set the frame rate assumed for sources without one. Non-positive
    /// values are ignored.
    #[must_use]
    pub fn with_fallback_frame_rate(mut self, frames_per_second: f64) -> Self {
        if frames_per_second > 0.0 {
            self.fallback_frame_rate = frames_per_second;
        }
        self
    }

    /// Plane layout readers deliver.
    pub fn pixel_layout(&self) -> PixelLayout {
        self.pixel_layout
    }

    /// Forward jump that triggers a rebuild.
    pub fn rebuild_gap(&self) -> f64 {
        self.rebuild_gap
    }

    /// End-of-asset guard window.
    pub fn end_guard(&self) -> f64 {
        self.end_guard
    }

    /// Frame rate assumed for sources without one.
    pub fn fallback_frame_rate(&self) -> f64 {
        self.fallback_frame_rate
    }
}
