//! Per-source metadata.
//!
//! [`MediaDescriptor`] is produced by [`MetadataProbe`](crate::MetadataProbe)
//! and shared through [`MetadataCache`](crate::MetadataCache) as an
//! `Arc<MediaDescriptor>`. It never changes after construction; a new
//! preview bound produces a new descriptor.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    sync::Arc,
};

use crate::{
    geometry::{Size, scaled_size},
    orientation::Rotation,
    source::{MediaKind, MediaSource, VideoTrack},
};

/// Immutable geometry, timing, and format information for one source.
#[derive(Clone)]
#[must_use]
pub struct MediaDescriptor {
    /// Identifier the descriptor was probed from.
    pub identifier: String,
    /// What the identifier was probed as.
    pub kind: MediaKind,
    /// Coded size before rotation.
    pub natural_size: Size,
    /// Clockwise display rotation.
    pub rotation: Rotation,
    /// Whether the track is flipped horizontally.
    pub mirrored: bool,
    /// Nominal frame rate rounded to three decimal places. `0.0` if unknown.
    pub frames_per_second: f64,
    /// Duration in seconds. `0.0` for images and unreadable sources.
    pub duration: f64,
    /// Size fitted inside the cache's preview bound, in display orientation.
    pub preview_size: Size,
    /// Whether the source carries an alpha channel.
    pub has_alpha: bool,
    pub(crate) source: Option<Arc<dyn MediaSource>>,
    pub(crate) track: Option<VideoTrack>,
}

impl Debug for MediaDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaDescriptor")
            .field("identifier", &self.identifier)
            .field("kind", &self.kind)
            .field("natural_size", &self.natural_size)
            .field("rotation", &self.rotation)
            .field("mirrored", &self.mirrored)
            .field("frames_per_second", &self.frames_per_second)
            .field("duration", &self.duration)
            .field("preview_size", &self.preview_size)
            .field("has_alpha", &self.has_alpha)
            .field("has_source", &self.source.is_some())
            .field("track", &self.track)
            .finish()
    }
}

impl MediaDescriptor {
    /// A descriptor for a source that exists but could not be read: every
    /// numeric field is zero and it does not count as a video.
    pub(crate) fn unreadable(identifier: &str, kind: MediaKind) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind,
            natural_size: Size::ZERO,
            rotation: Rotation::Deg0,
            mirrored: false,
            frames_per_second: 0.0,
            duration: 0.0,
            preview_size: Size::ZERO,
            has_alpha: false,
            source: None,
            track: None,
        }
    }

    /// Returns `true` if the descriptor describes a playable video.
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video && self.duration > 0.0 && self.track.is_some()
    }

    /// The opened media source, if probing succeeded.
    pub fn source(&self) -> Option<&Arc<dyn MediaSource>> {
        self.source.as_ref()
    }

    /// The primary video track, if any.
    pub fn track(&self) -> Option<&VideoTrack> {
        self.track.as_ref()
    }

    /// Whether the descriptor is still backed by a readable resource.
    ///
    /// Videos ask their media source; images only need the file to exist.
    pub fn is_readable(&self) -> bool {
        match self.kind {
            MediaKind::Video => self
                .source
                .as_ref()
                .is_some_and(|source| source.is_readable()),
            MediaKind::Image => Path::new(&self.identifier).is_file(),
        }
    }

    /// Natural size in display orientation (swapped for 90° and 270°).
    pub fn display_size(&self) -> Size {
        if self.rotation.swaps_axes() {
            self.natural_size.swapped()
        } else {
            self.natural_size
        }
    }

    /// Copy of this descriptor with the preview size recomputed for `bound`.
    pub fn with_preview_bound(&self, bound: Size) -> Self {
        let mut descriptor = self.clone();
        descriptor.preview_size = preview_size_for(self.natural_size, self.rotation, bound);
        descriptor
    }
}

/// Fit `natural_size`, oriented by `rotation`, inside `bound`.
pub(crate) fn preview_size_for(natural_size: Size, rotation: Rotation, bound: Size) -> Size {
    let oriented = if rotation.swaps_axes() {
        natural_size.swapped()
    } else {
        natural_size
    };
    scaled_size(
        f64::from(oriented.width),
        f64::from(oriented.height),
        bound,
    )
}
