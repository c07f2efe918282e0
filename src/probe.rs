//! Source probing.
//!
//! [`MetadataProbe`] turns an identifier into a [`MediaDescriptor`]: it opens
//! the source through a [`MediaOpener`], reads the primary video track, and
//! derives orientation, preview size, frame rate, and alpha information.
//! Probing is the only place sources are opened; the decoder reuses the
//! handle stored in the descriptor.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{FfmpegOpener, MediaKind, MetadataProbe, Size};
//!
//! let probe = MetadataProbe::new(Arc::new(FfmpegOpener::new()));
//! let descriptor = probe.probe("input.mp4", MediaKind::Video, Size::new(1920, 1920))?;
//! println!("{} rotated {}", descriptor.natural_size, descriptor.rotation);
//! # Ok::<(), seekframe::SeekFrameError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    sync::Arc,
};

use crate::{
    error::SeekFrameError,
    geometry::Size,
    metadata::{MediaDescriptor, preview_size_for},
    orientation::{Orientation, Rotation},
    source::{MediaKind, MediaOpener},
    timing::precised,
};

/// Decimal places kept from a container's nominal frame rate. Rates such as
/// 29.99998 are otherwise enough to push frame-floored times back one frame.
const FRAME_RATE_PRECISION: u32 = 3;

/// Builds [`MediaDescriptor`]s from identifiers.
#[derive(Clone)]
pub struct MetadataProbe {
    opener: Arc<dyn MediaOpener>,
}

impl Debug for MetadataProbe {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MetadataProbe").finish_non_exhaustive()
    }
}

impl MetadataProbe {
    /// Create a probe that opens videos with `opener`.
    pub fn new(opener: Arc<dyn MediaOpener>) -> Self {
        Self { opener }
    }

    /// Probe `identifier` and fit its preview size inside `bound`.
    ///
    /// A video that exists but cannot be opened yields a zeroed, non-video
    /// descriptor rather than an error.
    ///
    /// # Errors
    ///
    /// - [`SeekFrameError::NotFound`] if the identifier does not exist.
    /// - [`SeekFrameError::ImageError`] if an image's header cannot be read.
    pub fn probe(
        &self,
        identifier: &str,
        kind: MediaKind,
        bound: Size,
    ) -> Result<MediaDescriptor, SeekFrameError> {
        match kind {
            MediaKind::Video => self.probe_video(identifier, bound),
            MediaKind::Image => probe_image(identifier, bound),
        }
    }

    fn probe_video(&self, identifier: &str, bound: Size) -> Result<MediaDescriptor, SeekFrameError> {
        let source = match self.opener.open(identifier) {
            Ok(source) => source,
            Err(error @ SeekFrameError::NotFound(_)) => return Err(error),
            Err(error) => {
                log::warn!("Treating {identifier} as unreadable: {error}");
                return Ok(MediaDescriptor::unreadable(identifier, MediaKind::Video));
            }
        };

        let Some(track) = source.video_track() else {
            log::warn!("No video track in {identifier}");
            let mut descriptor = MediaDescriptor::unreadable(identifier, MediaKind::Video);
            descriptor.source = Some(source);
            return Ok(descriptor);
        };

        let natural_size = track.natural_size;
        let orientation = Orientation::from_transform(
            &track.transform,
            f64::from(natural_size.width),
            f64::from(natural_size.height),
        );
        let frames_per_second = if track.nominal_frame_rate > 0.0 {
            precised(track.nominal_frame_rate, FRAME_RATE_PRECISION)
        } else {
            0.0
        };
        let duration = source.duration().max(0.0);
        let has_alpha = source.has_alpha_track();

        log::debug!(
            "Probed {identifier}: {natural_size} rotation={} mirrored={} {frames_per_second:.3} fps {duration:.3}s alpha={has_alpha}",
            orientation.rotation,
            orientation.mirrored,
        );

        Ok(MediaDescriptor {
            identifier: identifier.to_string(),
            kind: MediaKind::Video,
            natural_size,
            rotation: orientation.rotation,
            mirrored: orientation.mirrored,
            frames_per_second,
            duration,
            preview_size: preview_size_for(natural_size, orientation.rotation, bound),
            has_alpha,
            source: Some(source),
            track: Some(track),
        })
    }
}

/// Read an image header for its pixel dimensions.
fn probe_image(identifier: &str, bound: Size) -> Result<MediaDescriptor, SeekFrameError> {
    let path = Path::new(identifier);
    if !path.exists() {
        return Err(SeekFrameError::NotFound(path.to_path_buf()));
    }

    let (width, height) = image::image_dimensions(path)?;
    let natural_size = Size::new(width, height);
    log::debug!("Probed image {identifier}: {natural_size}");

    let mut descriptor = MediaDescriptor::unreadable(identifier, MediaKind::Image);
    descriptor.natural_size = natural_size;
    descriptor.preview_size = preview_size_for(natural_size, Rotation::Deg0, bound);
    Ok(descriptor)
}
