//! Shared metadata cache.
//!
//! [`MetadataCache`] memoizes [`MetadataProbe`] results per identifier. It is
//! an ordinary value: construct one, wrap it in an [`Arc`], and hand it to
//! every [`SeekingDecoder`](crate::SeekingDecoder) that should share it.
//! All reads and writes go through a single mutex, so concurrent callers
//! always observe a consistent map.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seekframe::{FfmpegOpener, MediaKind, MetadataCache, Size};
//!
//! let cache = MetadataCache::new(Arc::new(FfmpegOpener::new()));
//! if let Some(descriptor) = cache.get("input.mp4", MediaKind::Video) {
//!     println!("preview {}", descriptor.preview_size);
//! }
//!
//! // The output surface shrank: refit every cached preview.
//! cache.update_all_preview_sizes(Size::new(1280, 1280));
//! ```

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    geometry::Size,
    metadata::MediaDescriptor,
    probe::MetadataProbe,
    source::{MediaKind, MediaOpener},
};

/// Default preview bound used until [`MetadataCache::update_all_preview_sizes`]
/// is called.
pub const DEFAULT_PREVIEW_BOUND: Size = Size::new(1920, 1920);

struct CacheInner {
    entries: HashMap<String, Arc<MediaDescriptor>>,
    preview_bound: Size,
}

/// Identifier-keyed store of [`MediaDescriptor`]s.
pub struct MetadataCache {
    probe: MetadataProbe,
    inner: Mutex<CacheInner>,
}

impl Debug for MetadataCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let inner = self.lock();
        f.debug_struct("MetadataCache")
            .field("entries", &inner.entries.len())
            .field("preview_bound", &inner.preview_bound)
            .finish()
    }
}

impl MetadataCache {
    /// Create an empty cache that probes sources with `opener`.
    pub fn new(opener: Arc<dyn MediaOpener>) -> Self {
        Self::with_probe(MetadataProbe::new(opener))
    }

    /// Create an empty cache around an existing probe.
    pub fn with_probe(probe: MetadataProbe) -> Self {
        Self {
            probe,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                preview_bound: DEFAULT_PREVIEW_BOUND,
            }),
        }
    }

    /// Set the initial preview bound.
    #[must_use]
    pub fn with_preview_bound(self, bound: Size) -> Self {
        self.lock().preview_bound = bound;
        self
    }

    /// Look up `identifier`, probing it if it is missing or stale.
    ///
    /// An entry is stale once its source is no longer readable. An entry
    /// probed as another [`MediaKind`] is replaced. Probe failures
    /// (including a missing file) are logged and yield `None`.
    pub fn get(&self, identifier: &str, kind: MediaKind) -> Option<Arc<MediaDescriptor>> {
        let mut inner = self.lock();
        if let Some(descriptor) = inner.entries.get(identifier) {
            if descriptor.kind != kind {
                log::debug!(
                    "Cached metadata for {identifier} is {:?}, probing as {kind:?}",
                    descriptor.kind
                );
            } else if descriptor.is_readable() {
                return Some(Arc::clone(descriptor));
            } else {
                log::debug!("Cached metadata for {identifier} is stale, probing again");
            }
        }
        self.probe_into(&mut inner, identifier, kind)
    }

    /// Probe `identifier` again unconditionally and replace its entry.
    ///
    /// Decoders call this when the source they hold has become unreadable.
    pub fn refresh(&self, identifier: &str, kind: MediaKind) -> Option<Arc<MediaDescriptor>> {
        let mut inner = self.lock();
        self.probe_into(&mut inner, identifier, kind)
    }

    /// Recompute every entry's preview size for `bound`.
    ///
    /// The replacement map is built from the current entries and installed
    /// in one step, so readers see either all old or all new sizes.
    pub fn update_all_preview_sizes(&self, bound: Size) {
        let mut inner = self.lock();
        let entries: HashMap<String, Arc<MediaDescriptor>> = inner
            .entries
            .iter()
            .map(|(identifier, descriptor)| {
                (
                    identifier.clone(),
                    Arc::new(descriptor.with_preview_bound(bound)),
                )
            })
            .collect();
        log::debug!(
            "Refitting {} cached previews from {} to {bound}",
            entries.len(),
            inner.preview_bound,
        );
        inner.entries = entries;
        inner.preview_bound = bound;
    }

    /// The bound new previews are fitted into.
    pub fn preview_bound(&self) -> Size {
        self.lock().preview_bound
    }

    /// Drop the entry for `identifier`. Returns `true` if one existed.
    pub fn remove(&self, identifier: &str) -> bool {
        self.lock().entries.remove(identifier).is_some()
    }

    /// Returns `true` if `identifier` has an entry, stale or not.
    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().entries.contains_key(identifier)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn probe_into(
        &self,
        inner: &mut CacheInner,
        identifier: &str,
        kind: MediaKind,
    ) -> Option<Arc<MediaDescriptor>> {
        match self.probe.probe(identifier, kind, inner.preview_bound) {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                inner
                    .entries
                    .insert(identifier.to_string(), Arc::clone(&descriptor));
                Some(descriptor)
            }
            Err(error) => {
                log::warn!("Failed to probe {identifier}: {error}");
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
