//! Decode event notifications.
//!
//! Observers register with [`SeekingDecoder::subscribe`](crate::SeekingDecoder::subscribe)
//! and receive a [`DecodeEvent`] for every session rebuild and every decode
//! outcome. Registration is explicit: the returned [`SubscriptionId`] is
//! passed back to `unsubscribe` when the observer goes away.
//!
//! Events are delivered after the decoder's internal lock has been released,
//! so an observer may call back into the decoder.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::decoder::RebuildReason;

/// Something that happened during a decode call.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DecodeEvent {
    /// A new reader session was created.
    SessionStarted {
        /// Start offset in seconds.
        offset: f64,
        /// Why the previous session could not be reused.
        reason: RebuildReason,
    },
    /// The cached frame satisfied the request; the reader was not touched.
    CachedFrameReused {
        /// Frame-aligned requested time.
        requested: f64,
    },
    /// A new frame was pulled from the reader.
    FrameProduced {
        /// Frame-aligned requested time.
        requested: f64,
        /// Presentation time of the produced frame.
        presentation_time: f64,
    },
    /// The reader ran out of samples before a match was found.
    NoFrame {
        /// Frame-aligned requested time.
        requested: f64,
    },
    /// The decoder was cleared.
    Cleared,
}

/// Receives [`DecodeEvent`]s.
///
/// Implementations must be [`Send`] and [`Sync`]: decoders are used from
/// worker threads.
pub trait DecodeObserver: Send + Sync {
    /// Called once per event, in the order events occurred.
    fn on_event(&self, event: &DecodeEvent);
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Explicit list of registered observers.
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn DecodeObserver>)>>,
}

impl Debug for ObserverList {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}

impl ObserverList {
    pub(crate) fn subscribe(&self, observer: Arc<dyn DecodeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn notify(&self, events: &[DecodeEvent]) {
        if events.is_empty() {
            return;
        }
        // Snapshot so observers can subscribe or unsubscribe from a callback.
        let observers: Vec<Arc<dyn DecodeObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in &observers {
            for event in events {
                observer.on_event(event);
            }
        }
    }
}
