//! # Single-artifact result slot.
//!
//! [`ResultSlot`] holds the most recently published [`CompiledArtifact`].
//! Every read and write goes through one mutex, so readers never observe a
//! partially replaced artifact.
//!
//! ## Generations
//! Each compile attempt carries a generation number assigned by the
//! supervisor. The slot keeps a **floor**: the generation of the newest
//! attempt the supervisor has started. A publish is accepted only when
//!
//! ```text
//! !attempt.cancelled  &&  generation >= floor  &&  generation > stored.generation
//! ```
//!
//! all checked under the lock. Raising the floor before an attempt starts
//! means no older attempt can overwrite the slot once a newer one exists,
//! regardless of when its cancellation flag is observed.
//!
//! ## Wakeups
//! Successful publishes call `Notify::notify_waiters`, which lets retrievers
//! stop sleeping as soon as a new artifact lands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{futures::Notified, Notify};
use tokio_util::sync::CancellationToken;

use crate::compile::CompiledArtifact;

/// Result of an attempt trying to publish into the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PublishOutcome {
    /// Artifact stored.
    Published,
    /// Attempt was cancelled before the write.
    Cancelled,
    /// A newer attempt already started or published.
    Superseded,
}

impl PublishOutcome {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PublishOutcome::Published => "published",
            PublishOutcome::Cancelled => "cancelled",
            PublishOutcome::Superseded => "superseded",
        }
    }
}

struct SlotState<T> {
    latest: Option<Arc<CompiledArtifact<T>>>,
    floor: u64,
}

/// Shared cell holding the current compiled artifact.
pub struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
    published: Notify,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                latest: None,
                floor: 0,
            }),
            published: Notify::new(),
        }
    }

    /// Returns the stored artifact if it was compiled from exactly `code`.
    pub fn try_match(&self, code: &str) -> Option<Arc<CompiledArtifact<T>>> {
        self.lock()
            .latest
            .as_ref()
            .filter(|a| a.matches(code))
            .cloned()
    }

    /// Returns the stored artifact regardless of its source.
    pub fn latest(&self) -> Option<Arc<CompiledArtifact<T>>> {
        self.lock().latest.clone()
    }

    /// Generation of the newest started attempt.
    pub fn floor(&self) -> u64 {
        self.lock().floor
    }

    /// Marks `generation` as the newest started attempt.
    ///
    /// Called by the supervisor before the attempt runs.
    pub(crate) fn advance(&self, generation: u64) {
        let mut st = self.lock();
        st.floor = st.floor.max(generation);
    }

    /// Stores `artifact` unless its attempt was cancelled or superseded.
    pub(crate) fn publish(
        &self,
        artifact: CompiledArtifact<T>,
        cancelled: &CancellationToken,
    ) -> PublishOutcome {
        let generation = artifact.generation();
        {
            let mut st = self.lock();
            if cancelled.is_cancelled() {
                return PublishOutcome::Cancelled;
            }
            let stored = st.latest.as_ref().map_or(0, |a| a.generation());
            if generation < st.floor || generation <= stored {
                return PublishOutcome::Superseded;
            }
            st.latest = Some(Arc::new(artifact));
        }
        self.published.notify_waiters();
        PublishOutcome::Published
    }

    /// Future that completes on the next successful publish.
    ///
    /// Call `enable()` on the pinned future before checking the slot so a
    /// publish between the check and the await is not missed.
    pub(crate) fn published(&self) -> Notified<'_> {
        self.published.notified()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
