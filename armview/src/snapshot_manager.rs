//! Hand the latest normalized frame from the poller to the renderer.
//!
//! The poller is the only writer; it replaces the whole state on every
//! publish, so the renderer always observes a consistent frame, image size,
//! and poll status. The latest publish wins.

use std::sync::Arc;

use arc_swap::ArcSwap;
use armview_lib::{CanonicalFrame, Timestamp};
use log::{debug, warn};

use crate::animation::AnimationTarget;
use crate::viewport::ImageDimensions;

/// Outcome of the most recent poll, as shown in the status line.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// No poll has completed yet.
    Waiting,
    /// The most recent poll produced a frame with this timestamp.
    Updated(Timestamp),
    /// The most recent poll returned something without pose data.
    NoData,
    /// The most recent poll failed.
    Failed(String),
}

/// The most recently accepted frame, tagged with its request sequence number.
#[derive(Debug, Clone)]
pub struct Published {
    pub seq: u64,
    pub frame: CanonicalFrame,
    pub target: AnimationTarget,
}

/// Everything the renderer reads from the poller.
#[derive(Debug, Clone)]
pub struct SlotState {
    pub latest: Option<Published>,
    pub dimensions: ImageDimensions,
    pub status: PollStatus,
}

impl SlotState {
    fn new(dimensions: ImageDimensions) -> Self {
        Self {
            latest: None,
            dimensions,
            status: PollStatus::Waiting,
        }
    }

    pub fn target(&self) -> Option<&AnimationTarget> {
        self.latest.as_ref().map(|p| &p.target)
    }

    pub fn frame(&self) -> Option<&CanonicalFrame> {
        self.latest.as_ref().map(|p| &p.frame)
    }

    /// Sequence number of the latest accepted frame.
    pub fn seq(&self) -> Option<u64> {
        self.latest.as_ref().map(|p| p.seq)
    }
}

/// A cloneable handle to the shared slot.
#[derive(Clone)]
pub struct SnapshotManager(Arc<ArcSwap<SlotState>>);

impl SnapshotManager {
    pub fn new(dimensions: ImageDimensions) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(SlotState::new(dimensions))))
    }

    /// Return the current state of the slot.
    pub fn load(&self) -> Arc<SlotState> {
        self.0.load_full()
    }

    fn modify<F: FnOnce(&mut SlotState)>(&self, f: F) {
        let mut next = SlotState::clone(&self.0.load());
        f(&mut next);
        self.0.store(Arc::new(next));
    }

    /// Publish a frame produced by request number seq.
    /// A frame from a request older than the current one is discarded.
    /// Return true if the frame was accepted.
    pub fn publish(&self, seq: u64, frame: CanonicalFrame) -> bool {
        let current = self.0.load();
        if let Some(latest) = current.seq() {
            if seq <= latest {
                warn!(
                    "Discarding stale frame from request {} (already showing request {}).",
                    seq, latest
                );
                return false;
            }
        }
        drop(current);
        self.modify(|state| {
            state.dimensions.update(frame.image_size);
            state.status = PollStatus::Updated(frame.timestamp);
            state.latest = Some(Published {
                seq,
                target: AnimationTarget::from(&frame),
                frame,
            });
        });
        true
    }

    /// Record that the latest poll had nothing to show.
    /// The last good frame stays in place.
    pub fn report_no_data(&self) {
        debug!("Poll returned no pose data.");
        self.modify(|state| state.status = PollStatus::NoData);
    }

    /// Record a poll failure.
    /// The last good frame stays in place.
    pub fn report_failure(&self, reason: String) {
        self.modify(|state| state.status = PollStatus::Failed(reason));
    }
}
