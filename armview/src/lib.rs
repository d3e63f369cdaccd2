//! A desktop viewer for arm pose snapshots published by a tracker.
//!
//! A background poller fetches the latest snapshot, normalizes it, and
//! publishes it to a shared slot; the window eases the displayed skeleton
//! toward the most recent frame.

pub mod animation;
pub mod config;
pub mod draw;
pub mod interpolate;
pub mod normalize;
pub mod poll;
pub mod show;
pub mod snapshot_manager;
pub mod source;
pub mod summary;
pub mod viewport;
