//! Code shared between the armview client and its tooling.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

mod pose;
mod timestamp;

pub use pose::{Angles, CanonicalFrame, ImageSize, Joint, JointMap, Keypoint, Point};
pub use timestamp::Timestamp;

/// A helper wrapper around an atomically-reference-counted atomic boolean.
/// Used to control program flow across multiple threads.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// Create a flag set to run.
    pub fn new() -> Self {
        RunFlag(Arc::new(AtomicBool::new(true)))
    }

    /// Return true if the program should continue.
    pub fn should_run(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Command the program to stop.
    pub fn stop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

const ALMOST_EQ_TOLERANCE: f64 = 0.000_000_1;

/// Return True if two f64 are within 10^-7 of each other.
/// Pixel coordinates and angles in degrees never need finer resolution.
#[inline(always)]
pub fn almost_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < ALMOST_EQ_TOLERANCE
}

/// Panic if a and b are not almost equal.
pub fn assert_almost_eq(a: f64, b: f64) {
    assert!(almost_eq(a, b), "{} != {}", a, b);
}
