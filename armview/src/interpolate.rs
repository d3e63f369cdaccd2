//! Perform exponential smoothing between entities.

use std::time::Duration;

use armview_lib::{Angles, JointMap, Point};
use interpolation::lerp;

/// Allow an entity to be interpolated with another instance of Self.
pub trait Interpolate {
    /// Perform interpolation between self and other given easing parameter alpha on [0.0, 1.0].
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self {
        lerp(self, other, &alpha)
    }
}

impl Interpolate for Point {
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self {
        Point {
            x: lerp(&self.x, &other.x, &alpha),
            y: lerp(&self.y, &other.y, &alpha),
        }
    }
}

/// Missing values never blend.
/// Approaching a value from nothing snaps to it; approaching nothing holds
/// the last value.
impl<T: Interpolate + Clone> Interpolate for Option<T> {
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self {
        match (self, other) {
            (Some(current), Some(target)) => Some(current.interpolate_with(target, alpha)),
            (None, Some(target)) => Some(target.clone()),
            (Some(current), None) => Some(current.clone()),
            (None, None) => None,
        }
    }
}

impl<T: Interpolate + Clone> Interpolate for JointMap<T> {
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self {
        JointMap {
            shoulder: self.shoulder.interpolate_with(&other.shoulder, alpha),
            elbow: self.elbow.interpolate_with(&other.elbow, alpha),
            wrist: self.wrist.interpolate_with(&other.wrist, alpha),
            hip: self.hip.interpolate_with(&other.hip, alpha),
        }
    }
}

impl Interpolate for Angles {
    fn interpolate_with(&self, other: &Self, alpha: f64) -> Self {
        Angles {
            shoulder: self.shoulder.interpolate_with(&other.shoulder, alpha),
            elbow: self.elbow.interpolate_with(&other.elbow, alpha),
        }
    }
}

/// Fraction of the remaining distance to cover after delta_t, for a smoothing
/// rate given in 1/seconds.
/// Compounding two steps of dt/2 covers exactly as much as one step of dt, so
/// the convergence speed does not depend on the frame rate.
pub fn smoothing_alpha(rate: f64, delta_t: Duration) -> f64 {
    let dt = delta_t.as_secs_f64();
    if dt <= 0.0 || rate <= 0.0 {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}
