//! The displayed pose, eased toward the most recently published target.

use std::time::{Duration, Instant};

use armview_lib::{Angles, CanonicalFrame, JointMap, Point};

use crate::interpolate::{smoothing_alpha, Interpolate};

/// The pose and angles the animation is easing toward.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationTarget {
    pub pose: JointMap<Point>,
    pub angles: Angles,
}

impl From<&CanonicalFrame> for AnimationTarget {
    fn from(frame: &CanonicalFrame) -> Self {
        Self {
            pose: frame.points(),
            angles: frame.angles,
        }
    }
}

/// The currently displayed pose.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pose: JointMap<Point>,
    angles: Angles,
    /// in 1/seconds
    smoothing_rate: f64,
    /// Set once the first target has been applied.
    live: bool,
}

impl AnimationState {
    pub fn new(smoothing_rate: f64) -> Self {
        Self {
            pose: JointMap::default(),
            angles: Angles::default(),
            smoothing_rate,
            live: false,
        }
    }

    /// Ease the displayed state toward target over delta_t.
    /// With no target, the state is left untouched.
    pub fn update_state(&mut self, delta_t: Duration, target: Option<&AnimationTarget>) {
        let Some(target) = target else {
            return;
        };
        let alpha = smoothing_alpha(self.smoothing_rate, delta_t);
        self.pose = self.pose.interpolate_with(&target.pose, alpha);
        self.angles = self.angles.interpolate_with(&target.angles, alpha);
        self.live = true;
    }

    pub fn pose(&self) -> &JointMap<Point> {
        &self.pose
    }

    pub fn angles(&self) -> Angles {
        self.angles
    }

    /// Return true once the animation has seen any target.
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Measure the time between display frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// Return the time elapsed since the previous tick.
    /// The first tick, and any tick that appears to go backwards, is zero.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let delta_t = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        delta_t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armview_lib::assert_almost_eq;

    const RATE: f64 = 10.0;
    const FRAME: Duration = Duration::from_millis(16);

    fn target(shoulder: Option<Point>, elbow_angle: Option<f64>) -> AnimationTarget {
        AnimationTarget {
            pose: JointMap {
                shoulder,
                ..Default::default()
            },
            angles: Angles::new(None, elbow_angle),
        }
    }

    fn distance(state: &AnimationState, target: &AnimationTarget) -> f64 {
        let shoulder = state
            .pose()
            .shoulder
            .unwrap()
            .distance(&target.pose.shoulder.unwrap());
        let elbow = (state.angles().elbow.unwrap() - target.angles.elbow.unwrap()).abs();
        shoulder + elbow
    }

    #[test]
    fn test_no_target_leaves_state_alone() {
        let mut state = AnimationState::new(RATE);
        state.update_state(FRAME, None);
        assert!(!state.is_live());
        assert!(state.pose().is_empty());
    }

    #[test]
    fn test_snap_on_first_appearance() {
        let mut state = AnimationState::new(RATE);
        let t = target(Some(Point::new(100.0, 200.0)), Some(42.0));
        state.update_state(FRAME, Some(&t));
        assert!(state.is_live());
        assert_eq!(t.pose, *state.pose());
        assert_eq!(t.angles, state.angles());
    }

    #[test]
    fn test_snap_even_with_zero_dt() {
        let mut state = AnimationState::new(RATE);
        let t = target(Some(Point::new(1.0, 1.0)), None);
        state.update_state(Duration::ZERO, Some(&t));
        assert_eq!(Some(Point::new(1.0, 1.0)), state.pose().shoulder);
    }

    #[test]
    fn test_step_toward_target_is_idempotent_at_target() {
        let mut state = AnimationState::new(RATE);
        let t = target(Some(Point::new(5.0, 6.0)), Some(30.0));
        state.update_state(FRAME, Some(&t));
        let before = state.clone();
        state.update_state(FRAME, Some(&t));
        assert_eq!(before, state);
    }

    #[test]
    fn test_convergence_is_monotonic() {
        for dt in [
            Duration::from_millis(1),
            Duration::from_millis(16),
            Duration::from_millis(100),
            Duration::from_secs(2),
        ] {
            let mut state = AnimationState::new(RATE);
            state.update_state(dt, Some(&target(Some(Point::new(0.0, 0.0)), Some(0.0))));
            let t = target(Some(Point::new(300.0, -40.0)), Some(120.0));
            let mut previous = distance(&state, &t);
            // Three seconds of simulated time at any frame rate.
            let steps = ((3.0 / dt.as_secs_f64()).ceil() as usize).max(5);
            for _ in 0..steps {
                state.update_state(dt, Some(&t));
                let d = distance(&state, &t);
                assert!(d <= previous, "distance grew from {} to {} at {:?}", previous, d, dt);
                previous = d;
            }
            assert!(previous < 1e-3, "did not converge at {:?}: {}", dt, previous);
        }
    }

    #[test]
    fn test_partial_blend() {
        let mut state = AnimationState::new(RATE);
        state.update_state(FRAME, Some(&target(Some(Point::new(0.0, 0.0)), Some(0.0))));
        let dt = Duration::from_millis(100);
        state.update_state(dt, Some(&target(Some(Point::new(100.0, 0.0)), Some(10.0))));
        let alpha = 1.0 - (-RATE * 0.1_f64).exp();
        assert_almost_eq(100.0 * alpha, state.pose().shoulder.unwrap().x);
        assert_almost_eq(10.0 * alpha, state.angles().elbow.unwrap());
    }

    #[test]
    fn test_missing_joint_holds_last_value() {
        let mut state = AnimationState::new(RATE);
        let p = Point::new(7.0, 8.0);
        state.update_state(FRAME, Some(&target(Some(p), Some(12.0))));
        state.update_state(FRAME, Some(&target(None, None)));
        assert_eq!(Some(p), state.pose().shoulder);
        assert_eq!(Some(12.0), state.angles().elbow);
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::default();
        let start = Instant::now();
        assert_eq!(Duration::ZERO, clock.tick(start));
        let later = start + Duration::from_millis(20);
        assert_eq!(Duration::from_millis(20), clock.tick(later));
        // Going backwards clamps to zero.
        assert_eq!(Duration::ZERO, clock.tick(start));
    }
}
