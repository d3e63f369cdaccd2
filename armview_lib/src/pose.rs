//! Schema-independent pose data shared by the poller and the renderer.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// A 2D position in server image pixels.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return a point only if both coordinates are finite.
    pub fn finite(x: f64, y: f64) -> Option<Self> {
        (x.is_finite() && y.is_finite()).then_some(Self { x, y })
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The tracked skeletal landmarks.
#[derive(Display, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    #[display("shoulder")]
    Shoulder,
    #[display("elbow")]
    Elbow,
    #[display("wrist")]
    Wrist,
    #[display("hip")]
    Hip,
}

impl Joint {
    pub const ALL: [Joint; 4] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist, Joint::Hip];

    /// The key used for this joint in both payload schemas.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Shoulder => "shoulder",
            Self::Elbow => "elbow",
            Self::Wrist => "wrist",
            Self::Hip => "hip",
        }
    }
}

/// One optional value per joint.
/// A joint is either fully present or absent, never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMap<T> {
    pub shoulder: Option<T>,
    pub elbow: Option<T>,
    pub wrist: Option<T>,
    pub hip: Option<T>,
}

impl<T> Default for JointMap<T> {
    fn default() -> Self {
        Self {
            shoulder: None,
            elbow: None,
            wrist: None,
            hip: None,
        }
    }
}

impl<T> JointMap<T> {
    /// Build a map by evaluating f for every joint.
    pub fn from_fn<F: FnMut(Joint) -> Option<T>>(mut f: F) -> Self {
        Self {
            shoulder: f(Joint::Shoulder),
            elbow: f(Joint::Elbow),
            wrist: f(Joint::Wrist),
            hip: f(Joint::Hip),
        }
    }

    pub fn get(&self, joint: Joint) -> Option<&T> {
        self.slot(joint).as_ref()
    }

    pub fn slot(&self, joint: Joint) -> &Option<T> {
        match joint {
            Joint::Shoulder => &self.shoulder,
            Joint::Elbow => &self.elbow,
            Joint::Wrist => &self.wrist,
            Joint::Hip => &self.hip,
        }
    }

    pub fn slot_mut(&mut self, joint: Joint) -> &mut Option<T> {
        match joint {
            Joint::Shoulder => &mut self.shoulder,
            Joint::Elbow => &mut self.elbow,
            Joint::Wrist => &mut self.wrist,
            Joint::Hip => &mut self.hip,
        }
    }

    /// Iterate over the joints that are present, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &T)> {
        Joint::ALL
            .into_iter()
            .filter_map(move |joint| self.get(joint).map(|v| (joint, v)))
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> JointMap<U> {
        JointMap::from_fn(|joint| self.get(joint).map(&mut f))
    }

    pub fn is_empty(&self) -> bool {
        Joint::ALL.iter().all(|j| self.get(*j).is_none())
    }
}

/// A detected joint position plus the optional extras some producers attach.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub pos: Point,
    /// Wrist-to-tip length reported by the hand tracker.
    pub length_cm: Option<f64>,
    /// Landmark visibility reported by the pose tracker.
    pub visibility: Option<f64>,
}

impl From<Point> for Keypoint {
    fn from(pos: Point) -> Self {
        Self {
            pos,
            length_cm: None,
            visibility: None,
        }
    }
}

/// Joint angles in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Angles {
    pub shoulder: Option<f64>,
    pub elbow: Option<f64>,
}

impl Angles {
    /// Non-finite inputs are recorded as absent.
    pub fn new(shoulder: Option<f64>, elbow: Option<f64>) -> Self {
        Self {
            shoulder: shoulder.filter(|v| v.is_finite()),
            elbow: elbow.filter(|v| v.is_finite()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shoulder.is_none() && self.elbow.is_none()
    }
}

/// Pixel dimensions of the image the producer measured points in.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub w: f64,
    pub h: f64,
}

impl ImageSize {
    /// Both dimensions must be finite and positive.
    pub fn new(w: f64, h: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(w) && valid(h)).then_some(Self { w, h })
    }
}

/// The normalized representation of one server snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFrame {
    pub timestamp: Timestamp,
    pub joints: JointMap<Keypoint>,
    pub angles: Angles,
    pub hand_label: String,
    pub hand_index: i64,
    /// Image dimensions announced by this snapshot, if any.
    pub image_size: Option<ImageSize>,
}

impl CanonicalFrame {
    /// Joint positions without the per-joint extras.
    pub fn points(&self) -> JointMap<Point> {
        self.joints.map(|k| k.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_finite() {
        assert_eq!(Some(Point::new(1.0, 2.0)), Point::finite(1.0, 2.0));
        assert_eq!(None, Point::finite(f64::NAN, 2.0));
        assert_eq!(None, Point::finite(1.0, f64::NEG_INFINITY));
    }

    #[test]
    fn test_joint_map_iter_skips_absent() {
        let mut map = JointMap::default();
        *map.slot_mut(Joint::Wrist) = Some(3);
        *map.slot_mut(Joint::Shoulder) = Some(1);
        let present: Vec<_> = map.iter().map(|(j, v)| (j, *v)).collect();
        assert_eq!(vec![(Joint::Shoulder, 1), (Joint::Wrist, 3)], present);
        assert!(!map.is_empty());
        assert!(JointMap::<i32>::default().is_empty());
    }

    #[test]
    fn test_joint_display_matches_key() {
        for joint in Joint::ALL {
            assert_eq!(joint.key(), joint.to_string());
        }
    }

    #[test]
    fn test_angles_drop_non_finite() {
        let a = Angles::new(Some(f64::NAN), Some(90.0));
        assert_eq!(None, a.shoulder);
        assert_eq!(Some(90.0), a.elbow);
    }

    #[test]
    fn test_image_size_rejects_degenerate() {
        assert!(ImageSize::new(640.0, 480.0).is_some());
        assert!(ImageSize::new(0.0, 480.0).is_none());
        assert!(ImageSize::new(640.0, -1.0).is_none());
        assert!(ImageSize::new(f64::NAN, 480.0).is_none());
    }
}
