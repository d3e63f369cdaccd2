//! Normalize the two producer payload schemas into a single canonical frame.
//!
//! The hand tracker publishes a `hands` array with nested per-joint points.
//! The arm tracker publishes flat `<joint>_px` pixel arrays. Each schema is
//! parsed into its own strongly-typed payload; the first one whose minimal
//! shape predicate holds is converted. Malformed fields never fail the parse,
//! they are recorded as absent.

use armview_lib::{Angles, CanonicalFrame, ImageSize, Joint, JointMap, Keypoint, Point, Timestamp};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A JSON payload exactly as the server sent it.
pub type RawSnapshot = Value;

const DEFAULT_HAND_LABEL: &str = "-";

/// Deserialize a field, recording it as absent if it doesn't have the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Deserialize, Default, Debug, Clone, Copy)]
struct AnglesDeg {
    #[serde(default, deserialize_with = "lenient")]
    shoulder: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    elbow: Option<f64>,
}

impl From<AnglesDeg> for Angles {
    fn from(a: AnglesDeg) -> Self {
        Angles::new(a.shoulder, a.elbow)
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
struct ImageSizeField {
    w: f64,
    h: f64,
}

impl ImageSizeField {
    fn validate(self) -> Option<ImageSize> {
        ImageSize::new(self.w, self.h)
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
struct FingerPoint {
    x: f64,
    y: f64,
    #[serde(default, deserialize_with = "lenient")]
    length_cm: Option<f64>,
}

impl FingerPoint {
    fn keypoint(&self) -> Option<Keypoint> {
        Point::finite(self.x, self.y).map(|pos| Keypoint {
            pos,
            length_cm: self.length_cm.filter(|v| v.is_finite()),
            visibility: None,
        })
    }
}

#[derive(Deserialize, Default, Debug)]
struct Fingers {
    #[serde(default, deserialize_with = "lenient")]
    shoulder: Option<FingerPoint>,
    #[serde(default, deserialize_with = "lenient")]
    elbow: Option<FingerPoint>,
    #[serde(default, deserialize_with = "lenient")]
    wrist: Option<FingerPoint>,
    #[serde(default, deserialize_with = "lenient")]
    hip: Option<FingerPoint>,
}

impl Fingers {
    fn get(&self, joint: Joint) -> Option<&FingerPoint> {
        match joint {
            Joint::Shoulder => self.shoulder.as_ref(),
            Joint::Elbow => self.elbow.as_ref(),
            Joint::Wrist => self.wrist.as_ref(),
            Joint::Hip => self.hip.as_ref(),
        }
    }
}

#[derive(Deserialize, Default, Debug)]
struct Hand {
    #[serde(default, deserialize_with = "lenient")]
    fingers: Option<Fingers>,
    #[serde(default, deserialize_with = "lenient")]
    angles_deg: Option<AnglesDeg>,
    #[serde(default, deserialize_with = "lenient")]
    hand_label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    hand_index: Option<i64>,
}

/// Shape A: `{ hands: [ { fingers, angles_deg, hand_label, hand_index } ], ... }`.
#[derive(Deserialize, Debug)]
struct HandsPayload {
    #[serde(default, deserialize_with = "lenient")]
    hands: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    angles_deg: Option<AnglesDeg>,
    #[serde(default, deserialize_with = "lenient")]
    timestamp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    image_size: Option<ImageSizeField>,
    #[serde(default, deserialize_with = "lenient")]
    side: Option<String>,
}

impl HandsPayload {
    /// Return the first hand if the hands list is present and non-empty.
    fn first_hand(&self) -> Option<Hand> {
        let first = self.hands.as_ref()?.first()?;
        Some(Hand::deserialize(first).unwrap_or_default())
    }

    fn into_frame(self, hand: Hand, now: Timestamp) -> CanonicalFrame {
        let joints = match &hand.fingers {
            Some(fingers) => {
                JointMap::from_fn(|joint| fingers.get(joint).and_then(FingerPoint::keypoint))
            }
            None => JointMap::default(),
        };
        let angles = hand
            .angles_deg
            .or(self.angles_deg)
            .unwrap_or_default()
            .into();
        CanonicalFrame {
            timestamp: self
                .timestamp
                .and_then(Timestamp::from_secs_f64)
                .unwrap_or(now),
            joints,
            angles,
            hand_label: hand
                .hand_label
                .or(self.side)
                .unwrap_or_else(|| DEFAULT_HAND_LABEL.to_string()),
            hand_index: hand.hand_index.unwrap_or(0),
            image_size: self.image_size.and_then(ImageSizeField::validate),
        }
    }
}

/// Shape B: `{ shoulder_px: [x, y, visibility?], ..., angles_deg, ts_kst, ... }`.
#[derive(Deserialize, Debug)]
struct FlatPayload {
    #[serde(default, deserialize_with = "lenient")]
    shoulder_px: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    elbow_px: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    wrist_px: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    hip_px: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    angles_deg: Option<AnglesDeg>,
    #[serde(default, deserialize_with = "lenient")]
    ts_kst: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    image_size: Option<ImageSizeField>,
    #[serde(default, deserialize_with = "lenient")]
    side: Option<String>,
}

impl FlatPayload {
    fn pixels(&self, joint: Joint) -> Option<&Vec<Value>> {
        match joint {
            Joint::Shoulder => self.shoulder_px.as_ref(),
            Joint::Elbow => self.elbow_px.as_ref(),
            Joint::Wrist => self.wrist_px.as_ref(),
            Joint::Hip => self.hip_px.as_ref(),
        }
    }

    /// True if this payload carries anything the flat schema defines.
    fn matches(&self) -> bool {
        Joint::ALL.iter().any(|j| self.pixels(*j).is_some())
            || self.angles_deg.is_some()
            || self.ts_kst.is_some()
    }

    fn into_frame(self, now: Timestamp) -> CanonicalFrame {
        let joints = JointMap::from_fn(|joint| self.pixels(joint).and_then(|px| keypoint_from_pixels(px)));
        let timestamp = match &self.ts_kst {
            Some(ts) => parse_iso_timestamp(ts).unwrap_or_else(|| {
                debug!("Unparseable ts_kst {:?}; using the current time.", ts);
                now
            }),
            None => now,
        };
        CanonicalFrame {
            timestamp,
            joints,
            angles: self.angles_deg.unwrap_or_default().into(),
            hand_label: self
                .side
                .unwrap_or_else(|| DEFAULT_HAND_LABEL.to_string()),
            hand_index: 0,
            image_size: self.image_size.and_then(ImageSizeField::validate),
        }
    }
}

/// `[x, y]` or `[x, y, visibility]`.
/// Only the first two elements decide whether the point exists; extra or
/// malformed trailing elements are ignored.
fn keypoint_from_pixels(px: &[Value]) -> Option<Keypoint> {
    let x = px.first()?.as_f64()?;
    let y = px.get(1)?.as_f64()?;
    Point::finite(x, y).map(|pos| Keypoint {
        pos,
        length_cm: None,
        visibility: px.get(2).and_then(Value::as_f64).filter(|v| v.is_finite()),
    })
}

/// Parse an ISO-8601 date string.
/// Strings without an offset are interpreted in local time.
fn parse_iso_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Timestamp(dt.timestamp()));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| Timestamp(dt.timestamp()))
}

/// The payload schemas we know how to read.
#[derive(Debug)]
enum Schema {
    Hands(HandsPayload, Hand),
    Flat(FlatPayload),
}

impl Schema {
    /// Try each schema in order of specificity.
    /// Both schemas are JSON objects; anything else matches neither.
    fn identify(raw: &RawSnapshot) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        if let Ok(payload) = HandsPayload::deserialize(raw) {
            if let Some(hand) = payload.first_hand() {
                return Some(Self::Hands(payload, hand));
            }
        }
        match FlatPayload::deserialize(raw) {
            Ok(payload) if payload.matches() => Some(Self::Flat(payload)),
            _ => None,
        }
    }
}

/// Convert a raw snapshot into a canonical frame.
/// now is used as the frame time when the payload doesn't carry a usable one.
/// Return None if the payload matches neither schema.
pub fn normalize(raw: &RawSnapshot, now: Timestamp) -> Option<CanonicalFrame> {
    match Schema::identify(raw) {
        Some(Schema::Hands(payload, hand)) => Some(payload.into_frame(hand, now)),
        Some(Schema::Flat(payload)) => Some(payload.into_frame(now)),
        None => {
            debug!("Snapshot matched no known schema: {}", raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: Timestamp = Timestamp(1_800_000_000);

    fn norm(raw: Value) -> CanonicalFrame {
        normalize(&raw, NOW).expect("payload should normalize")
    }

    #[test]
    fn test_hands_scenario() {
        let frame = norm(json!({
            "hands": [{
                "fingers": {"shoulder": {"x": 100, "y": 200}, "elbow": {"x": 150, "y": 250}},
                "angles_deg": {"shoulder": 30, "elbow": 90}
            }],
            "timestamp": 1700000000
        }));
        assert_eq!(Some(Point::new(100.0, 200.0)), frame.points().shoulder);
        assert_eq!(Some(Point::new(150.0, 250.0)), frame.points().elbow);
        assert_eq!(None, frame.joints.wrist);
        assert_eq!(None, frame.joints.hip);
        assert_eq!(Angles::new(Some(30.0), Some(90.0)), frame.angles);
        assert_eq!(Timestamp(1700000000), frame.timestamp);
        assert_eq!("-", frame.hand_label);
        assert_eq!(0, frame.hand_index);
    }

    #[test]
    fn test_flat_scenario() {
        let before = Timestamp::now();
        let raw = json!({
            "shoulder_px": [10, 20],
            "elbow_px": [30, 40],
            "angles_deg": {"shoulder": 45, "elbow": 60}
        });
        let frame = normalize(&raw, Timestamp::now()).unwrap();
        let after = Timestamp::now();
        assert_eq!(Some(Point::new(10.0, 20.0)), frame.points().shoulder);
        assert_eq!(Some(Point::new(30.0, 40.0)), frame.points().elbow);
        assert!(frame.timestamp >= before && frame.timestamp <= after);
        assert_eq!(Angles::new(Some(45.0), Some(60.0)), frame.angles);
    }

    #[test]
    fn test_hands_fallbacks() {
        let frame = norm(json!({
            "hands": [{"fingers": {"wrist": {"x": 1.5, "y": 2.5, "length_cm": 17.25}}}],
            "angles_deg": {"shoulder": 12.5},
            "timestamp": "yesterday",
            "side": "right"
        }));
        assert_eq!(NOW, frame.timestamp);
        assert_eq!("right", frame.hand_label);
        assert_eq!(Angles::new(Some(12.5), None), frame.angles);
        let wrist = frame.joints.wrist.unwrap();
        assert_eq!(Point::new(1.5, 2.5), wrist.pos);
        assert_eq!(Some(17.25), wrist.length_cm);
    }

    #[test]
    fn test_hand_level_fields_take_priority() {
        let frame = norm(json!({
            "hands": [{"hand_label": "Left", "hand_index": 1, "angles_deg": {"elbow": 10}}],
            "angles_deg": {"shoulder": 99, "elbow": 99},
            "side": "right",
            "timestamp": 1700000000.75
        }));
        assert_eq!("Left", frame.hand_label);
        assert_eq!(1, frame.hand_index);
        // The hand's angle object wins as a whole, like the producer intends.
        assert_eq!(Angles::new(None, Some(10.0)), frame.angles);
        assert_eq!(Timestamp(1700000000), frame.timestamp);
    }

    #[test]
    fn test_malformed_joints_are_absent() {
        let frame = norm(json!({
            "hands": [{
                "fingers": {
                    "shoulder": {"x": "100", "y": 200},
                    "elbow": {"x": 150},
                    "wrist": null,
                    "hip": {"x": 1, "y": 2, "length_cm": null}
                },
                "angles_deg": {"shoulder": "30", "elbow": null}
            }]
        }));
        assert_eq!(None, frame.joints.shoulder);
        assert_eq!(None, frame.joints.elbow);
        assert_eq!(None, frame.joints.wrist);
        assert_eq!(Some(Keypoint::from(Point::new(1.0, 2.0))), frame.joints.hip);
        assert!(frame.angles.is_empty());
    }

    #[test]
    fn test_first_hand_only() {
        let frame = norm(json!({
            "hands": [
                {"fingers": {"elbow": {"x": 1, "y": 1}}},
                {"fingers": {"elbow": {"x": 9, "y": 9}}}
            ]
        }));
        assert_eq!(Some(Point::new(1.0, 1.0)), frame.points().elbow);
    }

    #[test]
    fn test_non_object_hand_is_empty() {
        let frame = norm(json!({"hands": [7], "side": "left"}));
        assert!(frame.joints.is_empty());
        assert_eq!("left", frame.hand_label);
    }

    #[test]
    fn test_flat_pixel_arrays() {
        let frame = norm(json!({
            "shoulder_px": [10, 20, 0.98],
            "elbow_px": [30],
            "wrist_px": "nope",
            "hip_px": [5, null],
            "side": "right"
        }));
        let shoulder = frame.joints.shoulder.unwrap();
        assert_eq!(Point::new(10.0, 20.0), shoulder.pos);
        assert_eq!(Some(0.98), shoulder.visibility);
        assert_eq!(None, frame.joints.elbow);
        assert_eq!(None, frame.joints.wrist);
        assert_eq!(None, frame.joints.hip);
        assert_eq!("right", frame.hand_label);
        assert_eq!(0, frame.hand_index);
    }

    #[test]
    fn test_flat_iso_timestamp() {
        let frame = norm(json!({
            "ts_kst": "2023-11-15T07:13:20.123+09:00",
            "angles_deg": {"shoulder": null, "elbow": 170.2}
        }));
        assert_eq!(Timestamp(1700000000), frame.timestamp);
        assert_eq!(Angles::new(None, Some(170.2)), frame.angles);
    }

    #[test]
    fn test_flat_bad_timestamp_uses_now() {
        let frame = norm(json!({"ts_kst": "not a date", "shoulder_px": [1, 2]}));
        assert_eq!(NOW, frame.timestamp);
    }

    #[test]
    fn test_naive_iso_timestamp_is_local() {
        let expected = Local
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(
            Some(Timestamp(expected)),
            parse_iso_timestamp("2024-03-01T12:00:00")
        );
        assert_eq!(
            Some(Timestamp(expected)),
            parse_iso_timestamp("2024-03-01T12:00:00.500")
        );
    }

    #[test]
    fn test_empty_hands_falls_through_to_flat() {
        let frame = norm(json!({"hands": [], "elbow_px": [3, 4]}));
        assert_eq!(Some(Point::new(3.0, 4.0)), frame.points().elbow);
    }

    #[test]
    fn test_image_size() {
        let frame = norm(json!({"shoulder_px": [1, 2], "image_size": {"w": 640, "h": 480}}));
        assert_eq!(ImageSize::new(640.0, 480.0), frame.image_size);

        let frame = norm(json!({"shoulder_px": [1, 2], "image_size": {"w": 0, "h": 480}}));
        assert_eq!(None, frame.image_size);

        let frame = norm(json!({"hands": [{}], "image_size": {"w": "640", "h": 480}}));
        assert_eq!(None, frame.image_size);
    }

    #[test]
    fn test_unknown_payloads_fail_closed() {
        assert_eq!(None, normalize(&json!({}), NOW));
        assert_eq!(None, normalize(&json!([1, 2, 3]), NOW));
        assert_eq!(None, normalize(&json!("hello"), NOW));
        assert_eq!(None, normalize(&json!({"hands": [], "point": {"x": 0}}), NOW));
    }

    #[test]
    fn test_top_level_arrays_fail_closed() {
        let nested_hands = json!([[{"fingers": {"shoulder": {"x": 1, "y": 2}}}]]);
        assert_eq!(None, normalize(&nested_hands, NOW));
        assert_eq!(None, normalize(&json!([[10, 20]]), NOW));
    }

    #[test]
    fn test_bad_visibility_keeps_point() {
        let frame = norm(json!({"shoulder_px": [10, 20, "high"]}));
        let shoulder = frame.joints.shoulder.unwrap();
        assert_eq!(Point::new(10.0, 20.0), shoulder.pos);
        assert_eq!(None, shoulder.visibility);

        let frame = norm(json!({"elbow_px": [3, 4, null, "extra"], "hip_px": ["5", 6]}));
        assert_eq!(Some(Point::new(3.0, 4.0)), frame.points().elbow);
        assert_eq!(None, frame.joints.hip);
    }

    #[test]
    fn test_output_never_holds_non_finite_values() {
        let payloads = [
            json!({"hands": [{"fingers": {"shoulder": {"x": 1e308, "y": 1}}}]}),
            json!({"shoulder_px": [1e308, -1e308], "angles_deg": {"shoulder": 1e308}}),
        ];
        for raw in payloads {
            let frame = norm(raw);
            for (_, keypoint) in frame.joints.iter() {
                assert!(keypoint.pos.x.is_finite() && keypoint.pos.y.is_finite());
            }
            for angle in [frame.angles.shoulder, frame.angles.elbow].into_iter().flatten() {
                assert!(angle.is_finite());
            }
        }
    }
}
