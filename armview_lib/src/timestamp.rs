use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Whole seconds since the unix epoch.
#[derive(
    Display, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The current wall-clock time, truncated to whole seconds.
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Self(d.as_secs() as i64),
            // Clock set before 1970; count backwards.
            Err(e) => Self(-(e.duration().as_secs() as i64) - 1),
        }
    }

    /// Floor fractional seconds into a timestamp.
    /// Return None for values that are not finite or do not fit.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() {
            return None;
        }
        let floored = secs.floor();
        if floored < i64::MIN as f64 || floored > i64::MAX as f64 {
            return None;
        }
        Some(Self(floored as i64))
    }

    /// Floor a millisecond count into a timestamp.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.div_euclid(1000))
    }
}
