//! Human-readable text for the status line and the data card.

use std::fmt;

use armview_lib::{CanonicalFrame, Timestamp};
use chrono::{Local, TimeZone};

use crate::snapshot_manager::PollStatus;
use crate::viewport::ImageDimensions;

const MISSING: &str = "-";

/// The data card for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCard {
    pub heading: String,
    pub image: String,
    pub rows: Vec<String>,
    pub angles: String,
}

impl SummaryCard {
    pub fn new(frame: &CanonicalFrame, dims: &ImageDimensions) -> Self {
        let mut rows: Vec<String> = frame
            .joints
            .iter()
            .map(|(joint, k)| {
                let mut row = format!(
                    "• {:<8}: (x={}, y={}), wrist→tip={}",
                    joint.to_string(),
                    k.pos.x,
                    k.pos.y,
                    k.length_cm
                        .map(|len| format!("{:.1} cm", len))
                        .unwrap_or_else(|| MISSING.to_string())
                );
                if let Some(vis) = k.visibility {
                    row.push_str(&format!(", vis={:.2}", vis));
                }
                row
            })
            .collect();
        if rows.is_empty() {
            rows.push(format!("• {}", MISSING));
        }
        Self {
            heading: format!("Hand: {} (index {})", frame.hand_label, frame.hand_index),
            image: format!(
                "image: {}×{}px, ts={}",
                dims.width(),
                dims.height(),
                frame.timestamp
            ),
            rows,
            angles: format!(
                "◦ angles: shoulder={}°, elbow={}°",
                fmt_angle(frame.angles.shoulder),
                fmt_angle(frame.angles.elbow)
            ),
        }
    }

    /// Every line of the card, top to bottom.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [self.heading.as_str(), self.image.as_str()]
            .into_iter()
            .chain(self.rows.iter().map(String::as_str))
            .chain(std::iter::once(self.angles.as_str()))
    }
}

impl fmt::Display for SummaryCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn fmt_angle(angle: Option<f64>) -> String {
    angle
        .map(|a| format!("{:.2}", a))
        .unwrap_or_else(|| MISSING.to_string())
}

/// Local wall-clock time of a timestamp, or the raw seconds if it can't be represented.
fn local_time(ts: Timestamp) -> String {
    match Local.timestamp_opt(ts.0, 0).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// The one-line status shown above the canvas.
pub fn status_line(status: &PollStatus) -> String {
    match status {
        PollStatus::Waiting => "waiting for data".to_string(),
        PollStatus::Updated(ts) => format!("updated: {}", local_time(*ts)),
        PollStatus::NoData => "no pose data in latest snapshot".to_string(),
        PollStatus::Failed(reason) => format!("load failed: {}", reason),
    }
}
