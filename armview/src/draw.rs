use armview_lib::{Angles, Joint, Point};
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Shape, Stroke};

use crate::animation::AnimationState;
use crate::viewport::Viewport;

const MARKER_RADIUS: f64 = 4.0;
const LABEL_OFFSET: Point = Point { x: 6.0, y: -6.0 };
const ANGLE_TEXT_POSITION: Point = Point { x: 10.0, y: 20.0 };

/// Limbs, drawn in this order.
const BONES: [(Joint, Joint, LineStyle); 3] = [
    (Joint::Shoulder, Joint::Elbow, LineStyle::Solid),
    (Joint::Elbow, Joint::Wrist, LineStyle::Solid),
    (
        Joint::Hip,
        Joint::Shoulder,
        LineStyle::Dashed { dash: 6.0, gap: 4.0 },
    ),
];

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LineStyle {
    Solid,
    Dashed { dash: f64, gap: f64 },
}

/// A surface to draw the skeleton on, in canvas display units.
pub trait Canvas {
    fn clear(&mut self);
    fn line(&mut self, from: Point, to: Point, style: LineStyle);
    fn marker(&mut self, center: Point, radius: f64);
    /// Draw text with its baseline starting at the given point.
    fn text(&mut self, at: Point, text: &str);
}

pub trait Draw {
    fn draw<C: Canvas>(&self, canvas: &mut C, viewport: &Viewport);
}

impl Draw for AnimationState {
    fn draw<C: Canvas>(&self, canvas: &mut C, viewport: &Viewport) {
        canvas.clear();
        if !self.is_live() {
            return;
        }
        let points = self.pose().map(|p| viewport.scale(*p));

        for (a, b, style) in BONES {
            if let (Some(from), Some(to)) = (points.get(a), points.get(b)) {
                canvas.line(*from, *to, style);
            }
        }
        for (joint, p) in points.iter() {
            canvas.marker(*p, MARKER_RADIUS);
            canvas.text(
                Point::new(p.x + LABEL_OFFSET.x, p.y + LABEL_OFFSET.y),
                &joint.to_string(),
            );
        }
        canvas.text(ANGLE_TEXT_POSITION, &angle_text(self.angles()));
    }
}

/// The angle readout drawn in the canvas corner.
pub fn angle_text(angles: Angles) -> String {
    let fmt = |a: Option<f64>| a.map(|a| format!("{:.1}", a)).unwrap_or_else(|| "-".to_string());
    format!(
        "angles: shoulder={}°, elbow={}°",
        fmt(angles.shoulder),
        fmt(angles.elbow)
    )
}

/// Draw onto an egui painter, with the canvas origin at the top left of rect.
pub struct PainterCanvas<'p> {
    painter: &'p egui::Painter,
    rect: Rect,
}

impl<'p> PainterCanvas<'p> {
    const BACKGROUND: Color32 = Color32::WHITE;
    const LIMB: Color32 = Color32::from_gray(0x66);
    const INK: Color32 = Color32::from_gray(0x11);
    const LIMB_WIDTH: f32 = 2.0;

    pub fn new(painter: &'p egui::Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }

    fn pos(&self, p: Point) -> Pos2 {
        self.rect.min + egui::vec2(p.x as f32, p.y as f32)
    }
}

impl Canvas for PainterCanvas<'_> {
    fn clear(&mut self) {
        self.painter.rect_filled(self.rect, 0.0, Self::BACKGROUND);
    }

    fn line(&mut self, from: Point, to: Point, style: LineStyle) {
        let ends = [self.pos(from), self.pos(to)];
        let stroke = Stroke::new(Self::LIMB_WIDTH, Self::LIMB);
        match style {
            LineStyle::Solid => {
                self.painter.line_segment(ends, stroke);
            }
            LineStyle::Dashed { dash, gap } => {
                self.painter
                    .extend(Shape::dashed_line(&ends, stroke, dash as f32, gap as f32));
            }
        }
    }

    fn marker(&mut self, center: Point, radius: f64) {
        self.painter
            .circle_filled(self.pos(center), radius as f32, Self::INK);
    }

    fn text(&mut self, at: Point, text: &str) {
        self.painter.text(
            self.pos(at),
            Align2::LEFT_BOTTOM,
            text,
            FontId::monospace(12.0),
            Self::INK,
        );
    }
}
