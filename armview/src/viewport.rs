//! Map server image pixels onto the on-screen canvas.

use armview_lib::{ImageSize, Point};

/// The image dimensions server coordinates are measured against.
/// Once known they are only ever replaced, never forgotten.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImageDimensions {
    width: f64,
    height: f64,
}

impl ImageDimensions {
    pub const DEFAULT: Self = Self {
        width: 1280.0,
        height: 720.0,
    };

    pub fn new(size: ImageSize) -> Self {
        Self {
            width: size.w,
            height: size.h,
        }
    }

    /// Adopt the size announced by a snapshot, if it announced one.
    pub fn update(&mut self, size: Option<ImageSize>) {
        if let Some(size) = size {
            *self = Self::new(size);
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// height / width
    pub fn aspect(&self) -> f64 {
        self.height / self.width
    }
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The canvas region for one frame, in display units.
/// egui sizes the physical framebuffer from its own pixels-per-point, so
/// nothing here deals in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
    image: ImageDimensions,
}

impl Viewport {
    /// Fit the canvas into the available layout width, capped at max_width,
    /// with the same aspect ratio as the server image.
    pub fn fit(available_width: f64, max_width: f64, image: ImageDimensions) -> Self {
        let width = if available_width.is_finite() && available_width > 0.0 {
            available_width.min(max_width)
        } else {
            max_width
        };
        Self {
            width,
            height: (width * image.aspect()).round(),
            image,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Convert a point in server image pixels into canvas display units.
    pub fn scale(&self, p: Point) -> Point {
        Point {
            x: p.x * self.width / self.image.width(),
            y: p.y * self.height / self.image.height(),
        }
    }
}
