//! Pan and zoom of the image/overlay container.
//!
//! The transform maps content coordinates to display coordinates as
//! `display = translate + scale * content`, applied with
//! `transform-origin: 0 0`. Only pointer handlers mutate it.

use serde::{Deserialize, Serialize};

use crate::telemetry::ImageDimensions;

/// Zoom factor per wheel step.
pub const ZOOM_STEP: f64 = 1.2;

pub const DEFAULT_MIN_SCALE: f64 = 0.1;
pub const DEFAULT_MAX_SCALE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    /// Always strictly positive
    pub scale: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewportTransform {
    /// Content point shown at display position `(x, y)`.
    pub fn to_content(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.translate_x) / self.scale,
            (y - self.translate_y) / self.scale,
        )
    }

    /// CSS `transform` value for the container.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PanState {
    #[default]
    Idle,
    Panning { last_x: f64, last_y: f64 },
}

/// Pointer-driven pan/zoom state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    transform: ViewportTransform,
    state: PanState,
    min_scale: f64,
    max_scale: f64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCALE, DEFAULT_MAX_SCALE)
    }
}

impl ViewportController {
    /// Bounds are reordered if swapped and forced positive.
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        let lo = min_scale.min(max_scale).max(f64::MIN_POSITIVE);
        let hi = min_scale.max(max_scale).max(lo);
        Self {
            transform: ViewportTransform::default(),
            state: PanState::Idle,
            min_scale: lo,
            max_scale: hi,
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.state, PanState::Panning { .. })
    }

    pub fn begin_pan(&mut self, x: f64, y: f64) {
        self.state = PanState::Panning {
            last_x: x,
            last_y: y,
        };
    }

    /// Move by the pointer delta since the last event. Ignored when idle.
    pub fn pan(&mut self, x: f64, y: f64) {
        if let PanState::Panning { last_x, last_y } = self.state {
            self.transform.translate_x += x - last_x;
            self.transform.translate_y += y - last_y;
            self.state = PanState::Panning {
                last_x: x,
                last_y: y,
            };
        }
    }

    pub fn end_pan(&mut self) {
        self.state = PanState::Idle;
    }

    /// Zoom one step around display point `(x, y)`.
    ///
    /// Negative `delta` (wheel up) zooms in, positive zooms out, zero does
    /// nothing. The content point under the pointer stays put. Returns
    /// whether the scale changed.
    pub fn zoom(&mut self, x: f64, y: f64, delta: f64) -> bool {
        let factor = if delta < 0.0 {
            ZOOM_STEP
        } else if delta > 0.0 {
            1.0 / ZOOM_STEP
        } else {
            return false;
        };
        self.zoom_by(x, y, factor)
    }

    fn zoom_by(&mut self, x: f64, y: f64, factor: f64) -> bool {
        let old = self.transform.scale;
        let new = (old * factor).clamp(self.min_scale, self.max_scale);
        if new == old {
            return false;
        }

        let (content_x, content_y) = self.transform.to_content(x, y);
        self.transform = ViewportTransform {
            translate_x: x - content_x * new,
            translate_y: y - content_y * new,
            scale: new,
        };
        true
    }

    /// Fit an image into a container: half the container height, centered.
    pub fn fit(&mut self, container_width: f64, container_height: f64, image: ImageDimensions) {
        if !image.is_ready() || container_height <= 0.0 {
            return;
        }
        let scale = (container_height / image.height as f64 / 2.0)
            .clamp(self.min_scale, self.max_scale);

        self.transform = ViewportTransform {
            translate_x: (container_width - image.width as f64 * scale) / 2.0,
            translate_y: (container_height - image.height as f64 * scale) / 2.0,
            scale,
        };
    }

    pub fn css_transform(&self) -> String {
        self.transform.css_transform()
    }
}

#[cfg(test)]
impl ViewportTransform {
    /// Display position of content point `(x, y)`.
    fn to_display(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.translate_x + self.scale * x,
            self.translate_y + self.scale * y,
        )
    }
}

#[cfg(test)]
impl ViewportController {
    fn transform(&self) -> ViewportTransform {
        self.transform
    }

    fn state(&self) -> PanState {
        self.state
    }
}
