//! Overlay drawing for star markers and alignment indicators.
//!
//! Rendering is split in two steps: [`DrawList::build`] turns a render mode
//! into a flat list of stroke operations, and [`DrawList::replay`] issues
//! them against a [`Surface`]. The browser implements `Surface` on a 2D
//! canvas context; tests record the calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PanelErrorKind;
use crate::geometry::{self, Point, Segment};
use crate::telemetry::{ImageDimensions, RenderMode};

/// Added to each star's diameter to get its marker radius.
pub const STAR_MARKER_PADDING: f64 = 3.0;

/// Star markers are centered on the middle of the star's pixel.
pub const PIXEL_CENTER_OFFSET: f64 = 0.5;

pub const STATUS_NOT_READY: &str = "Image not fully loaded yet!";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    #[error("{}", STATUS_NOT_READY)]
    NotReady,
}

impl RenderError {
    pub fn kind(&self) -> PanelErrorKind {
        match self {
            RenderError::NotReady => PanelErrorKind::NotReady,
        }
    }
}

/// Stroke colors used on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Red,
    Blue,
    Gray,
    Green,
}

impl Color {
    /// CSS color name.
    pub fn css(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Gray => "gray",
            Color::Green => "green",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub const fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

pub const STAR_STROKE: Stroke = Stroke::new(Color::Red, 3.0);
pub const POLE_LINE_STROKE: Stroke = Stroke::new(Color::Blue, 3.0);
pub const HOUR_GRID_STROKE: Stroke = Stroke::new(Color::Gray, 1.0);
pub const ORBIT_STROKE: Stroke = Stroke::new(Color::Blue, 5.0);
pub const PLATE_SOLVE_STROKE: Stroke = Stroke::new(Color::Green, 3.0);

/// A 2D raster the overlay is drawn on.
pub trait Surface {
    /// Current pixel size of the backing raster.
    fn dimensions(&self) -> ImageDimensions;
    /// Resize the backing raster (not its displayed size).
    fn resize(&mut self, dims: ImageDimensions);
    fn clear(&mut self);
    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke);
    fn stroke_line(&mut self, segment: Segment, stroke: Stroke);
}

/// A single drawing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Clear,
    Circle {
        center: Point,
        radius: f64,
        stroke: Stroke,
    },
    Line { segment: Segment, stroke: Stroke },
}

/// Ordered drawing operations for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawList {
    ops: Vec<DrawOp>,
}

impl DrawList {
    /// Build the operations for `mode` on an image of size `dims`.
    ///
    /// Always starts with a clear. Profile mode draws nothing else. Star
    /// mode draws star markers, then the pole line, hour grid, orbit and
    /// plate-solve vector.
    pub fn build(mode: &RenderMode<'_>, dims: ImageDimensions) -> Self {
        let mut ops = vec![DrawOp::Clear];

        if let RenderMode::StarField { stars, indicators } = mode {
            ops.extend(stars.iter().map(|star| DrawOp::Circle {
                center: Point::new(
                    star.x + PIXEL_CENTER_OFFSET,
                    star.y + PIXEL_CENTER_OFFSET,
                ),
                radius: star.diameter + STAR_MARKER_PADDING,
                stroke: STAR_STROKE,
            }));

            if let Some(indicators) = indicators {
                let geometry = geometry::project(dims.center(), indicators);

                ops.push(DrawOp::Line {
                    segment: geometry.pole_line(),
                    stroke: POLE_LINE_STROKE,
                });
                ops.extend(geometry.hour_grid_lines.iter().map(|segment| DrawOp::Line {
                    segment: *segment,
                    stroke: HOUR_GRID_STROKE,
                }));
                ops.push(DrawOp::Circle {
                    center: geometry.orbit_center,
                    radius: geometry.orbit_radius,
                    stroke: ORBIT_STROKE,
                });
                ops.push(DrawOp::Line {
                    segment: geometry.plate_solve_line(),
                    stroke: PLATE_SOLVE_STROKE,
                });
            }
        }

        Self { ops }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn circle_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count()
    }

    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }

    pub fn replay<S: Surface + ?Sized>(&self, surface: &mut S) {
        for op in &self.ops {
            match *op {
                DrawOp::Clear => surface.clear(),
                DrawOp::Circle {
                    center,
                    radius,
                    stroke,
                } => surface.stroke_circle(center, radius, stroke),
                DrawOp::Line { segment, stroke } => surface.stroke_line(segment, stroke),
            }
        }
    }
}

/// Summary of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOutcome {
    /// The surface was resized to new image dimensions
    pub resized: bool,
    pub circles: usize,
    pub lines: usize,
}

/// Redraws the overlay surface for each frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `mode` onto `surface`.
    ///
    /// Returns [`RenderError::NotReady`] without touching the surface while
    /// the image size is unknown.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        mode: &RenderMode<'_>,
        dims: ImageDimensions,
    ) -> Result<RenderOutcome, RenderError> {
        if !dims.is_ready() {
            return Err(RenderError::NotReady);
        }

        let resized = surface.dimensions() != dims;
        if resized {
            log::debug!("resizing overlay to {dims}");
            surface.resize(dims);
        }

        let list = DrawList::build(mode, dims);
        list.replay(surface);

        Ok(RenderOutcome {
            resized,
            circles: list.circle_count(),
            lines: list.line_count(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::telemetry::{Indicators, ProfileCurve, Star, TelemetryFrame};
    use approx::assert_relative_eq;

    /// Surface that records every call in order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub dims: ImageDimensions,
        pub resizes: usize,
        pub ops: Vec<DrawOp>,
    }

    impl RecordingSurface {
        /// Operations since the most recent clear.
        pub fn visible(&self) -> &[DrawOp] {
            let start = self
                .ops
                .iter()
                .rposition(|op| *op == DrawOp::Clear)
                .unwrap_or(0);
            &self.ops[start..]
        }
    }

    impl Surface for RecordingSurface {
        fn dimensions(&self) -> ImageDimensions {
            self.dims
        }

        fn resize(&mut self, dims: ImageDimensions) {
            self.dims = dims;
            self.resizes += 1;
        }

        fn clear(&mut self) {
            self.ops.push(DrawOp::Clear);
        }

        fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke) {
            self.ops.push(DrawOp::Circle {
                center,
                radius,
                stroke,
            });
        }

        fn stroke_line(&mut self, segment: Segment, stroke: Stroke) {
            self.ops.push(DrawOp::Line { segment, stroke });
        }
    }

    fn frame_with_indicators() -> TelemetryFrame {
        TelemetryFrame {
            status_text: "ok".into(),
            stars: vec![Star::new(10.0, 20.0, 4.0), Star::new(100.0, 50.0, 1.0)],
            profile: None,
            indicators: Some(Indicators {
                radius_polaris: 80.0,
                deg_polaris: 30.0,
                plate_solve_x: 5.0,
                plate_solve_y: 5.0,
            }),
        }
    }

    #[test]
    fn test_single_star_without_indicators() {
        let frame = TelemetryFrame {
            stars: vec![Star::new(10.0, 10.0, 2.0)],
            ..Default::default()
        };
        let mut surface = RecordingSurface::default();
        let outcome = OverlayRenderer::new()
            .render(&mut surface, &frame.render_mode(), ImageDimensions::new(64, 64))
            .unwrap();

        assert_eq!(outcome.circles, 1);
        assert_eq!(outcome.lines, 0);
        assert_eq!(
            surface.ops,
            vec![
                DrawOp::Clear,
                DrawOp::Circle {
                    center: Point::new(10.5, 10.5),
                    radius: 5.0,
                    stroke: STAR_STROKE,
                },
            ]
        );
    }

    #[test]
    fn test_draw_order_with_indicators() {
        let frame = frame_with_indicators();
        let list = DrawList::build(&frame.render_mode(), ImageDimensions::new(640, 480));
        let ops = list.ops();

        // clear, 2 stars, pole line, 24 grid lines, orbit, plate-solve
        assert_eq!(ops.len(), 1 + 2 + 1 + 24 + 1 + 1);
        let stroke_of = |op: &DrawOp| match op {
            DrawOp::Circle { stroke, .. } | DrawOp::Line { stroke, .. } => Some(*stroke),
            DrawOp::Clear => None,
        };
        assert_eq!(ops[0], DrawOp::Clear);
        assert_eq!(stroke_of(&ops[1]), Some(STAR_STROKE));
        assert_eq!(stroke_of(&ops[2]), Some(STAR_STROKE));
        assert!(matches!(ops[3], DrawOp::Line { .. }));
        assert_eq!(stroke_of(&ops[3]), Some(POLE_LINE_STROKE));
        for op in &ops[4..28] {
            assert!(matches!(op, DrawOp::Line { .. }));
            assert_eq!(stroke_of(op), Some(HOUR_GRID_STROKE));
        }
        match ops[28] {
            DrawOp::Circle {
                center,
                radius,
                stroke,
            } => {
                assert_eq!(center, Point::new(320.0, 240.0));
                assert_relative_eq!(radius, 80.0);
                assert_eq!(stroke, ORBIT_STROKE);
            }
            other => panic!("expected orbit circle, got {other:?}"),
        }
        match ops[29] {
            DrawOp::Line { segment, stroke } => {
                assert_eq!(stroke, PLATE_SOLVE_STROKE);
                assert_relative_eq!(segment.to.x - segment.from.x, 5.0, epsilon = 1e-9);
                assert_relative_eq!(segment.to.y - segment.from.y, 5.0, epsilon = 1e-9);
            }
            other => panic!("expected plate-solve line, got {other:?}"),
        }
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let frame = frame_with_indicators();
        let dims = ImageDimensions::new(640, 480);
        let renderer = OverlayRenderer::new();
        let mut surface = RecordingSurface::default();

        renderer.render(&mut surface, &frame.render_mode(), dims).unwrap();
        let first = surface.visible().to_vec();
        renderer.render(&mut surface, &frame.render_mode(), dims).unwrap();

        assert_eq!(surface.visible(), first.as_slice());
        assert_eq!(surface.resizes, 1);
    }

    #[test]
    fn test_profile_mode_only_clears() {
        let frame = TelemetryFrame {
            profile: ProfileCurve::from_flat(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]),
            ..frame_with_indicators()
        };
        let mut surface = RecordingSurface::default();
        let outcome = OverlayRenderer::new()
            .render(&mut surface, &frame.render_mode(), ImageDimensions::new(64, 64))
            .unwrap();

        assert_eq!(surface.ops, vec![DrawOp::Clear]);
        assert_eq!(outcome.circles + outcome.lines, 0);
    }

    #[test]
    fn test_not_ready_leaves_surface_untouched() {
        let frame = frame_with_indicators();
        let mut surface = RecordingSurface {
            dims: ImageDimensions::new(10, 10),
            ..Default::default()
        };
        let err = OverlayRenderer::new()
            .render(&mut surface, &frame.render_mode(), ImageDimensions::new(640, 0))
            .unwrap_err();

        assert_eq!(err, RenderError::NotReady);
        assert_eq!(err.to_string(), "Image not fully loaded yet!");
        assert!(surface.ops.is_empty());
        assert_eq!(surface.dims, ImageDimensions::new(10, 10));
    }

    #[test]
    fn test_surface_follows_image_size() {
        let frame = frame_with_indicators();
        let renderer = OverlayRenderer::new();
        let mut surface = RecordingSurface::default();

        let first = renderer
            .render(&mut surface, &frame.render_mode(), ImageDimensions::new(640, 480))
            .unwrap();
        let second = renderer
            .render(&mut surface, &frame.render_mode(), ImageDimensions::new(1280, 960))
            .unwrap();

        assert!(first.resized);
        assert!(second.resized);
        assert_eq!(surface.dims, ImageDimensions::new(1280, 960));
    }
}
