//! 2D canvas backing for the overlay.

use std::f64::consts::TAU;

use polar_shared::overlay::{Stroke, Surface};
use polar_shared::{ImageDimensions, Point, Segment};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use yew::NodeRef;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Wrap the canvas behind `node`, if it is mounted and has a 2D context.
    pub fn from_node(node: &NodeRef) -> Option<Self> {
        let canvas = node.cast::<HtmlCanvasElement>()?;
        let ctx = match canvas.get_context("2d") {
            Ok(Some(ctx)) => ctx.dyn_into::<CanvasRenderingContext2d>().ok()?,
            _ => return None,
        };
        Some(Self { canvas, ctx })
    }

    fn apply_stroke(&self, stroke: Stroke) {
        self.ctx.set_stroke_style_str(stroke.color.css());
        self.ctx.set_line_width(stroke.width);
    }
}

impl Surface for CanvasSurface {
    fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, dims: ImageDimensions) {
        self.canvas.set_width(dims.width);
        self.canvas.set_height(dims.height);
    }

    fn clear(&mut self) {
        let dims = self.dimensions();
        self.ctx
            .clear_rect(0.0, 0.0, dims.width as f64, dims.height as f64);
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke) {
        self.ctx.begin_path();
        self.apply_stroke(stroke);
        // Only fails for a negative radius.
        if self.ctx.arc(center.x, center.y, radius, 0.0, TAU).is_err() {
            log::debug!("skipping circle with radius {radius}");
            return;
        }
        self.ctx.stroke();
    }

    fn stroke_line(&mut self, segment: Segment, stroke: Stroke) {
        self.ctx.begin_path();
        self.apply_stroke(stroke);
        self.ctx.move_to(segment.from.x, segment.from.y);
        self.ctx.line_to(segment.to.x, segment.to.y);
        self.ctx.stroke();
    }
}
