//! Two-series line chart drawn on a canvas.

use polar_shared::chart::{
    tick_indices, y_axis_max, ChartWidget, HORIZONTAL_SERIES_LABEL, MAX_X_TICKS,
    VERTICAL_SERIES_LABEL, X_AXIS_LABEL, Y_AXIS_LABEL,
};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use yew::NodeRef;

const HORIZONTAL_COLOR: &str = "orange";
const VERTICAL_COLOR: &str = "blue";
const TEXT_COLOR: &str = "#ffffff";
const AXIS_COLOR: &str = "#666666";

// Plot area margins in pixels.
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 15.0;
const MARGIN_TOP: f64 = 25.0;
const MARGIN_BOTTOM: f64 = 45.0;

const Y_TICKS: usize = 5;

pub struct LineChart {
    node: NodeRef,
    labels: Vec<usize>,
    horizontal: Vec<f64>,
    vertical: Vec<f64>,
}

impl LineChart {
    pub fn new(node: NodeRef) -> Self {
        Self {
            node,
            labels: Vec::new(),
            horizontal: Vec::new(),
            vertical: Vec::new(),
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    fn context(&self) -> Option<(HtmlCanvasElement, CanvasRenderingContext2d)> {
        let canvas = self.node.cast::<HtmlCanvasElement>()?;
        let ctx = match canvas.get_context("2d") {
            Ok(Some(ctx)) => ctx.dyn_into::<CanvasRenderingContext2d>().ok()?,
            _ => return None,
        };
        Some((canvas, ctx))
    }

    fn redraw(&self) {
        let Some((canvas, ctx)) = self.context() else {
            return;
        };

        let width = canvas.width() as f64;
        let height = canvas.height() as f64;
        ctx.clear_rect(0.0, 0.0, width, height);

        let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;
        if plot_w <= 0.0 || plot_h <= 0.0 {
            return;
        }

        let y_max = y_axis_max(&self.horizontal, &self.vertical);
        let points = self.labels.len();
        let x_of = |i: usize| {
            if points > 1 {
                MARGIN_LEFT + plot_w * i as f64 / (points - 1) as f64
            } else {
                MARGIN_LEFT + plot_w / 2.0
            }
        };
        let y_of = |v: f64| MARGIN_TOP + plot_h * (1.0 - (v / y_max).clamp(0.0, 1.0));

        // Axes
        ctx.set_stroke_style_str(AXIS_COLOR);
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(MARGIN_LEFT, MARGIN_TOP);
        ctx.line_to(MARGIN_LEFT, MARGIN_TOP + plot_h);
        ctx.line_to(MARGIN_LEFT + plot_w, MARGIN_TOP + plot_h);
        ctx.stroke();

        ctx.set_fill_style_str(TEXT_COLOR);
        ctx.set_font("11px monospace");

        ctx.set_text_align("center");
        for i in tick_indices(points, MAX_X_TICKS) {
            let _ = ctx.fill_text(
                &self.labels[i].to_string(),
                x_of(i),
                MARGIN_TOP + plot_h + 14.0,
            );
        }
        let _ = ctx.fill_text(X_AXIS_LABEL, MARGIN_LEFT + plot_w / 2.0, height - 8.0);

        ctx.set_text_align("right");
        for step in 0..=Y_TICKS {
            let value = y_max * step as f64 / Y_TICKS as f64;
            let _ = ctx.fill_text(&format!("{value:.0}"), MARGIN_LEFT - 6.0, y_of(value) + 4.0);
        }

        ctx.save();
        let _ = ctx.translate(14.0, MARGIN_TOP + plot_h / 2.0);
        let _ = ctx.rotate(-std::f64::consts::FRAC_PI_2);
        ctx.set_text_align("center");
        let _ = ctx.fill_text(Y_AXIS_LABEL, 0.0, 0.0);
        ctx.restore();

        // Legend
        ctx.set_text_align("left");
        for (slot, (label, color)) in [
            (VERTICAL_SERIES_LABEL, VERTICAL_COLOR),
            (HORIZONTAL_SERIES_LABEL, HORIZONTAL_COLOR),
        ]
        .into_iter()
        .enumerate()
        {
            let x = MARGIN_LEFT + slot as f64 * 110.0;
            ctx.set_fill_style_str(color);
            ctx.fill_rect(x, 8.0, 24.0, 8.0);
            ctx.set_fill_style_str(TEXT_COLOR);
            let _ = ctx.fill_text(label, x + 30.0, 16.0);
        }

        for (series, color) in [
            (&self.horizontal, HORIZONTAL_COLOR),
            (&self.vertical, VERTICAL_COLOR),
        ] {
            if series.is_empty() {
                continue;
            }
            ctx.set_stroke_style_str(color);
            ctx.set_line_width(2.0);
            ctx.begin_path();
            for (i, &value) in series.iter().enumerate() {
                if i == 0 {
                    ctx.move_to(x_of(i), y_of(value));
                } else {
                    ctx.line_to(x_of(i), y_of(value));
                }
            }
            ctx.stroke();
        }
    }
}

impl ChartWidget for LineChart {
    fn set_series(&mut self, labels: &[usize], horizontal: &[f64], vertical: &[f64]) {
        self.labels = labels.to_vec();
        self.horizontal = horizontal.to_vec();
        self.vertical = vertical.to_vec();
        self.redraw();
    }

    fn clear_series(&mut self) {
        self.labels.clear();
        self.horizontal.clear();
        self.vertical.clear();
        self.redraw();
    }

    fn set_visible(&mut self, visible: bool) {
        if let Some(canvas) = self.node.cast::<HtmlCanvasElement>() {
            let display = if visible { "block" } else { "none" };
            if canvas.style().set_property("display", display).is_err() {
                log::debug!("cannot toggle chart visibility");
            }
        }
    }
}
