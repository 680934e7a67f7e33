//! Brightness-profile chart feeding.

use crate::telemetry::RenderMode;

pub const X_AXIS_LABEL: &str = "Position (pixels)";
pub const Y_AXIS_LABEL: &str = "Brightness";
pub const HORIZONTAL_SERIES_LABEL: &str = "Horizontal";
pub const VERTICAL_SERIES_LABEL: &str = "Vertical";

/// At most this many labelled ticks along the x axis.
pub const MAX_X_TICKS: usize = 8;

/// A two-series line chart that can be shown or hidden.
pub trait ChartWidget {
    /// Replace both series. All three slices have the same length.
    fn set_series(&mut self, labels: &[usize], horizontal: &[f64], vertical: &[f64]);
    fn clear_series(&mut self);
    fn set_visible(&mut self, visible: bool);
}

/// What the adapter last did to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartState {
    #[default]
    Hidden,
    Showing { points: usize },
}

/// Keeps the chart widget in step with the render mode.
#[derive(Debug, Default)]
pub struct ChartAdapter {
    state: ChartState,
}

impl ChartAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile mode shows the chart with labels `0..N`; any other mode
    /// clears and hides it. A chart that is already hidden is left alone.
    pub fn apply<W: ChartWidget + ?Sized>(&mut self, widget: &mut W, mode: &RenderMode<'_>) {
        match mode {
            RenderMode::Profile(curve) => {
                let labels: Vec<usize> = (0..curve.len()).collect();
                widget.set_series(&labels, curve.horizontal(), curve.vertical());
                widget.set_visible(true);
                self.state = ChartState::Showing {
                    points: curve.len(),
                };
            }
            RenderMode::StarField { .. } => {
                if self.state == ChartState::Hidden {
                    return;
                }
                widget.clear_series();
                widget.set_visible(false);
                self.state = ChartState::Hidden;
            }
        }
    }
}

/// Indices of the x labels to draw so that at most `max_ticks` appear.
///
/// Always includes the first label; evenly skips the rest.
pub fn tick_indices(len: usize, max_ticks: usize) -> Vec<usize> {
    if len == 0 || max_ticks == 0 {
        return Vec::new();
    }
    let stride = len.div_ceil(max_ticks).max(1);
    (0..len).step_by(stride).collect()
}

/// Upper bound of the y axis: starts at zero and covers every sample.
pub fn y_axis_max(horizontal: &[f64], vertical: &[f64]) -> f64 {
    let max = horizontal
        .iter()
        .chain(vertical)
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

#[cfg(test)]
impl ChartAdapter {
    pub(crate) fn state(&self) -> ChartState {
        self.state
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::telemetry::{ProfileCurve, Star, TelemetryFrame};

    #[derive(Default)]
    pub(crate) struct FakeChart {
        pub labels: Vec<usize>,
        pub horizontal: Vec<f64>,
        pub vertical: Vec<f64>,
        pub visible: bool,
        pub clears: usize,
    }

    impl ChartWidget for FakeChart {
        fn set_series(&mut self, labels: &[usize], horizontal: &[f64], vertical: &[f64]) {
            self.labels = labels.to_vec();
            self.horizontal = horizontal.to_vec();
            self.vertical = vertical.to_vec();
        }

        fn clear_series(&mut self) {
            self.clears += 1;
            self.labels.clear();
            self.horizontal.clear();
            self.vertical.clear();
        }

        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }
    }

    #[test]
    fn test_profile_shows_chart() {
        let frame = TelemetryFrame {
            profile: ProfileCurve::from_flat(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]),
            ..Default::default()
        };
        let mut chart = FakeChart::default();
        let mut adapter = ChartAdapter::new();
        adapter.apply(&mut chart, &frame.render_mode());

        assert!(chart.visible);
        assert_eq!(chart.labels, vec![0, 1, 2]);
        assert_eq!(chart.horizontal, vec![1.0, 2.0, 3.0]);
        assert_eq!(chart.vertical, vec![1.0, 2.0, 3.0]);
        assert_eq!(adapter.state(), ChartState::Showing { points: 3 });
    }

    #[test]
    fn test_star_field_hides_and_clears_chart() {
        let profile_frame = TelemetryFrame {
            profile: ProfileCurve::from_flat(&[5.0, 6.0, 7.0, 8.0]),
            ..Default::default()
        };
        let star_frame = TelemetryFrame {
            stars: vec![Star::new(1.0, 1.0, 1.0)],
            ..Default::default()
        };
        let mut chart = FakeChart::default();
        let mut adapter = ChartAdapter::new();

        adapter.apply(&mut chart, &profile_frame.render_mode());
        adapter.apply(&mut chart, &star_frame.render_mode());

        assert!(!chart.visible);
        assert!(chart.labels.is_empty());
        assert!(chart.horizontal.is_empty());
        assert_eq!(adapter.state(), ChartState::Hidden);

        // Already hidden: nothing to redo.
        adapter.apply(&mut chart, &star_frame.render_mode());
        assert_eq!(chart.clears, 1);
    }

    #[test]
    fn test_tick_indices_respect_limit() {
        assert_eq!(tick_indices(3, 8), vec![0, 1, 2]);
        let ticks = tick_indices(100, MAX_X_TICKS);
        assert!(ticks.len() <= MAX_X_TICKS);
        assert_eq!(ticks[0], 0);
        assert!(tick_indices(0, 8).is_empty());
    }

    #[test]
    fn test_y_axis_starts_at_zero() {
        assert_eq!(y_axis_max(&[1.0, 5.0], &[2.0, 3.0]), 5.0);
        assert_eq!(y_axis_max(&[], &[]), 1.0);
        assert_eq!(y_axis_max(&[-2.0], &[f64::NAN]), 1.0);
    }
}
