//! Screen-space projection of the polar alignment indicators.
//!
//! Angles follow the device convention: 0° points up (negative Y in image
//! space) and angles grow clockwise, so a point at radius `r` and angle `θ`
//! around a center `c` lands at `(c.x + r·sin θ, c.y − r·cos θ)`.

use serde::{Deserialize, Serialize};

use crate::telemetry::Indicators;

/// Number of hour lines drawn around the pole orbit, one per sidereal hour.
pub const HOUR_GRID_LINES: usize = 24;

/// Angular spacing between hour lines in degrees.
pub const HOUR_GRID_STEP_DEG: f64 = 360.0 / HOUR_GRID_LINES as f64;

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A straight line between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }
}

/// Projected alignment indicators ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentGeometry {
    /// Image center; start of the pole line and of every hour line
    pub orbit_center: Point,
    /// Radius of the pole's orbit circle
    pub orbit_radius: f64,
    /// Current pole position on the orbit
    pub pole_line_end: Point,
    /// Pole position shifted by the plate-solve correction
    pub plate_solve_end: Point,
    /// One line per sidereal hour, at 0°, 15°, ..., 345°
    pub hour_grid_lines: [Segment; HOUR_GRID_LINES],
}

impl AlignmentGeometry {
    /// Line from the image center to the pole.
    pub fn pole_line(&self) -> Segment {
        Segment::new(self.orbit_center, self.pole_line_end)
    }

    /// Plate-solve correction vector, starting at the pole.
    pub fn plate_solve_line(&self) -> Segment {
        Segment::new(self.pole_line_end, self.plate_solve_end)
    }
}

/// Point at `radius` and `degrees` around `center`.
pub fn polar_point(center: Point, radius: f64, degrees: f64) -> Point {
    let theta = degrees.to_radians();
    Point::new(
        center.x + radius * theta.sin(),
        center.y - radius * theta.cos(),
    )
}

/// Project the indicators around `center`.
pub fn project(center: Point, indicators: &Indicators) -> AlignmentGeometry {
    let radius = indicators.radius_polaris;
    let pole_line_end = polar_point(center, radius, indicators.deg_polaris);

    let hour_grid_lines = std::array::from_fn(|i| {
        Segment::new(
            center,
            polar_point(center, radius, i as f64 * HOUR_GRID_STEP_DEG),
        )
    });

    AlignmentGeometry {
        orbit_center: center,
        orbit_radius: radius,
        pole_line_end,
        plate_solve_end: pole_line_end.offset(indicators.plate_solve_x, indicators.plate_solve_y),
        hour_grid_lines,
    }
}

/// Local mean sidereal time in hours, `[0, 24)`.
///
/// Low-precision GMST polynomial, good to well under a second of time for
/// dates near the present.
pub fn local_mean_sidereal_time(unix_seconds: f64, longitude_deg: f64) -> f64 {
    // Days and Julian centuries since 2000-01-01 12:00 UT1.
    let days = unix_seconds / 86_400.0 + 2_440_587.5 - 2_451_545.0;
    let t = days / 36_525.0;

    let gmst_s = 24_110.548_41 + 8_640_184.812_866 * t + 0.093_104 * t.powi(2)
        - 0.000_006_2 * t.powi(3)
        + unix_seconds;
    let lmst_s = gmst_s + 3_600.0 * longitude_deg / 15.0;

    (lmst_s / 3_600.0).rem_euclid(24.0)
}

/// Pole orbit angle in degrees for a local mean sidereal time in hours.
///
/// Matches the device firmware's conversion; the result is normalized to
/// `[0, 360)`.
pub fn polaris_angle_from_lmst(lmst_hours: f64) -> f64 {
    let degrees = 30.0 * (12.0 - (lmst_hours - 17.0 / 6.0) / 2.0 + 6.0);
    degrees.rem_euclid(360.0)
}

/// Convert an orbit radius in arcseconds to pixels for a given plate scale.
///
/// Returns `None` for a non-positive plate scale.
pub fn arcsec_radius_to_pixels(radius_arcsec: f64, arcsec_per_px: f64) -> Option<f64> {
    if arcsec_per_px > 0.0 {
        Some(radius_arcsec / arcsec_per_px)
    } else {
        None
    }
}
