//! Telemetry data model received from the alignment camera.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A detected star in image space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Star {
    /// X position in image pixels
    pub x: f64,
    /// Y position in image pixels
    pub y: f64,
    /// Estimated diameter in pixels
    pub diameter: f64,
}

impl Star {
    pub fn new(x: f64, y: f64, diameter: f64) -> Self {
        Self { x, y, diameter }
    }
}

/// Brightness samples summed along the two image axes.
///
/// Both series always have the same length; the index is the pixel offset
/// along the respective axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileCurve {
    horizontal: Vec<f64>,
    vertical: Vec<f64>,
}

impl ProfileCurve {
    /// Build a curve from two series. Returns `None` if their lengths differ.
    pub fn new(horizontal: Vec<f64>, vertical: Vec<f64>) -> Option<Self> {
        if horizontal.len() != vertical.len() {
            return None;
        }
        Some(Self {
            horizontal,
            vertical,
        })
    }

    /// Split a flat sample sequence into its two halves (horizontal first).
    ///
    /// Returns `None` for an odd number of samples.
    pub fn from_flat(samples: &[f64]) -> Option<Self> {
        if samples.len() % 2 != 0 {
            return None;
        }
        let (horizontal, vertical) = samples.split_at(samples.len() / 2);
        Self::new(horizontal.to_vec(), vertical.to_vec())
    }

    pub fn horizontal(&self) -> &[f64] {
        &self.horizontal
    }

    pub fn vertical(&self) -> &[f64] {
        &self.vertical
    }

    /// Number of sample pairs.
    pub fn len(&self) -> usize {
        self.horizontal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty()
    }
}

/// Polar alignment indicators, all in pixels relative to the image center.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Indicators {
    /// Radius of the celestial pole's projected orbit
    pub radius_polaris: f64,
    /// Angle of the pole along its orbit in degrees (0 = up, clockwise)
    pub deg_polaris: f64,
    /// Plate-solve correction along X
    pub plate_solve_x: f64,
    /// Plate-solve correction along Y
    pub plate_solve_y: f64,
}

/// Pixel size of the currently loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True once both axes are known and non-zero.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Image center in pixel coordinates.
    pub fn center(&self) -> crate::geometry::Point {
        crate::geometry::Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything fetched from the device during a single poll cycle.
///
/// A frame is replaced wholesale every cycle; fields that could not be
/// fetched or decoded are empty/absent rather than carried over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TelemetryFrame {
    /// Free-form device status text
    pub status_text: String,
    /// Detected stars (empty if unavailable)
    pub stars: Vec<Star>,
    /// Brightness profile, present only in profile measurement mode
    pub profile: Option<ProfileCurve>,
    /// Alignment indicators
    pub indicators: Option<Indicators>,
}

impl TelemetryFrame {
    /// Decide which visualization applies to this frame.
    pub fn render_mode(&self) -> RenderMode<'_> {
        match &self.profile {
            Some(curve) if curve.len() > 1 => RenderMode::Profile(curve),
            _ => RenderMode::StarField {
                stars: &self.stars,
                indicators: self.indicators.as_ref(),
            },
        }
    }
}

/// The visualization selected for one frame.
///
/// The two modes are mutually exclusive: a profile with more than one
/// sample pair takes precedence and star/indicator data is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode<'a> {
    /// Draw star circles and alignment indicators on the overlay
    StarField {
        stars: &'a [Star],
        indicators: Option<&'a Indicators>,
    },
    /// Show the brightness profile chart
    Profile(&'a ProfileCurve),
}

impl RenderMode<'_> {
    pub fn is_profile(&self) -> bool {
        matches!(self, RenderMode::Profile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators() -> Indicators {
        Indicators {
            radius_polaris: 100.0,
            deg_polaris: 45.0,
            plate_solve_x: 3.0,
            plate_solve_y: -4.0,
        }
    }

    #[test]
    fn test_profile_from_flat_splits_halves() {
        let curve = ProfileCurve::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(curve.horizontal(), &[1.0, 2.0, 3.0]);
        assert_eq!(curve.vertical(), &[4.0, 5.0, 6.0]);
        assert_eq!(curve.len(), 3);
    }

    #[test]
    fn test_profile_rejects_odd_and_mismatched() {
        assert!(ProfileCurve::from_flat(&[1.0, 2.0, 3.0]).is_none());
        assert!(ProfileCurve::new(vec![1.0], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_profile_with_many_samples_wins() {
        let frame = TelemetryFrame {
            status_text: String::new(),
            stars: vec![Star::new(1.0, 2.0, 3.0)],
            profile: ProfileCurve::from_flat(&[1.0, 2.0, 1.0, 2.0]),
            indicators: Some(indicators()),
        };
        assert!(frame.render_mode().is_profile());
    }

    #[test]
    fn test_single_sample_profile_falls_back_to_stars() {
        let frame = TelemetryFrame {
            status_text: String::new(),
            stars: vec![Star::new(1.0, 2.0, 3.0)],
            profile: ProfileCurve::from_flat(&[7.0, 8.0]),
            indicators: Some(indicators()),
        };
        match frame.render_mode() {
            RenderMode::StarField { stars, indicators } => {
                assert_eq!(stars.len(), 1);
                assert!(indicators.is_some());
            }
            RenderMode::Profile(_) => panic!("expected star field"),
        }
    }

    #[test]
    fn test_dimensions_readiness_and_center() {
        assert!(!ImageDimensions::default().is_ready());
        assert!(!ImageDimensions::new(640, 0).is_ready());

        let dims = ImageDimensions::new(640, 480);
        assert!(dims.is_ready());
        assert_eq!(dims.center(), crate::geometry::Point::new(320.0, 240.0));
        assert_eq!(dims.to_string(), "640x480");
    }
}
