//! Decoding of the device's telemetry encodings.
//!
//! The device exposes the same data either as one combined JSON document
//! (`/info`) or as several plain-text endpoints. Every logical field is
//! decoded on its own so that a malformed field can be dropped without
//! losing the rest of the frame.

use serde_json::Value;
use thiserror::Error;

use crate::telemetry::{Indicators, ProfileCurve, Star, TelemetryFrame};

/// Error decoding a single telemetry field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("{field}: invalid number {token:?}")]
    InvalidNumber { field: &'static str, token: String },
    #[error("{field}: expected {expected} values, found {found}")]
    WrongArity {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("profile: odd sample count {0}")]
    OddSampleCount(usize),
    #[error("profile: horizontal has {horizontal} samples, vertical has {vertical}")]
    LengthMismatch { horizontal: usize, vertical: usize },
    #[error("stars: negative diameter {0}")]
    NegativeDiameter(f64),
    #[error("{field}: unexpected JSON shape")]
    UnexpectedShape { field: &'static str },
    #[error("invalid JSON document: {0}")]
    Json(String),
}

fn parse_number(field: &'static str, token: &str) -> Result<f64, WireError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| WireError::InvalidNumber {
            field,
            token: token.to_string(),
        })
}

fn non_blank_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn checked_star(x: f64, y: f64, diameter: f64) -> Result<Star, WireError> {
    if diameter < 0.0 {
        return Err(WireError::NegativeDiameter(diameter));
    }
    Ok(Star::new(x, y, diameter))
}

// === Plain-text endpoints ===

/// `/status`: the whole body is the status text.
pub fn decode_status_text(body: &str) -> String {
    body.trim_end().to_string()
}

/// `/stars`: one `x y diameter` triple per line.
pub fn decode_stars_text(body: &str) -> Result<Vec<Star>, WireError> {
    non_blank_lines(body)
        .map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 3 {
                return Err(WireError::WrongArity {
                    field: "stars",
                    expected: 3,
                    found: tokens.len(),
                });
            }
            checked_star(
                parse_number("stars", tokens[0])?,
                parse_number("stars", tokens[1])?,
                parse_number("stars", tokens[2])?,
            )
        })
        .collect()
}

/// `/profil`: one sample per line, horizontal half first.
///
/// An empty body means the device is not in profile mode.
pub fn decode_profile_text(body: &str) -> Result<Option<ProfileCurve>, WireError> {
    let samples = non_blank_lines(body)
        .map(|line| parse_number("profile", line))
        .collect::<Result<Vec<_>, _>>()?;

    if samples.is_empty() {
        return Ok(None);
    }

    ProfileCurve::from_flat(&samples)
        .map(Some)
        .ok_or(WireError::OddSampleCount(samples.len()))
}

/// `/indicators`: radius, angle in degrees, plate-solve dx, plate-solve dy.
pub fn decode_indicators_text(body: &str) -> Result<Indicators, WireError> {
    let values = non_blank_lines(body)
        .map(|line| parse_number("indicators", line))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [radius, deg, dx, dy] => Ok(Indicators {
            radius_polaris: *radius,
            deg_polaris: *deg,
            plate_solve_x: *dx,
            plate_solve_y: *dy,
        }),
        other => Err(WireError::WrongArity {
            field: "indicators",
            expected: 4,
            found: other.len(),
        }),
    }
}

// === Combined JSON document ===

fn json_number(field: &'static str, value: &Value) -> Result<f64, WireError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(WireError::UnexpectedShape { field }),
        Value::String(s) => parse_number(field, s),
        _ => Err(WireError::UnexpectedShape { field }),
    }
}

fn json_series(field: &'static str, value: &Value) -> Result<Vec<f64>, WireError> {
    value
        .as_array()
        .ok_or(WireError::UnexpectedShape { field })?
        .iter()
        .map(|v| json_number(field, v))
        .collect()
}

fn json_star(value: &Value) -> Result<Star, WireError> {
    let field = "stars";
    let obj = value.as_object().ok_or(WireError::UnexpectedShape { field })?;
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| obj.get(*k))
            .ok_or(WireError::UnexpectedShape { field })
            .and_then(|v| json_number(field, v))
    };
    checked_star(get(&["x"])?, get(&["y"])?, get(&["d", "diameter"])?)
}

/// `stars` field: an array of `{x, y, d}` objects.
pub fn decode_stars_json(value: &Value) -> Result<Vec<Star>, WireError> {
    value
        .as_array()
        .ok_or(WireError::UnexpectedShape { field: "stars" })?
        .iter()
        .map(json_star)
        .collect()
}

/// `profil` field: `{horizontal, vertical}` (the device spells the first
/// key `horizonzal`) or a flat array split in halves.
pub fn decode_profile_json(value: &Value) -> Result<Option<ProfileCurve>, WireError> {
    let field = "profile";
    if let Value::Array(_) = value {
        let samples = json_series(field, value)?;
        if samples.is_empty() {
            return Ok(None);
        }
        return ProfileCurve::from_flat(&samples)
            .map(Some)
            .ok_or(WireError::OddSampleCount(samples.len()));
    }

    let obj = value.as_object().ok_or(WireError::UnexpectedShape { field })?;
    let horizontal = obj
        .get("horizontal")
        .or_else(|| obj.get("horizonzal"))
        .ok_or(WireError::UnexpectedShape { field })?;
    let vertical = obj.get("vertical").ok_or(WireError::UnexpectedShape { field })?;

    let horizontal = json_series(field, horizontal)?;
    let vertical = json_series(field, vertical)?;

    if horizontal.is_empty() && vertical.is_empty() {
        return Ok(None);
    }
    let (h_len, v_len) = (horizontal.len(), vertical.len());
    ProfileCurve::new(horizontal, vertical)
        .map(Some)
        .ok_or(WireError::LengthMismatch {
            horizontal: h_len,
            vertical: v_len,
        })
}

/// Indicator fields spread over the document root.
///
/// Returns `Ok(None)` when none of the four keys are present.
pub fn decode_indicators_json(root: &Value) -> Result<Option<Indicators>, WireError> {
    const KEYS: [&str; 4] = ["radius_polaris", "deg_polaris", "pltslv_x", "pltslv_y"];

    let present: Vec<&Value> = KEYS.iter().filter_map(|k| root.get(*k)).collect();
    if present.is_empty() {
        return Ok(None);
    }
    if present.len() != KEYS.len() {
        return Err(WireError::WrongArity {
            field: "indicators",
            expected: KEYS.len(),
            found: present.len(),
        });
    }

    Ok(Some(Indicators {
        radius_polaris: json_number("indicators", present[0])?,
        deg_polaris: json_number("indicators", present[1])?,
        plate_solve_x: json_number("indicators", present[2])?,
        plate_solve_y: json_number("indicators", present[3])?,
    }))
}

/// Log a dropped field and turn the result into an option.
pub(crate) fn keep_or_drop<T>(result: Result<T, WireError>) -> Option<T> {
    result
        .map_err(|e| log::warn!("dropping malformed telemetry field: {e}"))
        .ok()
}

/// Decode the combined `/info` document.
///
/// Only an unparsable document is an error; individual malformed fields are
/// logged and left empty.
pub fn decode_combined(body: &str) -> Result<TelemetryFrame, WireError> {
    let root: Value = serde_json::from_str(body).map_err(|e| WireError::Json(e.to_string()))?;
    if !root.is_object() {
        return Err(WireError::Json("document is not an object".to_string()));
    }

    let status_text = root
        .get("status")
        .and_then(Value::as_str)
        .map(decode_status_text)
        .unwrap_or_default();

    let stars = root
        .get("stars")
        .and_then(|v| keep_or_drop(decode_stars_json(v)))
        .unwrap_or_default();

    let profile = root
        .get("profil")
        .and_then(|v| keep_or_drop(decode_profile_json(v)))
        .flatten();

    let indicators = keep_or_drop(decode_indicators_json(&root)).flatten();

    Ok(TelemetryFrame {
        status_text,
        stars,
        profile,
        indicators,
    })
}
