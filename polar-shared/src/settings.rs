//! Device settings table.
//!
//! Maps each setting key to its group, label, kind and current value. The
//! panel renders its form from this table and applies changes through
//! [`SettingEntry::apply_path`] / [`SettingEntry::call_path`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::PanelErrorKind;
use crate::geometry::arcsec_radius_to_pixels;
use crate::http_client::HttpClientError;

/// Error applying or validating a setting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
    /// Input refused before sending; message matches the device's wording
    #[error("{0}")]
    Invalid(String),
    /// The device answered with an error message
    #[error("{0}")]
    Rejected(String),
    #[error("Connection to server failed: {0}")]
    Transport(#[from] HttpClientError),
}

impl SettingsError {
    pub fn kind(&self) -> PanelErrorKind {
        match self {
            SettingsError::Transport(_) => PanelErrorKind::TransportFailure,
            _ => PanelErrorKind::MalformedResponse,
        }
    }
}

/// What kind of input a setting takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingKind {
    /// Numeric value, clamped to `[min, max]`. With a step, the offset from
    /// `min` must be a whole multiple of it.
    Number {
        min: f64,
        max: f64,
        step: Option<u32>,
    },
    /// One of several named options, stored as the option index
    Mode { options: Vec<String> },
    /// On/off, stored as `1`/`0`
    Toggle,
    /// One-shot action run on the device
    Action,
    /// Save the full-resolution image from the browser
    Download,
}

/// One row of the settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub group: String,
    pub label: String,
    pub kind: SettingKind,
    /// Current value in the device's string form; empty for actions
    pub value: String,
}

impl SettingEntry {
    fn new(key: &str, group: &str, label: &str, kind: SettingKind, value: &str) -> Self {
        Self {
            key: key.to_string(),
            group: group.to_string(),
            label: label.to_string(),
            kind,
            value: value.to_string(),
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, SettingKind::Action | SettingKind::Download)
    }

    /// Check a raw input value and return it in the form the device stores.
    pub fn validate(&self, raw: &str) -> Result<String, SettingsError> {
        let raw = raw.trim();
        match &self.kind {
            SettingKind::Number { min, max, step } => {
                let value: f64 = raw
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| SettingsError::Invalid("Not a number".into()))?;
                if let Some(step) = step.filter(|s| *s != 0) {
                    if ((value - min) as i64) % i64::from(step) != 0 {
                        return Err(SettingsError::Invalid(
                            "Not a valid multiple of number".into(),
                        ));
                    }
                }
                Ok(value.clamp(*min, *max).to_string())
            }
            SettingKind::Mode { options } => raw
                .parse::<usize>()
                .ok()
                .filter(|index| *index < options.len())
                .map(|index| index.to_string())
                .ok_or_else(|| SettingsError::Invalid("Invalid option".into())),
            SettingKind::Toggle => {
                let on = match raw {
                    "true" | "on" => true,
                    "false" | "off" => false,
                    other => other
                        .parse::<i64>()
                        .map(|v| v != 0)
                        .map_err(|_| SettingsError::Invalid("Not a number".into()))?,
                };
                Ok(if on { "1" } else { "0" }.to_string())
            }
            SettingKind::Action | SettingKind::Download => Err(SettingsError::Invalid(format!(
                "{} takes no value",
                self.label
            ))),
        }
    }

    /// Endpoint that stores `value` for this setting.
    pub fn apply_path(&self, value: &str) -> Result<String, SettingsError> {
        if self.is_action() {
            return Err(SettingsError::Invalid(format!(
                "{} takes no value",
                self.label
            )));
        }
        Ok(format!("/set/{}/{}", self.key, value))
    }

    /// Endpoint that runs this action on the device.
    pub fn call_path(&self) -> Result<String, SettingsError> {
        match self.kind {
            SettingKind::Action => Ok(format!("/call/{}", self.key)),
            _ => Err(SettingsError::Invalid(format!(
                "{} is not a device action",
                self.label
            ))),
        }
    }

    /// Current numeric value, for number settings.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            SettingKind::Number { .. } => self.value.parse().ok(),
            _ => None,
        }
    }
}

/// Ordered mapping from setting key to entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsTable {
    entries: Vec<SettingEntry>,
}

impl SettingsTable {
    pub fn new(entries: Vec<SettingEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&SettingEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[SettingEntry] {
        &self.entries
    }

    /// Group names in first-appearance order.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !groups.contains(&entry.group.as_str()) {
                groups.push(&entry.group);
            }
        }
        groups
    }

    pub fn in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a SettingEntry> + 'a {
        self.entries.iter().filter(move |e| e.group == group)
    }

    /// Record a value the device accepted.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        entry.value = value.to_string();
        Ok(())
    }

    /// Overlay current values reported by the page.
    ///
    /// Unknown keys and invalid values are skipped with a warning. Returns
    /// the number of values applied.
    pub fn apply_overrides(&mut self, values: &Map<String, Value>) -> usize {
        let mut applied = 0;
        for (key, value) in values {
            let raw = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
                other => {
                    log::warn!("setting {key}: unsupported value {other}");
                    continue;
                }
            };

            let Some(entry) = self.get(key) else {
                log::warn!("ignoring unknown setting {key}");
                continue;
            };
            match entry.validate(&raw) {
                Ok(normalized) => {
                    if self.set_value(key, &normalized).is_ok() {
                        applied += 1;
                    }
                }
                Err(e) => log::warn!("setting {key}: {e}"),
            }
        }
        applied
    }

    /// Pole orbit radius in pixels from the calibration settings.
    pub fn orbit_radius_px(&self) -> Option<f64> {
        let radius = self.get("radius_polaris")?.as_number()?;
        let scale = self.get("deg_per_px")?.as_number()?;
        arcsec_radius_to_pixels(radius, scale)
    }
}

impl Default for SettingsTable {
    /// The settings the alignment camera ships with.
    fn default() -> Self {
        const DISCOVER: &str = "Discover Stars";
        const SEEING: &str = "Seeing";
        const CALIBRATE: &str = "Calibrate Telescope";
        const OTHER: &str = "Other";

        let number = |min: f64, max: f64, step: Option<u32>| SettingKind::Number { min, max, step };
        let mode = |options: &[&str]| SettingKind::Mode {
            options: options.iter().map(|o| o.to_string()).collect(),
        };

        Self::new(vec![
            SettingEntry::new(
                "capture_mode",
                DISCOVER,
                "Capture mode",
                mode(&["Search stars", "Calculate seeing"]),
                "0",
            ),
            SettingEntry::new(
                "star_size",
                DISCOVER,
                "Minimum star area (px)",
                number(1.0, 1000.0, Some(1)),
                "50",
            ),
            SettingEntry::new(
                "exposure",
                DISCOVER,
                "Exposure (ms)",
                number(0.0, 10000.0, Some(1)),
                "10",
            ),
            SettingEntry::new("gain", DISCOVER, "Gain", number(0.0, 480.0, Some(1)), "300"),
            SettingEntry::new(
                "min_threshold",
                DISCOVER,
                "Minimum Threshold",
                number(1.0, 255.0, Some(1)),
                "100",
            ),
            SettingEntry::new(
                "v_threshold",
                DISCOVER,
                "Visualize Threshold",
                SettingKind::Toggle,
                "0",
            ),
            SettingEntry::new(
                "measure_mode",
                SEEING,
                "Seeing-calculation type",
                mode(&["Average", "Correlation", "FWHM"]),
                "0",
            ),
            SettingEntry::new(
                "roi",
                SEEING,
                "Region of interest (px)",
                number(32.0, 512.0, Some(32)),
                "128",
            ),
            SettingEntry::new("pause", SEEING, "Pause (s)", number(0.0, 3600.0, Some(1)), "5"),
            SettingEntry::new(
                "measurements",
                SEEING,
                "Measurements per Seeing",
                number(3.0, 10000.0, Some(1)),
                "10",
            ),
            SettingEntry::new(
                "btn_solving",
                CALIBRATE,
                "Plate solving",
                SettingKind::Action,
                "",
            ),
            SettingEntry::new(
                "longitude",
                CALIBRATE,
                "Longitude",
                number(-180.0, 180.0, None),
                "16.57736",
            ),
            SettingEntry::new(
                "latitude",
                CALIBRATE,
                "Latitude",
                number(-90.0, 90.0, None),
                "48.31286",
            ),
            SettingEntry::new(
                "deg_per_px",
                CALIBRATE,
                "Arcsec per Pixel",
                number(0.0, 20.0, None),
                "5.76",
            ),
            SettingEntry::new(
                "radius_polaris",
                CALIBRATE,
                "Radius of Polaris orbit (Arcsec)",
                number(0.0, 10000.0, None),
                "2400",
            ),
            SettingEntry::new(
                "btn_shutdown",
                OTHER,
                "Restart Computer",
                SettingKind::Action,
                "",
            ),
            SettingEntry::new(
                "btn_download_image",
                OTHER,
                "Save current image",
                SettingKind::Download,
                "",
            ),
            SettingEntry::new(
                "btn_download_log",
                OTHER,
                "Save log files",
                SettingKind::Action,
                "",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_default_table_groups_in_order() {
        let table = SettingsTable::default();
        assert_eq!(
            table.groups(),
            vec!["Discover Stars", "Seeing", "Calibrate Telescope", "Other"]
        );
        assert_eq!(table.in_group("Seeing").count(), 4);
    }

    #[test]
    fn test_number_is_clamped() {
        let table = SettingsTable::default();
        let gain = table.get("gain").unwrap();
        assert_eq!(gain.validate("250").unwrap(), "250");
        assert_eq!(gain.validate("9999").unwrap(), "480");
        assert_eq!(gain.validate(" -4 ").unwrap(), "0");
        assert!(gain.validate("lots").is_err());
    }

    #[test]
    fn test_number_step_is_relative_to_min() {
        let table = SettingsTable::default();
        let roi = table.get("roi").unwrap();
        assert_eq!(roi.validate("96").unwrap(), "96");
        assert_eq!(
            roi.validate("100"),
            Err(SettingsError::Invalid("Not a valid multiple of number".into()))
        );
    }

    #[test]
    fn test_number_without_step_keeps_fraction() {
        let table = SettingsTable::default();
        let lon = table.get("longitude").unwrap();
        assert_eq!(lon.validate("16.5").unwrap(), "16.5");
        assert_eq!(lon.validate("200").unwrap(), "180");
    }

    #[test]
    fn test_mode_and_toggle() {
        let table = SettingsTable::default();
        let mode = table.get("measure_mode").unwrap();
        assert_eq!(mode.validate("2").unwrap(), "2");
        assert_eq!(
            mode.validate("3"),
            Err(SettingsError::Invalid("Invalid option".into()))
        );

        let toggle = table.get("v_threshold").unwrap();
        assert_eq!(toggle.validate("true").unwrap(), "1");
        assert_eq!(toggle.validate("0").unwrap(), "0");
        assert_eq!(toggle.validate("5").unwrap(), "1");
    }

    #[test]
    fn test_paths() {
        let table = SettingsTable::default();
        assert_eq!(
            table.get("gain").unwrap().apply_path("250").unwrap(),
            "/set/gain/250"
        );
        assert_eq!(
            table.get("btn_shutdown").unwrap().call_path().unwrap(),
            "/call/btn_shutdown"
        );
        assert!(table.get("btn_shutdown").unwrap().apply_path("1").is_err());
        assert!(table.get("gain").unwrap().call_path().is_err());
        // Downloads happen in the browser, not on the device.
        assert!(table.get("btn_download_image").unwrap().call_path().is_err());
    }

    #[test]
    fn test_apply_overrides_skips_bad_values() {
        let mut table = SettingsTable::default();
        let values = json!({
            "gain": 120,
            "v_threshold": true,
            "roi": "100",
            "no_such_key": 1,
        });
        let applied = table.apply_overrides(values.as_object().unwrap());

        assert_eq!(applied, 2);
        assert_eq!(table.get("gain").unwrap().value, "120");
        assert_eq!(table.get("v_threshold").unwrap().value, "1");
        assert_eq!(table.get("roi").unwrap().value, "128");
    }

    #[test]
    fn test_set_value_unknown_key() {
        let mut table = SettingsTable::default();
        assert_eq!(
            table.set_value("nope", "1"),
            Err(SettingsError::UnknownKey("nope".into()))
        );
    }

    #[test]
    fn test_orbit_radius_px() {
        let table = SettingsTable::default();
        assert_relative_eq!(table.orbit_radius_px().unwrap(), 2400.0 / 5.76, epsilon = 1e-9);
    }
}
