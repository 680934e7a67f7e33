//! Panel configuration read from the hosting page.
//!
//! The page passes configuration as `data-*` attributes on the mount
//! element. An optional `data-config` JSON object is read first; individual
//! attributes override it. Anything unparsable falls back to its default
//! with a warning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::log_level::LogLevel;
use crate::telemetry_client::Encoding;

pub const DEFAULT_POLL_MS: u32 = 1000;
pub const DEFAULT_RELOAD_DELAY_MS: u32 = 100;
pub const DEFAULT_FETCH_TIMEOUT_MS: u32 = 5000;
pub const DEFAULT_IMAGE_URL: &str = "/image";
pub const FULL_IMAGE_PATH: &str = "/fullimage";

/// When the next poll cycle starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CadencePolicy {
    /// Poll on a fixed timer
    FixedInterval { period_ms: u32 },
    /// Reload the image `reload_delay_ms` after each cycle; its load event
    /// starts the next cycle
    ImageChained { reload_delay_ms: u32 },
}

impl Default for CadencePolicy {
    fn default() -> Self {
        CadencePolicy::FixedInterval {
            period_ms: DEFAULT_POLL_MS,
        }
    }
}

impl CadencePolicy {
    pub fn is_image_chained(&self) -> bool {
        matches!(self, CadencePolicy::ImageChained { .. })
    }

    /// Delay between the end of a cycle and the next image request.
    pub fn reload_delay_ms(&self) -> u32 {
        match self {
            CadencePolicy::ImageChained { reload_delay_ms } => *reload_delay_ms,
            CadencePolicy::FixedInterval { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Device web server; empty for same-origin
    pub base_url: String,
    /// Live image URL, absolute or relative to `base_url`
    pub image_url: String,
    pub encoding: Encoding,
    pub cadence: CadencePolicy,
    /// Longest wait for one telemetry fetch before the cycle fails
    pub fetch_timeout_ms: u32,
    pub log_level: LogLevel,
    /// Current setting values reported by the device
    pub settings: Map<String, Value>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            encoding: Encoding::default(),
            cadence: CadencePolicy::default(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            log_level: LogLevel::default(),
            settings: Map::new(),
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(attr: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        log::warn!("{attr}: cannot parse {raw:?}, using default");
    }
    parsed
}

impl PanelConfig {
    /// Build the configuration from a `data-*` attribute lookup.
    ///
    /// `attr` receives full attribute names such as `data-base-url`.
    pub fn from_attributes<F>(attr: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = attr("data-config")
            .and_then(|raw| {
                serde_json::from_str::<PanelConfig>(&raw)
                    .map_err(|e| log::warn!("data-config: {e}, using defaults"))
                    .ok()
            })
            .unwrap_or_default();

        if let Some(base_url) = attr("data-base-url") {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(image_url) = attr("data-image-url").filter(|u| !u.trim().is_empty()) {
            config.image_url = image_url.trim().to_string();
        }

        if let Some(raw) = attr("data-encoding") {
            match raw.trim() {
                "combined" => config.encoding = Encoding::Combined,
                "split" => config.encoding = Encoding::Split,
                other => log::warn!("data-encoding: unknown encoding {other:?}, using default"),
            }
        }

        let positive = |name: &str| -> Option<u32> {
            attr(name)
                .and_then(|raw| parse_or_warn::<u32>(name, &raw))
                .filter(|ms| {
                    if *ms == 0 {
                        log::warn!("{name}: must be positive, using default");
                    }
                    *ms > 0
                })
        };
        if let Some(ms) = positive("data-fetch-timeout-ms") {
            config.fetch_timeout_ms = ms;
        }
        let poll_ms = positive("data-poll-ms");
        let reload_delay_ms = positive("data-reload-delay-ms");

        let cadence_name = attr("data-cadence");
        config.cadence = match cadence_name.as_deref().map(str::trim) {
            Some("interval") => CadencePolicy::FixedInterval {
                period_ms: poll_ms.unwrap_or(DEFAULT_POLL_MS),
            },
            Some("image-load") => CadencePolicy::ImageChained {
                reload_delay_ms: reload_delay_ms.unwrap_or(DEFAULT_RELOAD_DELAY_MS),
            },
            other => {
                if let Some(other) = other {
                    log::warn!("data-cadence: unknown cadence {other:?}, using default");
                }
                match config.cadence {
                    CadencePolicy::FixedInterval { period_ms } => CadencePolicy::FixedInterval {
                        period_ms: poll_ms.unwrap_or(period_ms),
                    },
                    CadencePolicy::ImageChained { reload_delay_ms: ms } => {
                        CadencePolicy::ImageChained {
                            reload_delay_ms: reload_delay_ms.unwrap_or(ms),
                        }
                    }
                }
            }
        };

        if let Some(level) =
            attr("data-log-level").and_then(|raw| parse_or_warn("data-log-level", &raw))
        {
            config.log_level = level;
        }

        if let Some(raw) = attr("data-settings") {
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(values)) => config.settings = values,
                Ok(_) => log::warn!("data-settings: expected a JSON object"),
                Err(e) => log::warn!("data-settings: {e}"),
            }
        }

        config
    }

    /// Log level requested by the page, read without logging anything.
    ///
    /// Called before the console logger exists so that the warnings of
    /// [`PanelConfig::from_attributes`] reach it. `data-log-level` wins over
    /// the `data-config` blob.
    pub fn log_level_from_attributes<F>(attr: F) -> LogLevel
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = attr("data-log-level").and_then(|raw| raw.parse().ok()) {
            return level;
        }
        attr("data-config")
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|blob| blob.get("log_level")?.as_str()?.parse().ok())
            .unwrap_or_default()
    }

    /// Absolute or origin-relative URL of a device path.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// Cache-busted URL for the next live image request.
    pub fn image_request_url(&self, timestamp_ms: u64) -> String {
        let url = self.resolve(&self.image_url);
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}t={timestamp_ms}")
    }

    /// URL of the full-resolution image.
    pub fn download_url(&self, timestamp_ms: u64) -> String {
        format!("{}?a={timestamp_ms}", self.resolve(FULL_IMAGE_PATH))
    }
}

/// File name for a saved image, `DD_MM_YYYY.png`.
pub fn download_file_name(day: u32, month: u32, year: i32) -> String {
    format!("{day:02}_{month:02}_{year}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(attrs: &[(&str, &str)]) -> PanelConfig {
        let attrs: HashMap<String, String> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PanelConfig::from_attributes(|name| attrs.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_attributes() {
        let config = config_from(&[]);
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.image_url, "/image");
        assert_eq!(
            config.cadence,
            CadencePolicy::FixedInterval { period_ms: 1000 }
        );
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.fetch_timeout_ms, 5000);
    }

    #[test]
    fn test_attributes_are_read() {
        let config = config_from(&[
            ("data-base-url", "http://polar.local:8080/"),
            ("data-encoding", "split"),
            ("data-cadence", "image-load"),
            ("data-reload-delay-ms", "250"),
            ("data-fetch-timeout-ms", "1500"),
            ("data-log-level", "debug"),
            ("data-settings", r#"{"gain": 120}"#),
        ]);

        assert_eq!(config.encoding, Encoding::Split);
        assert_eq!(
            config.cadence,
            CadencePolicy::ImageChained { reload_delay_ms: 250 }
        );
        assert_eq!(config.cadence.reload_delay_ms(), 250);
        assert_eq!(config.fetch_timeout_ms, 1500);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.settings.get("gain"), Some(&Value::from(120)));
        assert_eq!(config.resolve("/info"), "http://polar.local:8080/info");
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[
            ("data-encoding", "xml"),
            ("data-cadence", "interval"),
            ("data-poll-ms", "soon"),
            ("data-log-level", "loud"),
            ("data-settings", "[1, 2]"),
        ]);

        assert_eq!(config.encoding, Encoding::Combined);
        assert_eq!(
            config.cadence,
            CadencePolicy::FixedInterval { period_ms: 1000 }
        );
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.settings.is_empty());
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let config = config_from(&[
            ("data-cadence", "interval"),
            ("data-poll-ms", "0"),
            ("data-fetch-timeout-ms", "0"),
        ]);
        assert_eq!(
            config.cadence,
            CadencePolicy::FixedInterval { period_ms: 1000 }
        );
        assert_eq!(config.fetch_timeout_ms, 5000);
    }

    fn early_level(attrs: &[(&str, &str)]) -> LogLevel {
        let attrs: HashMap<String, String> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PanelConfig::log_level_from_attributes(|name| attrs.get(name).cloned())
    }

    #[test]
    fn test_log_level_read_before_config() {
        assert_eq!(early_level(&[]), LogLevel::Info);
        assert_eq!(early_level(&[("data-log-level", "warning")]), LogLevel::Warn);
        assert_eq!(
            early_level(&[("data-config", r#"{"log_level": "debug"}"#)]),
            LogLevel::Debug
        );
        assert_eq!(
            early_level(&[
                ("data-config", r#"{"log_level": "debug"}"#),
                ("data-log-level", "error"),
            ]),
            LogLevel::Error
        );
        // Unparsable values are left for from_attributes to report.
        assert_eq!(
            early_level(&[("data-log-level", "loud"), ("data-config", "{")]),
            LogLevel::Info
        );
    }

    #[test]
    fn test_json_blob_then_attribute_overrides() {
        let config = config_from(&[
            (
                "data-config",
                r#"{"encoding": "split", "cadence": {"mode": "image_chained", "reload_delay_ms": 50}}"#,
            ),
            ("data-image-url", "http://camera:8081/image"),
        ]);

        assert_eq!(config.encoding, Encoding::Split);
        assert_eq!(
            config.cadence,
            CadencePolicy::ImageChained { reload_delay_ms: 50 }
        );
        assert_eq!(
            config.image_request_url(42),
            "http://camera:8081/image?t=42"
        );
    }

    #[test]
    fn test_image_and_download_urls() {
        let config = PanelConfig {
            image_url: "/image?stream=main".into(),
            ..Default::default()
        };
        assert_eq!(config.image_request_url(7), "/image?stream=main&t=7");
        assert_eq!(config.download_url(1234), "/fullimage?a=1234");
        assert_eq!(download_file_name(3, 9, 2026), "03_09_2026.png");
    }
}
