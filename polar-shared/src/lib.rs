//! WASM-compatible core of the polar alignment monitor.
//!
//! Holds everything that does not need a browser: the telemetry model and
//! its wire decoding, the HTTP client, alignment geometry, overlay and chart
//! feeding, pan/zoom, the polling session, the settings table and the page
//! configuration. The Yew frontend supplies the DOM-backed surface and chart.

pub mod chart;
pub mod config;
pub mod error;
pub mod geometry;
pub mod http_client;
pub mod log_level;
pub mod overlay;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod telemetry_client;
pub mod viewport;
pub mod wire;

pub use chart::{ChartAdapter, ChartState, ChartWidget};
pub use config::{CadencePolicy, PanelConfig};
pub use error::PanelErrorKind;
pub use geometry::{AlignmentGeometry, Point, Segment};
pub use http_client::{HttpClient, HttpClientError, TextTransport};
pub use log_level::LogLevel;
pub use overlay::{DrawList, DrawOp, OverlayRenderer, RenderError, RenderOutcome, Stroke, Surface};
pub use session::{CycleOutcome, CycleTicket, PollingSession, ReloadToken};
pub use settings::{SettingEntry, SettingKind, SettingsError, SettingsTable};
pub use telemetry::{ImageDimensions, Indicators, ProfileCurve, RenderMode, Star, TelemetryFrame};
pub use telemetry_client::{Encoding, TelemetryClient, TelemetryError};
pub use viewport::{ViewportController, ViewportTransform};
pub use wire::WireError;
