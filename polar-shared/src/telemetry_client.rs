//! Telemetry client for the alignment camera's HTTP API.
//!
//! Works in both native Rust and WASM environments. One call to
//! [`TelemetryClient::fetch_frame`] is one poll cycle's worth of network
//! traffic; the client never touches display state.

use std::future::Future;

use futures_util::future::{self, Either};
use serde::{Deserialize, Serialize};

use crate::error::PanelErrorKind;
use crate::http_client::{HttpClient, HttpClientError, TextTransport};
use crate::settings::{SettingEntry, SettingsError};
use crate::telemetry::TelemetryFrame;
use crate::wire::{self, keep_or_drop, WireError};

/// How the device encodes its telemetry.
///
/// The two layouts come from different device builds. Pick the one the
/// deployed device serves; the other answers 404 on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One JSON document at `/info`, served by the builds that host the
    /// web panel next to a JSON telemetry endpoint
    #[default]
    Combined,
    /// Plain-text `/status`, `/stars`, `/profil` and `/indicators`, the only
    /// layout the firmware's embedded web server provides (it has no `/info`)
    Split,
}

/// Error type for a telemetry fetch cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryError {
    /// The device could not be reached
    #[error("{0}")]
    Transport(#[from] HttpClientError),
    /// The response could not be decoded at all
    #[error("{0}")]
    Malformed(#[from] WireError),
}

impl TelemetryError {
    pub fn kind(&self) -> PanelErrorKind {
        match self {
            TelemetryError::Transport(_) => PanelErrorKind::TransportFailure,
            TelemetryError::Malformed(_) => PanelErrorKind::MalformedResponse,
        }
    }

    /// Human-readable status line for the panel.
    pub fn status_line(&self) -> String {
        match self {
            TelemetryError::Transport(e) => format!("Connection to server failed: {e}"),
            TelemetryError::Malformed(e) => format!("Unreadable response from server: {e}"),
        }
    }
}

/// Client for the device's telemetry and settings endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryClient<T = HttpClient> {
    transport: T,
    encoding: Encoding,
}

impl TelemetryClient<HttpClient> {
    /// Create a new client pointing to the given base URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The device web server (e.g., "http://polar.local:8080"),
    ///   or "" for same-origin requests from the browser
    /// * `encoding` - Which endpoint layout the device serves
    pub fn new(base_url: &str, encoding: Encoding) -> Self {
        Self::with_transport(HttpClient::new(base_url), encoding)
    }

    /// Get the base URL this client is configured for.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

impl<T: TextTransport> TelemetryClient<T> {
    pub fn with_transport(transport: T, encoding: Encoding) -> Self {
        Self {
            transport,
            encoding,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Fetch one complete telemetry frame.
    pub async fn fetch_frame(&self) -> Result<TelemetryFrame, TelemetryError> {
        match self.encoding {
            Encoding::Combined => self.fetch_combined().await,
            Encoding::Split => self.fetch_split().await,
        }
    }

    /// Fetch one frame, giving up once `deadline` completes.
    ///
    /// A request the device never answers would otherwise hold the cycle
    /// open forever. Expiry is reported as a transport timeout.
    pub async fn fetch_frame_until<D>(
        &self,
        deadline: D,
    ) -> Result<TelemetryFrame, TelemetryError>
    where
        D: Future<Output = ()>,
    {
        let fetch = std::pin::pin!(self.fetch_frame());
        let deadline = std::pin::pin!(deadline);

        match future::select(fetch, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                log::warn!("telemetry fetch timed out");
                Err(TelemetryError::Transport(HttpClientError::Timeout))
            }
        }
    }

    async fn fetch_combined(&self) -> Result<TelemetryFrame, TelemetryError> {
        let body = self.transport.get_text("/info").await?;
        Ok(wire::decode_combined(&body)?)
    }

    /// Issue the four text requests concurrently and assemble the frame.
    ///
    /// Each endpoint may fail on its own and only leaves its field empty;
    /// the cycle fails only if the device answered none of them.
    async fn fetch_split(&self) -> Result<TelemetryFrame, TelemetryError> {
        let (status, stars, profile, indicators) = futures_util::join!(
            self.transport.get_text("/status"),
            self.transport.get_text("/stars"),
            self.transport.get_text("/profil"),
            self.transport.get_text("/indicators"),
        );

        if let (Err(e), Err(_), Err(_), Err(_)) = (&status, &stars, &profile, &indicators) {
            return Err(TelemetryError::Transport(e.clone()));
        }

        let status_text = match status {
            Ok(body) => wire::decode_status_text(&body),
            Err(e) => {
                log::warn!("status unavailable: {e}");
                String::new()
            }
        };

        Ok(TelemetryFrame {
            status_text,
            stars: fetched("stars", stars)
                .and_then(|body| keep_or_drop(wire::decode_stars_text(&body)))
                .unwrap_or_default(),
            profile: fetched("profil", profile)
                .and_then(|body| keep_or_drop(wire::decode_profile_text(&body)))
                .flatten(),
            indicators: fetched("indicators", indicators)
                .and_then(|body| keep_or_drop(wire::decode_indicators_text(&body))),
        })
    }

    // === Settings collaborator ===

    /// Push a new value for a setting to the device.
    ///
    /// The value is validated against the entry first; the device answers
    /// `true` on success and an error message otherwise.
    pub async fn apply_setting(
        &self,
        entry: &SettingEntry,
        value: &str,
    ) -> Result<String, SettingsError> {
        let normalized = entry.validate(value)?;
        let body = self
            .transport
            .get_text(&entry.apply_path(&normalized)?)
            .await?;

        if body.trim() == "true" {
            Ok(normalized)
        } else {
            Err(SettingsError::Rejected(body.trim().to_string()))
        }
    }

    /// Trigger a one-shot device action and return its message.
    pub async fn call_action(&self, entry: &SettingEntry) -> Result<String, SettingsError> {
        let body = self.transport.get_text(&entry.call_path()?).await?;
        Ok(body.trim_end().to_string())
    }
}

fn fetched(field: &str, result: Result<String, HttpClientError>) -> Option<String> {
    result
        .map_err(|e| log::warn!("{field} unavailable: {e}"))
        .ok()
}
