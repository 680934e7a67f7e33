//! Error classification shared by the panel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three failure classes the panel distinguishes.
///
/// Every crate error maps onto one of these; none of them stops the polling
/// loop or pointer handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelErrorKind {
    /// Network error or non-success response; status shows the reason
    TransportFailure,
    /// Unparsable body or field; the field is treated as absent
    MalformedResponse,
    /// Image dimensions unknown; rendering is skipped this cycle
    NotReady,
}

impl PanelErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            PanelErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            PanelErrorKind::NotReady => "NOT_READY",
        }
    }
}

impl fmt::Display for PanelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
