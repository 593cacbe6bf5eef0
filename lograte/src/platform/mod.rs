//! Platform definitions and device classification.

mod definition;
pub mod vendors;

pub use definition::{PlatformDefinition, RateProbe};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device category detected once per sampling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClassification {
    /// Rejected the probe; sampled with the firewall command.
    Firewall,
    /// Answered the probe with a rate; a log-collector manager.
    LogCollector,
}

impl DeviceClassification {
    /// Label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClassification::Firewall => "firewall",
            DeviceClassification::LogCollector => "panorama",
        }
    }
}

impl fmt::Display for DeviceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
