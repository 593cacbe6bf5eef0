//! Platform definition: every command and pattern a session needs.

use regex::Regex;

use super::DeviceClassification;
use crate::error::ConfigError;

/// Command and pattern used to sample one device classification.
#[derive(Debug, Clone)]
pub struct RateProbe {
    /// Diagnostic command printing the current incoming log rate.
    pub command: String,

    /// Pattern whose first capture group is the rate.
    pub rate_pattern: Regex,
}

impl RateProbe {
    /// Create a rate probe from a command and a pattern string.
    pub fn new(command: impl Into<String>, rate_pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            command: command.into(),
            rate_pattern: Regex::new(rate_pattern)?,
        })
    }
}

/// All vendor-specific text for one appliance family.
///
/// The log-collector command doubles as the device-type probe: firewalls
/// reject it with the invalid-syntax message, collectors answer with a rate.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g. "panos").
    pub name: String,

    /// Matches the shell prompt at the end of the output.
    pub prompt_pattern: Regex,

    /// Matches the shell's rejection of an unknown command.
    pub invalid_syntax_pattern: Regex,

    /// Command that turns off output paging.
    pub pager_command: String,

    /// How to sample a firewall.
    pub firewall: RateProbe,

    /// How to sample a log collector; also the probe command.
    pub log_collector: RateProbe,

    /// Command listing devices connected to a manager.
    pub list_command: String,

    /// Header printed by the list command.
    pub list_header_pattern: Regex,

    /// Matches one device address in the list output.
    pub address_pattern: Regex,
}

impl PlatformDefinition {
    /// The probe sent to tell firewalls and log collectors apart.
    pub fn probe(&self) -> &RateProbe {
        &self.log_collector
    }

    /// The command/pattern pair for a classification.
    pub fn rate_probe(&self, classification: DeviceClassification) -> &RateProbe {
        match classification {
            DeviceClassification::Firewall => &self.firewall,
            DeviceClassification::LogCollector => &self.log_collector,
        }
    }

    /// Replace the prompt pattern.
    pub fn with_prompt(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.prompt_pattern = Regex::new(pattern)?;
        Ok(self)
    }

    /// Replace the pager command.
    pub fn with_pager_command(mut self, command: impl Into<String>) -> Self {
        self.pager_command = command.into();
        self
    }

    /// Replace the firewall command/pattern pair.
    pub fn with_firewall(mut self, probe: RateProbe) -> Self {
        self.firewall = probe;
        self
    }

    /// Replace the log-collector command/pattern pair.
    pub fn with_log_collector(mut self, probe: RateProbe) -> Self {
        self.log_collector = probe;
        self
    }

    /// Replace the device list command.
    pub fn with_list_command(mut self, command: impl Into<String>) -> Self {
        self.list_command = command.into();
        self
    }
}

impl Default for PlatformDefinition {
    fn default() -> Self {
        super::vendors::panos::platform()
    }
}
