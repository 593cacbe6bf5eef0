//! PAN-OS platform definition.
//!
//! Covers firewalls and Panorama log-collector managers, which share the
//! same operational shell:
//!
//! ```text
//! admin@PA-3220> set cli pager off
//! admin@PA-3220> debug log-receiver statistics
//! ...
//! Log incoming rate:                       1520
//! ...
//! admin@Panorama> debug log-collector log-collection-stats show incoming-logs
//! Incoming log rate = 2231.40
//! ```
//!
//! A firewall answers the log-collector command with `Invalid syntax.`,
//! which is how the two are told apart.

use crate::platform::{PlatformDefinition, RateProbe};

/// Disables paging so long outputs are not held behind `--more--`.
pub const PAGER_COMMAND: &str = "set cli pager off";

/// Firewall log receiver counters.
pub const FIREWALL_COMMAND: &str = "debug log-receiver statistics";

/// Log collector incoming log counters; also used as the probe.
pub const LOG_COLLECTOR_COMMAND: &str =
    "debug log-collector log-collection-stats show incoming-logs";

/// Lists the firewalls a Panorama manages.
pub const LIST_COMMAND: &str = "show devices connected";

const PROMPT: &str = r"> $";
const INVALID_SYNTAX: &str = r"Invalid syntax\.";
const FIREWALL_RATE: &str = r"Log incoming rate:\s*([0-9]+)";
const LOG_COLLECTOR_RATE: &str = r"Incoming log rate\s*=\s*([0-9]+(?:\.[0-9]+)?)";
const LIST_HEADER: &str = r"Connected";
const ADDRESS: &str = r"\blocalhost\b|\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b";

/// Create the PAN-OS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition {
        name: "panos".to_string(),
        prompt_pattern: regex::Regex::new(PROMPT).unwrap(),
        invalid_syntax_pattern: regex::Regex::new(INVALID_SYNTAX).unwrap(),
        pager_command: PAGER_COMMAND.to_string(),
        firewall: RateProbe::new(FIREWALL_COMMAND, FIREWALL_RATE).unwrap(),
        log_collector: RateProbe::new(LOG_COLLECTOR_COMMAND, LOG_COLLECTOR_RATE).unwrap(),
        list_command: LIST_COMMAND.to_string(),
        list_header_pattern: regex::Regex::new(LIST_HEADER).unwrap(),
        address_pattern: regex::Regex::new(ADDRESS).unwrap(),
    }
}
