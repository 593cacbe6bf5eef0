//! Host list parsing.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

static HOST_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:localhost|(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?))$",
    )
    .expect("host entry pattern is valid")
});

/// Parse a comma-separated list of IPv4 addresses.
///
/// Whitespace anywhere in the input is ignored and repeated entries keep
/// their first position. `localhost` is accepted as an address.
///
/// ```
/// let hosts = lograte::hosts::parse_host_list("10.0.0.1, 10.0.0.2,10.0.0.1").unwrap();
/// assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2"]);
/// ```
pub fn parse_host_list(text: &str) -> Result<Vec<String>, ConfigError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(Vec::new());
    }

    let mut hosts = IndexSet::new();
    for entry in compact.split(',') {
        if !HOST_ENTRY.is_match(entry) {
            return Err(ConfigError::InvalidHostList {
                entry: entry.to_string(),
            });
        }
        hosts.insert(entry.to_string());
    }
    Ok(hosts.into_iter().collect())
}
