//! Stateless pattern helpers over decoded shell text.
//!
//! Every helper takes the text it should scan and keeps nothing between
//! calls, so scanning the same text twice always gives the same answer.

use indexmap::IndexSet;
use regex::Regex;

/// A rate value pulled out of shell output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateMatch {
    /// The parsed rate.
    pub value: f64,

    /// Byte offset just past the match.
    pub end: usize,
}

/// Find the first rate captured by `pattern` (group 1) in `text`.
///
/// A number that runs into the end of the text may still be arriving, so it
/// is only reported once text follows it. A lone trailing `.` may still turn
/// into a fraction and also waits.
pub fn find_rate(pattern: &Regex, text: &str) -> Option<RateMatch> {
    let caps = pattern.captures(text)?;
    let whole = caps.get(0)?;
    if !is_settled(&text[whole.end()..]) {
        return None;
    }
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    Some(RateMatch {
        value,
        end: whole.end(),
    })
}

/// Every match of `pattern` in `text`, de-duplicated, in first-seen order.
pub fn extract_addresses(pattern: &Regex, text: &str) -> IndexSet<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_settled(rest: &str) -> bool {
    let mut chars = rest.chars();
    // greedy groups mean a digit never directly follows a match
    match chars.next() {
        None => false,
        // "12." could become "12.5"
        Some('.') => chars.next().is_some(),
        Some(_) => true,
    }
}
