//! Channel layer: decoded shell text and the patterns run over it.

mod buffer;
mod patterns;

pub use buffer::PatternBuffer;
pub use patterns::{RateMatch, extract_addresses, find_rate};
