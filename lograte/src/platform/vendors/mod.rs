//! Built-in platform definitions.

pub mod panos;
