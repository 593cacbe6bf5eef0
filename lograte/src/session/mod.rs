//! Per-host session protocols.
//!
//! Each protocol is a sans-IO state machine fed with raw shell output plus
//! an async driver that owns the machine, the shell reads and any timers
//! for exactly one session. Nothing is shared between sessions.

pub mod enumerator;
mod result;
pub mod sampler;
mod ticker;

#[cfg(test)]
pub(crate) mod testing;

pub use enumerator::{ListingMachine, ListingState, ListingStep, run_listing};
pub use result::{SampleProgress, SampleReport, SampleSet};
pub use sampler::{
    DEFAULT_SAMPLE_INTERVAL, SamplingMachine, SamplingOptions, SamplingState, SamplingStep,
    run_sampling,
};
pub use ticker::SampleTicker;

use std::time::Duration;

use tokio::time::Instant;

/// Deadline for the next response, if responses are timed at all.
pub(crate) fn arm_deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|t| Instant::now() + t)
}

/// Resolves at `deadline`; never resolves without one.
pub(crate) async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
