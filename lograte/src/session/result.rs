//! Values produced by sampling sessions.

use serde::Serialize;

use crate::platform::DeviceClassification;

/// Ordered, append-only rate observations from one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SampleSet(Vec<f64>);

impl SampleSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, rate: f64) {
        self.0.push(rate);
    }

    /// Number of samples collected.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no samples were collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Samples in collection order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterate over samples in collection order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.iter().sum::<f64>() / self.0.len() as f64)
    }

    /// Largest sample.
    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    /// Smallest sample.
    pub fn min(&self) -> Option<f64> {
        self.iter().reduce(f64::min)
    }
}

impl From<Vec<f64>> for SampleSet {
    fn from(samples: Vec<f64>) -> Self {
        Self(samples)
    }
}

/// Terminal result of a successful sampling session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    /// What the device turned out to be.
    pub classification: DeviceClassification,

    /// Exactly the requested number of samples.
    pub samples: SampleSet,
}

/// Progress event passed to the observer after each sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleProgress {
    /// 1-based position of this sample.
    pub index: usize,

    /// Requested sample count.
    pub total: usize,

    /// The parsed rate.
    pub rate: f64,

    /// Classification the sample was taken under.
    pub classification: DeviceClassification,
}

impl SampleProgress {
    /// Whether this is the last sample of the session.
    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}
