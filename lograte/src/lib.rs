//! # lograte
//!
//! Async SSH scraper that measures the log ingestion rate of firewalls and
//! log-collector managers.
//!
//! A session logs in over SSH with a password, turns the CLI pager off,
//! works out whether the appliance is a firewall or a log collector and
//! then samples its incoming log rate a fixed number of times, one
//! sample per timer tick. A second session type lists the devices
//! connected to a log-collector manager.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Device detection from the probe command's response
//! - Timer-paced sampling with per-sample progress callbacks
//! - Connected-device discovery on log-collector managers
//! - Concurrent multi-host surveys with storage estimates and CSV export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), lograte::Error> {
//!     let report = lograte::sample("192.168.1.1", "admin", "secret", 3, 10, |p| {
//!         println!("sample {}/{}: {} logs/s", p.index, p.total, p.rate);
//!     })
//!     .await?;
//!
//!     println!("{} averaging {:?} logs/s", report.classification, report.samples.average());
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod hosts;
pub mod platform;
pub mod report;
pub mod scraper;
pub mod session;
pub mod survey;
pub mod transport;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use platform::{DeviceClassification, PlatformDefinition};
pub use report::{Report, StorageEstimate};
pub use scraper::{Scraper, ScraperBuilder, list_connected_devices, sample};
pub use session::{SampleProgress, SampleReport, SampleSet};
pub use transport::{HostKeyVerification, SshConfig};
