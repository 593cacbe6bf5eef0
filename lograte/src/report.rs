//! Survey statistics, storage estimates and CSV export.

use std::fmt;
use std::io;

use serde::Serialize;

use crate::session::SampleReport;

const SECONDS_PER_DAY: f64 = 86_400.0;
const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Parameters for turning an ingestion rate into a storage figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageEstimate {
    /// Days of logs kept.
    pub retention_days: u32,
    /// Average size of one log entry on disk.
    pub log_size_bytes: u32,
}

impl StorageEstimate {
    /// Gigabytes needed to retain logs arriving at `rate` per second.
    pub fn gigabytes(&self, rate: f64) -> f64 {
        rate * SECONDS_PER_DAY * f64::from(self.retention_days) * f64::from(self.log_size_bytes)
            / BYTES_PER_GB
    }
}

impl Default for StorageEstimate {
    fn default() -> Self {
        Self {
            retention_days: 30,
            log_size_bytes: 500,
        }
    }
}

/// One row of a survey report.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSummary {
    pub host: String,
    /// `"firewall"`, `"panorama"`, or `"mixed"` on a totals row.
    pub device: &'static str,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub storage_gb: f64,
}

impl HostSummary {
    /// Summarise one host's samples. `None` if there are none.
    pub fn new(
        host: impl Into<String>,
        report: &SampleReport,
        estimate: StorageEstimate,
    ) -> Option<Self> {
        let samples = &report.samples;
        let average = samples.average()?;
        Some(Self {
            host: host.into(),
            device: report.classification.label(),
            average,
            max: samples.max()?,
            min: samples.min()?,
            storage_gb: estimate.gigabytes(average),
        })
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "IP Address")]
    host: &'a str,
    #[serde(rename = "Device Type")]
    device: &'a str,
    #[serde(rename = "Avg LPS")]
    average: String,
    #[serde(rename = "Max LPS")]
    max: String,
    #[serde(rename = "Min LPS")]
    min: String,
    #[serde(rename = "Est. Storage")]
    storage: String,
}

impl<'a> From<&'a HostSummary> for CsvRow<'a> {
    fn from(row: &'a HostSummary) -> Self {
        Self {
            host: &row.host,
            device: row.device,
            average: format!("{:.2}", row.average),
            max: row.max.to_string(),
            min: row.min.to_string(),
            storage: format!("{:.2}", row.storage_gb),
        }
    }
}

/// Per-host summaries of a finished survey, in host order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    estimate: StorageEstimate,
    rows: Vec<HostSummary>,
}

impl Report {
    pub fn new(estimate: StorageEstimate) -> Self {
        Self {
            estimate,
            rows: Vec::new(),
        }
    }

    /// Add a host's samples. Reports without samples are skipped.
    pub fn push(&mut self, host: &str, report: &SampleReport) {
        if let Some(row) = HostSummary::new(host, report, self.estimate) {
            self.rows.push(row);
        }
    }

    pub fn rows(&self) -> &[HostSummary] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column sums, only when more than one host was reported.
    pub fn total(&self) -> Option<HostSummary> {
        if self.rows.len() < 2 {
            return None;
        }

        let first = self.rows[0].device;
        let device = if self.rows.iter().all(|r| r.device == first) {
            first
        } else {
            "mixed"
        };

        Some(HostSummary {
            host: "Total".to_string(),
            device,
            average: self.rows.iter().map(|r| r.average).sum(),
            max: self.rows.iter().map(|r| r.max).sum(),
            min: self.rows.iter().map(|r| r.min).sum(),
            storage_gb: self.rows.iter().map(|r| r.storage_gb).sum(),
        })
    }

    /// Write the report, totals row included, as fully quoted CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        for row in &self.rows {
            writer.serialize(CsvRow::from(row))?;
        }
        if let Some(total) = self.total() {
            writer.serialize(CsvRow::from(&total))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:<9} {:>12} {:>12} {:>12} {:>14}",
            "IP Address", "Device", "Avg LPS", "Max LPS", "Min LPS", "Est. Storage"
        )?;
        let total = self.total();
        for row in self.rows.iter().chain(total.iter()) {
            writeln!(
                f,
                "{:<16} {:<9} {:>12.2} {:>12} {:>12} {:>11.2} GB",
                row.host, row.device, row.average, row.max, row.min, row.storage_gb
            )?;
        }
        Ok(())
    }
}
