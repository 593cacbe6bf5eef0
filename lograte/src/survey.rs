//! Multi-host surveys.
//!
//! A survey runs one independent session per host, all at once, and
//! waits for every one of them. A failing host never cuts another short.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use indexmap::IndexSet;
use log::{info, warn};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::report::{Report, StorageEstimate};
use crate::scraper::{Scraper, ScraperBuilder};
use crate::session::{SampleProgress, SampleReport};

/// Survey-wide progress, reported after every sample from any host.
#[derive(Debug, Clone, Copy)]
pub struct SurveyProgress<'a> {
    /// Host that produced the sample.
    pub host: &'a str,
    /// Samples collected so far across all hosts.
    pub completed: usize,
    /// Samples expected across all hosts.
    pub total: usize,
    /// Rate reported by this sample, in logs per second.
    pub rate: f64,
}

/// Outcome of one host in a survey.
pub type HostOutcome = (String, Result<SampleReport>);

/// Sample every host in `hosts` concurrently using `template`'s settings.
///
/// Outcomes come back in host order once all sessions have finished.
pub async fn collect_all<P>(
    template: &Scraper,
    hosts: &[String],
    samples: usize,
    on_progress: P,
) -> Vec<HostOutcome>
where
    P: Fn(&SurveyProgress<'_>),
{
    let counter = ProgressCounter::new(hosts.len() * samples, on_progress);
    collect_with(hosts, &counter, |host, on_sample| async move {
        template.for_host(host).sample(samples, on_sample).await
    })
    .await
}

/// Shared sample count across the sessions of one survey.
struct ProgressCounter<P> {
    completed: AtomicUsize,
    total: usize,
    on_progress: P,
}

impl<P: Fn(&SurveyProgress<'_>)> ProgressCounter<P> {
    fn new(total: usize, on_progress: P) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
            on_progress,
        }
    }

    fn record(&self, host: &str, rate: f64) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        (self.on_progress)(&SurveyProgress {
            host,
            completed,
            total: self.total,
            rate,
        });
    }
}

async fn collect_with<'a, P, F, Fut>(
    hosts: &'a [String],
    counter: &'a ProgressCounter<P>,
    session: F,
) -> Vec<HostOutcome>
where
    P: Fn(&SurveyProgress<'_>),
    F: Fn(&'a str, Box<dyn FnMut(&SampleProgress) + 'a>) -> Fut,
    Fut: Future<Output = Result<SampleReport>>,
{
    let sessions = hosts.iter().map(|host| {
        let host = host.as_str();
        session(
            host,
            Box::new(move |progress: &SampleProgress| counter.record(host, progress.rate)),
        )
    });

    let outcomes = join_all(sessions).await;

    hosts
        .iter()
        .cloned()
        .zip(outcomes)
        .inspect(|(host, outcome)| {
            if let Err(e) = outcome {
                warn!("({}) sampling failed [{}]: {}", host, e.reason(), e);
            }
        })
        .collect()
}

/// Connected devices gathered from a set of log-collector managers.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Device addresses in first-seen order.
    pub devices: IndexSet<String>,
    /// Managers that do not support device listing.
    pub unsupported: Vec<String>,
    /// Managers that failed for any other reason.
    pub failed: Vec<(String, Error)>,
}

/// Enumerate the connected devices of every manager concurrently.
pub async fn discover_devices(template: &Scraper, managers: &[String]) -> DiscoveryReport {
    discover_with(managers, |manager| async move {
        template.for_host(manager).list_connected_devices().await
    })
    .await
}

async fn discover_with<'a, F, Fut>(managers: &'a [String], session: F) -> DiscoveryReport
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<IndexSet<String>>>,
{
    let outcomes = join_all(managers.iter().map(|m| session(m))).await;

    let mut report = DiscoveryReport::default();
    for (manager, outcome) in managers.iter().zip(outcomes) {
        match outcome {
            Ok(devices) => {
                info!("({}) contributed {} devices", manager, devices.len());
                report.devices.extend(devices);
            }
            Err(e) if e.is_unsupported_device() => {
                warn!("({}) does not list connected devices", manager);
                report.unsupported.push(manager.clone());
            }
            Err(e) => {
                warn!("({}) device listing failed [{}]: {}", manager, e.reason(), e);
                report.failed.push((manager.clone(), e));
            }
        }
    }
    report
}

/// Survey parameters, loadable from any serde format.
///
/// Missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Samples per host.
    pub samples: usize,
    /// Time allowed to connect and authenticate.
    pub connect_timeout_secs: u64,
    /// Seconds between sample commands.
    pub sample_interval_secs: u64,
    /// Per-command response timeout; unset waits indefinitely.
    pub response_timeout_secs: Option<u64>,
    /// Days of logs kept, for the storage estimate.
    pub retention_days: u32,
    /// Average size of one log entry.
    pub log_size_bytes: u32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            samples: 5,
            connect_timeout_secs: 10,
            sample_interval_secs: 10,
            response_timeout_secs: None,
            retention_days: 30,
            log_size_bytes: 500,
        }
    }
}

impl SurveyConfig {
    /// Builder for `host` preloaded with these timings.
    pub fn builder(&self, host: impl Into<String>) -> ScraperBuilder {
        let builder = ScraperBuilder::new(host)
            .connect_timeout_secs(self.connect_timeout_secs)
            .sample_interval(Duration::from_secs(self.sample_interval_secs));
        match self.response_timeout_secs {
            Some(secs) => builder.response_timeout(Duration::from_secs(secs)),
            None => builder,
        }
    }

    pub fn storage_estimate(&self) -> StorageEstimate {
        StorageEstimate {
            retention_days: self.retention_days,
            log_size_bytes: self.log_size_bytes,
        }
    }

    /// Summarise the successful outcomes of a survey.
    pub fn report(&self, outcomes: &[HostOutcome]) -> Report {
        let mut report = Report::new(self.storage_estimate());
        for (host, outcome) in outcomes {
            if let Ok(samples) = outcome {
                report.push(host, samples);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{ProtocolError, TransportError};
    use crate::platform::DeviceClassification;
    use crate::platform::vendors::panos::{
        FIREWALL_COMMAND, LOG_COLLECTOR_COMMAND, PAGER_COMMAND, platform,
    };
    use crate::session::testing::ScriptedShell;
    use crate::session::{SamplingOptions, run_sampling};

    const PROMPT: &str = "\r\nadmin@PA> ";

    fn shell_for(host: &str) -> ScriptedShell {
        let shell = ScriptedShell::new("admin@PA> ").reply(PAGER_COMMAND, &[PROMPT]);
        match host {
            "10.0.0.1" => shell
                .reply(LOG_COLLECTOR_COMMAND, &["Invalid syntax.\r\n", PROMPT])
                .reply(FIREWALL_COMMAND, &["Log incoming rate: 40\r\n", PROMPT]),
            "10.0.0.2" => shell.reply(
                LOG_COLLECTOR_COMMAND,
                &["Incoming log rate = 2.5\r\n", PROMPT],
            ),
            _ => shell.fail_after(PAGER_COMMAND, 1),
        }
    }

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_isolates_failures() {
        let platform = platform();
        let hosts = hosts(&["10.0.0.1", "10.0.0.9", "10.0.0.2"]);
        let seen = Mutex::new(Vec::new());

        let counter = ProgressCounter::new(hosts.len() * 2, |p: &SurveyProgress<'_>| {
            seen.lock().unwrap().push((p.completed, p.total))
        });

        let outcomes = collect_with(
            &hosts,
            &counter,
            |host, on_sample| {
                let platform = &platform;
                async move {
                    let mut shell = shell_for(host);
                    run_sampling(&mut shell, host, platform, &SamplingOptions::new(2), on_sample)
                        .await
                }
            },
        )
        .await;

        let order: Vec<&str> = outcomes.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(order, vec!["10.0.0.1", "10.0.0.9", "10.0.0.2"]);

        let firewall = outcomes[0].1.as_ref().unwrap();
        assert_eq!(firewall.classification, DeviceClassification::Firewall);
        assert_eq!(firewall.samples.as_slice(), &[40.0, 40.0]);
        assert_eq!(outcomes[1].1.as_ref().unwrap_err().reason(), "transport");
        let collector = outcomes[2].1.as_ref().unwrap();
        assert_eq!(collector.classification, DeviceClassification::LogCollector);
        assert_eq!(collector.samples.len(), 2);

        drop(counter);
        let seen = seen.into_inner().unwrap();
        let counts: Vec<usize> = seen.iter().map(|(c, _)| *c).collect();
        assert_eq!(counts, vec![1, 2, 3, 4]);
        assert!(seen.iter().all(|(_, total)| *total == 6));
    }

    #[tokio::test]
    async fn test_discovery_merges_and_sorts_failures() {
        let managers = hosts(&["10.1.0.1", "10.1.0.2", "10.1.0.3", "10.1.0.4"]);

        let report = discover_with(&managers, |manager| async move {
            let devices = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
            let outcome: Result<IndexSet<String>> = match manager {
                "10.1.0.1" => Ok(devices(&["10.5.0.1", "10.5.0.2"])),
                "10.1.0.2" => Err(ProtocolError::UnsupportedDevice.into()),
                "10.1.0.3" => Ok(devices(&["10.5.0.2", "10.5.0.3"])),
                _ => Err(TransportError::Disconnected.into()),
            };
            outcome
        })
        .await;

        let devices: Vec<&str> = report.devices.iter().map(String::as_str).collect();
        assert_eq!(devices, vec!["10.5.0.1", "10.5.0.2", "10.5.0.3"]);
        assert_eq!(report.unsupported, vec!["10.1.0.2".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "10.1.0.4");
        assert_eq!(report.failed[0].1.reason(), "transport");
    }

    #[test]
    fn test_config_defaults() {
        let config: SurveyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SurveyConfig::default());
        assert_eq!(config.samples, 5);
        assert_eq!(config.storage_estimate(), StorageEstimate::default());
    }

    #[test]
    fn test_config_overrides() {
        let config: SurveyConfig =
            serde_json::from_str(r#"{"samples": 3, "retention_days": 90, "response_timeout_secs": 15}"#)
                .unwrap();
        assert_eq!(config.samples, 3);
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.log_size_bytes, 500);

        let scraper = config
            .builder("10.0.0.1")
            .username("admin")
            .password("secret")
            .build()
            .unwrap();
        assert_eq!(scraper.response_timeout, Some(Duration::from_secs(15)));
        assert_eq!(scraper.sample_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_report_skips_failures() {
        let outcomes: Vec<HostOutcome> = vec![
            (
                "10.0.0.1".into(),
                Ok(SampleReport {
                    classification: DeviceClassification::Firewall,
                    samples: vec![10.0].into(),
                }),
            ),
            ("10.0.0.2".into(), Err(TransportError::Disconnected.into())),
        ];
        let report = SurveyConfig::default().report(&outcomes);
        assert_eq!(report.rows().len(), 1);
        assert_eq!(report.rows()[0].host, "10.0.0.1");
    }
}
