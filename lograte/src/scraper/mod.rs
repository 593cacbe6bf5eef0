//! Connection-level entry points.
//!
//! A [`Scraper`] holds everything needed to reach one appliance. Each call
//! opens its own SSH connection, runs one session protocol over it and
//! closes the connection again, whatever the outcome.

mod builder;

pub use builder::ScraperBuilder;

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use log::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::platform::PlatformDefinition;
use crate::session::{SampleProgress, SampleReport, SamplingOptions, run_listing, run_sampling};
use crate::transport::{Shell, SshConfig, SshShell, SshTransport};

/// Configured access to one appliance.
///
/// Cheap to clone; [`Scraper::for_host`] reuses the credentials and timing
/// for another address.
#[derive(Debug, Clone)]
pub struct Scraper {
    pub(crate) ssh_config: SshConfig,
    pub(crate) platform: Arc<PlatformDefinition>,
    pub(crate) sample_interval: Duration,
    pub(crate) response_timeout: Option<Duration>,
}

impl Scraper {
    /// Start building a scraper for `host`.
    pub fn builder(host: impl Into<String>) -> ScraperBuilder {
        ScraperBuilder::new(host)
    }

    /// Same settings, different appliance.
    pub fn for_host(&self, host: impl Into<String>) -> Self {
        let mut scraper = self.clone();
        scraper.ssh_config.host = host.into();
        scraper
    }

    pub fn host(&self) -> &str {
        &self.ssh_config.host
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Measure the log ingestion rate `sample_count` times.
    ///
    /// The appliance type is detected from its response to the probe
    /// command. `on_sample` is called once per collected sample, in order.
    pub async fn sample<F>(&self, sample_count: usize, on_sample: F) -> Result<SampleReport>
    where
        F: FnMut(&SampleProgress),
    {
        if sample_count == 0 {
            return Err(ConfigError::NotPositive {
                field: "sample_count",
            }
            .into());
        }

        let options = SamplingOptions {
            sample_count,
            interval: self.sample_interval,
            response_timeout: self.response_timeout,
        };

        let mut shell = self.open().await?;
        let result = run_sampling(
            &mut shell,
            self.host(),
            &self.platform,
            &options,
            on_sample,
        )
        .await;
        self.release(shell).await;
        result
    }

    /// List the addresses of devices connected to a log-collector manager.
    ///
    /// Fails with [`ProtocolError::UnsupportedDevice`] when the appliance
    /// does not understand the list command and with
    /// [`ProtocolError::NoDevices`] when the list is empty.
    ///
    /// [`ProtocolError::UnsupportedDevice`]: crate::error::ProtocolError::UnsupportedDevice
    /// [`ProtocolError::NoDevices`]: crate::error::ProtocolError::NoDevices
    pub async fn list_connected_devices(&self) -> Result<IndexSet<String>> {
        let mut shell = self.open().await?;
        let result = run_listing(
            &mut shell,
            self.host(),
            &self.platform,
            self.response_timeout,
        )
        .await;
        self.release(shell).await;
        result
    }

    async fn open(&self) -> Result<SshShell> {
        let transport = SshTransport::connect(self.ssh_config.clone()).await?;
        transport.open_shell().await
    }

    /// Close the connection; a failure here never masks the session result.
    async fn release(&self, shell: SshShell) {
        match shell.close().await {
            Ok(()) => debug!("({}) connection closed", self.host()),
            Err(e) => warn!("({}) error closing connection: {}", self.host(), e),
        }
    }
}

/// Connect to `host` with a password and collect `sample_count` rate
/// samples.
pub async fn sample<F>(
    host: &str,
    username: &str,
    password: &str,
    sample_count: usize,
    connect_timeout_secs: u64,
    on_sample: F,
) -> Result<SampleReport>
where
    F: FnMut(&SampleProgress),
{
    ScraperBuilder::new(host)
        .username(username)
        .password(password)
        .connect_timeout_secs(connect_timeout_secs)
        .build()?
        .sample(sample_count, on_sample)
        .await
}

/// Connect to a log-collector manager at `host` and list its connected
/// devices.
pub async fn list_connected_devices(
    host: &str,
    username: &str,
    password: &str,
    connect_timeout_secs: u64,
) -> Result<IndexSet<String>> {
    ScraperBuilder::new(host)
        .username(username)
        .password(password)
        .connect_timeout_secs(connect_timeout_secs)
        .build()?
        .list_connected_devices()
        .await
}
