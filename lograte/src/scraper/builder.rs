//! Builder for creating scrapers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use super::Scraper;
use crate::error::{ConfigError, Result};
use crate::platform::PlatformDefinition;
use crate::session::DEFAULT_SAMPLE_INTERVAL;
use crate::transport::{HostKeyVerification, SshConfig};

/// Builder for constructing a [`Scraper`].
///
/// # Example
///
/// ```rust,no_run
/// use lograte::ScraperBuilder;
///
/// # async fn example() -> Result<(), lograte::Error> {
/// let scraper = ScraperBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .connect_timeout_secs(10)
///     .build()?;
///
/// let report = scraper
///     .sample(3, |p| println!("{}/{}: {}", p.index, p.total, p.rate))
///     .await?;
/// println!("{} average {:?}", report.classification, report.samples.average());
/// # Ok(())
/// # }
/// ```
pub struct ScraperBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    connect_timeout: Duration,
    platform: Option<PlatformDefinition>,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    sample_interval: Duration,
    response_timeout: Option<Duration>,
    terminal_width: u32,
    terminal_height: u32,
}

impl ScraperBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            platform: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            response_timeout: None,
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password for authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the connection timeout in whole seconds.
    pub fn connect_timeout_secs(self, seconds: u64) -> Self {
        self.connect_timeout(Duration::from_secs(seconds))
    }

    /// Use a custom platform definition instead of PAN-OS.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Accept any host key. For lab use only.
    pub fn danger_disable_host_key_verification(self) -> Self {
        self.host_key_verification(HostKeyVerification::Disabled)
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Period between sample commands (default: 10 seconds).
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Fail a session if a command goes unanswered this long.
    ///
    /// Off by default: an unanswered command waits until the connection drops.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Build the scraper.
    ///
    /// Validates the configuration; no connection is made until a session
    /// is started.
    pub fn build(self) -> Result<Scraper> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing { field: "host" }.into());
        }

        let username = self
            .username
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing { field: "username" })?;

        let password = self
            .password
            .filter(|p| !secrecy::ExposeSecret::expose_secret(p).is_empty())
            .ok_or(ConfigError::Missing { field: "password" })?;

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "connect_timeout",
            }
            .into());
        }
        if self.sample_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "sample_interval",
            }
            .into());
        }

        let ssh_config = SshConfig {
            host: self.host.trim().to_string(),
            port: self.port,
            username,
            password,
            connect_timeout: self.connect_timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok(Scraper {
            ssh_config,
            platform: Arc::new(self.platform.unwrap_or_default()),
            sample_interval: self.sample_interval,
            response_timeout: self.response_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_build_defaults() {
        let scraper = ScraperBuilder::new("10.0.0.1")
            .username("admin")
            .password("secret")
            .build()
            .unwrap();
        assert_eq!(scraper.host(), "10.0.0.1");
        assert_eq!(scraper.platform().name, "panos");
        assert_eq!(scraper.ssh_config.port, 22);
        assert_eq!(scraper.ssh_config.connect_timeout, Duration::from_secs(10));
        assert_eq!(scraper.sample_interval, DEFAULT_SAMPLE_INTERVAL);
        assert!(scraper.response_timeout.is_none());
    }

    #[test]
    fn test_timeout_seconds() {
        let scraper = ScraperBuilder::new("10.0.0.1")
            .username("admin")
            .password("secret")
            .connect_timeout_secs(7)
            .build()
            .unwrap();
        assert_eq!(scraper.ssh_config.connect_timeout, Duration::from_millis(7000));
    }

    #[test]
    fn test_missing_credentials() {
        let err = ScraperBuilder::new("10.0.0.1").password("x").build().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::Missing { field: "username" })
        ));

        let err = ScraperBuilder::new("10.0.0.1")
            .username("admin")
            .password("")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::Missing { field: "password" })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ScraperBuilder::new("10.0.0.1")
            .username("admin")
            .password("secret")
            .connect_timeout_secs(0)
            .build()
            .unwrap_err();
        assert_eq!(err.reason(), "config");
    }
}
