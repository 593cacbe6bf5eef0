//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshConfig};
use super::shell::Shell;
use crate::error::{Result, TransportError};

/// Authenticated SSH connection to one device.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate with the password.
    ///
    /// The connect timeout covers the TCP connect, key exchange and
    /// authentication together.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        // No inactivity timeout: sampling sessions idle between ticks.
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let handshake = async {
            let mut session =
                client::connect(ssh_config, (config.host.as_str(), config.port), handler)
                    .await
                    .map_err(|e| {
                        // Prefer the detailed host key error over russh's generic UnknownKey
                        let stored = host_key_error
                            .lock()
                            .ok()
                            .and_then(|mut slot| slot.take());
                        stored.unwrap_or(TransportError::Ssh(e))
                    })?;

            Self::authenticate(&mut session, &config).await?;
            Ok::<_, crate::Error>(session)
        };

        let session = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(config.connect_timeout))??;

        debug!("authenticated to {} as '{}'", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open a PTY channel and start an interactive shell on it.
    pub async fn open_shell(self) -> Result<SshShell> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| TransportError::ShellRequestFailed(e.to_string()))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| TransportError::ShellRequestFailed(e.to_string()))?;

        Ok(SshShell {
            transport: self,
            channel,
        })
    }

    /// Host this transport is connected to.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Interactive shell running over an [`SshTransport`].
pub struct SshShell {
    transport: SshTransport,
    channel: Channel<Msg>,
}

impl Shell for SshShell {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("({}) >>> {}", self.transport.host(), line);
        let data = format!("{}\r", line);
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn next_output(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                // PTY sessions rarely use stderr, but treat it as output if they do
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(other) => {
                    trace!("({}) ignoring channel message {:?}", self.transport.host(), other);
                }
            }
        }
    }

    async fn close(self) -> Result<()> {
        let host = self.transport.host().to_string();
        if let Err(e) = self.channel.close().await {
            debug!("({}) channel close failed: {}", host, e);
        }
        self.transport.close().await
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => {
                    self.reject(e);
                    Ok(false)
                }
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    self.reject(TransportError::HostKeyUnknown {
                        host: self.host.clone(),
                        port: self.port,
                    });
                    Ok(false)
                }
                Err(e) => {
                    self.reject(e);
                    Ok(false)
                }
            },
        }
    }
}
