//! Connected-device enumeration against a log-collector manager.
//!
//! `Ready ─prompt─► PagerDisabled ─prompt─► ListRequested ─► Complete`
//!
//! The list is judged on everything received since the list command was
//! sent. A rejection ends the session at once; the "empty" and address
//! verdicts wait for the prompt that closes the response, so a list split
//! over several chunks is never cut short.

use std::time::Duration;

use indexmap::IndexSet;
use log::{debug, info, trace};
use tokio::time::Instant;

use super::{arm_deadline, expire};
use crate::channel::{PatternBuffer, extract_addresses};
use crate::error::{ProtocolError, Result, TransportError};
use crate::platform::PlatformDefinition;
use crate::transport::Shell;

/// Progress of an enumeration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    /// Waiting for the first prompt.
    Ready,
    /// Pager-off sent, waiting for its prompt.
    PagerDisabled,
    /// List command sent, reading its response.
    ListRequested,
    /// Verdict reached.
    Complete,
}

/// What the driver must do after feeding output to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingStep {
    /// Send a command now.
    Send(String),

    /// The session is done.
    Finished(std::result::Result<IndexSet<String>, ProtocolError>),
}

/// Sans-IO state machine for one enumeration session.
#[derive(Debug)]
pub struct ListingMachine<'p> {
    platform: &'p PlatformDefinition,
    state: ListingState,
    buffer: PatternBuffer,
}

impl<'p> ListingMachine<'p> {
    pub fn new(platform: &'p PlatformDefinition) -> Self {
        Self {
            platform,
            state: ListingState::Ready,
            buffer: PatternBuffer::default(),
        }
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Feed a chunk of raw shell output.
    pub fn feed(&mut self, data: &[u8]) -> Option<ListingStep> {
        let platform = self.platform;
        if self.state == ListingState::Complete {
            return None;
        }
        self.buffer.extend(data);

        match self.state {
            ListingState::Ready => self.on_prompt(ListingState::PagerDisabled, &platform.pager_command),
            ListingState::PagerDisabled => {
                self.on_prompt(ListingState::ListRequested, &platform.list_command)
            }
            ListingState::ListRequested => {
                let verdict = self.judge()?;
                self.state = ListingState::Complete;
                Some(ListingStep::Finished(verdict))
            }
            ListingState::Complete => None,
        }
    }

    fn on_prompt(&mut self, next: ListingState, command: &str) -> Option<ListingStep> {
        if !self.buffer.tail_matches(&self.platform.prompt_pattern) {
            return None;
        }
        self.buffer.clear();
        self.state = next;
        Some(ListingStep::Send(command.to_string()))
    }

    /// Rejection first, then header without addresses, then addresses.
    fn judge(&self) -> Option<std::result::Result<IndexSet<String>, ProtocolError>> {
        let platform = self.platform;
        if self.buffer.contains(&platform.invalid_syntax_pattern) {
            return Some(Err(ProtocolError::UnsupportedDevice));
        }
        if !self.buffer.tail_matches(&platform.prompt_pattern) {
            return None;
        }

        let addresses = extract_addresses(&platform.address_pattern, self.buffer.as_str());
        if addresses.is_empty() {
            if self.buffer.contains(&platform.list_header_pattern) {
                return Some(Err(ProtocolError::NoDevices));
            }
            return None;
        }
        Some(Ok(addresses))
    }
}

/// Drive an enumeration session over `shell` until it reaches a verdict.
///
/// The shell is left open; the caller closes it.
pub async fn run_listing<S: Shell>(
    shell: &mut S,
    host: &str,
    platform: &PlatformDefinition,
    response_timeout: Option<Duration>,
) -> Result<IndexSet<String>> {
    let mut machine = ListingMachine::new(platform);
    let mut deadline: Option<Instant> = arm_deadline(response_timeout);

    loop {
        let output = tokio::select! {
            output = shell.next_output() => output?,
            _ = expire(deadline) => {
                let waited = response_timeout.unwrap_or_default();
                debug!("({}) no response in {:?} while {:?}", host, waited, machine.state());
                return Err(TransportError::Timeout(waited).into());
            }
        };

        let Some(data) = output else {
            debug!("({}) channel closed while {:?}", host, machine.state());
            return Err(TransportError::Disconnected.into());
        };
        trace!("({}) {}", host, String::from_utf8_lossy(&data));

        match machine.feed(&data) {
            Some(ListingStep::Send(command)) => {
                debug!("({}) sending: {}", host, command);
                shell.send_line(&command).await?;
                deadline = arm_deadline(response_timeout);
            }
            Some(ListingStep::Finished(Ok(addresses))) => {
                info!("({}) {} connected devices", host, addresses.len());
                return Ok(addresses);
            }
            Some(ListingStep::Finished(Err(e))) => {
                info!("({}) device listing failed: {}", host, e);
                return Err(e.into());
            }
            None => {}
        }
    }
}
