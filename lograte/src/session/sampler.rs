//! Sampling session: device-type detection followed by timed rate samples.
//!
//! [`SamplingMachine`] holds the protocol and does no I/O. [`run_sampling`]
//! drives it over a [`Shell`], owning the sample timer for the session's
//! lifetime.
//!
//! ```text
//! Ready ──prompt──► PagerDisabled ──prompt──► DeviceTypeRequested
//!   (send pager off)     (send probe)              │ invalid syntax ⇒ Firewall
//!                                                  │ collector rate ⇒ LogCollector
//!                                                  ▼
//!  Complete ◄──n samples── Sampling ◄──prompt── SamplesRequested ◄── DeviceTypeDetected
//!                     (timer resends)   (send + arm timer)
//! ```

use std::time::Duration;

use log::{debug, info, trace};
use tokio::time::Instant;

use super::result::{SampleProgress, SampleReport, SampleSet};
use super::ticker::SampleTicker;
use super::{arm_deadline, expire};
use crate::channel::{PatternBuffer, find_rate};
use crate::error::{ConfigError, Result, TransportError};
use crate::platform::{DeviceClassification, PlatformDefinition, RateProbe};
use crate::transport::Shell;

/// Period between timer-driven sample commands.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Progress of a sampling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingState {
    /// Waiting for the first prompt.
    Ready,
    /// Pager-off sent, waiting for its prompt.
    PagerDisabled,
    /// Probe sent, waiting for rejection or a rate.
    DeviceTypeRequested,
    /// Classification fixed.
    DeviceTypeDetected,
    /// Waiting for the prompt that ends the probe response.
    SamplesRequested,
    /// Sample commands going out, rates coming back.
    Sampling,
    /// All samples collected.
    Complete,
}

/// What the driver must do after feeding output to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStep {
    /// Send a command now.
    Send(String),

    /// Send `command` now, then `repeats` more times on the sample timer.
    StartSampling { command: String, repeats: usize },

    /// A sample was appended.
    Collected(SampleProgress),

    /// The session is done.
    Complete(SampleReport),
}

/// Sans-IO state machine for one sampling session.
#[derive(Debug)]
pub struct SamplingMachine<'p> {
    platform: &'p PlatformDefinition,
    sample_count: usize,
    state: SamplingState,
    buffer: PatternBuffer,
    classification: Option<DeviceClassification>,
    samples: SampleSet,
}

impl<'p> SamplingMachine<'p> {
    /// Create a machine that collects `sample_count` samples.
    ///
    /// A count of zero is treated as one; [`run_sampling`] rejects it first.
    pub fn new(platform: &'p PlatformDefinition, sample_count: usize) -> Self {
        let sample_count = sample_count.max(1);
        Self {
            platform,
            sample_count,
            state: SamplingState::Ready,
            buffer: PatternBuffer::default(),
            classification: None,
            samples: SampleSet::with_capacity(sample_count),
        }
    }

    /// Current state.
    pub fn state(&self) -> SamplingState {
        self.state
    }

    /// Detected classification, once known.
    pub fn classification(&self) -> Option<DeviceClassification> {
        self.classification
    }

    /// Samples collected so far.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Feed a chunk of raw shell output and collect the resulting steps.
    pub fn feed(&mut self, data: &[u8]) -> Vec<SamplingStep> {
        let mut steps = Vec::new();
        if self.state == SamplingState::Complete {
            return steps;
        }
        self.buffer.extend(data);
        while self.advance(&mut steps) {}
        steps
    }

    /// Try one transition. Returns true if the buffer should be checked again.
    fn advance(&mut self, steps: &mut Vec<SamplingStep>) -> bool {
        let platform = self.platform;
        match self.state {
            SamplingState::Ready => {
                if self.buffer.tail_matches(&platform.prompt_pattern) {
                    self.send(steps, SamplingState::PagerDisabled, &platform.pager_command);
                }
                false
            }
            SamplingState::PagerDisabled => {
                if self.buffer.tail_matches(&platform.prompt_pattern) {
                    self.send(
                        steps,
                        SamplingState::DeviceTypeRequested,
                        &platform.probe().command,
                    );
                }
                false
            }
            SamplingState::DeviceTypeRequested => match self.detect() {
                Some(classification) => {
                    self.classification = Some(classification);
                    self.state = SamplingState::DeviceTypeDetected;
                    true
                }
                None => false,
            },
            SamplingState::DeviceTypeDetected => {
                self.state = SamplingState::SamplesRequested;
                true
            }
            SamplingState::SamplesRequested => {
                if self.buffer.tail_matches(&platform.prompt_pattern) {
                    let command = self.rate_probe().command.clone();
                    self.buffer.clear();
                    self.state = SamplingState::Sampling;
                    steps.push(SamplingStep::StartSampling {
                        command,
                        repeats: self.sample_count - 1,
                    });
                }
                false
            }
            SamplingState::Sampling => self.collect(steps),
            SamplingState::Complete => false,
        }
    }

    fn send(&mut self, steps: &mut Vec<SamplingStep>, next: SamplingState, command: &str) {
        self.buffer.clear();
        self.state = next;
        steps.push(SamplingStep::Send(command.to_string()));
    }

    /// Whichever of rejection or collector rate appears first decides.
    fn detect(&self) -> Option<DeviceClassification> {
        let text = self.buffer.as_str();
        let rejected = self.platform.invalid_syntax_pattern.find(text).map(|m| m.start());
        let answered = self
            .platform
            .probe()
            .rate_pattern
            .find(text)
            .map(|m| m.start());

        match (rejected, answered) {
            (Some(r), Some(a)) if a < r => Some(DeviceClassification::LogCollector),
            (Some(_), _) => Some(DeviceClassification::Firewall),
            (None, Some(_)) => Some(DeviceClassification::LogCollector),
            (None, None) => None,
        }
    }

    fn rate_probe(&self) -> &'p RateProbe {
        let classification = self
            .classification
            .unwrap_or(DeviceClassification::Firewall);
        self.platform.rate_probe(classification)
    }

    fn collect(&mut self, steps: &mut Vec<SamplingStep>) -> bool {
        let pattern = &self.rate_probe().rate_pattern;
        let Some(rate) = find_rate(pattern, self.buffer.as_str()) else {
            return false;
        };
        self.buffer.consume(rate.end);
        self.samples.push(rate.value);

        let classification = self
            .classification
            .unwrap_or(DeviceClassification::Firewall);
        steps.push(SamplingStep::Collected(SampleProgress {
            index: self.samples.len(),
            total: self.sample_count,
            rate: rate.value,
            classification,
        }));

        if self.samples.len() == self.sample_count {
            self.state = SamplingState::Complete;
            steps.push(SamplingStep::Complete(SampleReport {
                classification,
                samples: std::mem::take(&mut self.samples),
            }));
            return false;
        }
        true
    }
}

/// Timing options for [`run_sampling`].
#[derive(Debug, Clone)]
pub struct SamplingOptions {
    /// Samples to collect (at least 1).
    pub sample_count: usize,

    /// Period of the resend timer.
    pub interval: Duration,

    /// Fail if a command goes unanswered this long. `None` waits forever.
    pub response_timeout: Option<Duration>,
}

impl SamplingOptions {
    /// Options for `sample_count` samples at the default interval.
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            interval: DEFAULT_SAMPLE_INTERVAL,
            response_timeout: None,
        }
    }
}

/// Drive a sampling session over `shell` until it completes or fails.
///
/// `on_sample` runs once per sample, after the sample is appended and
/// before completion is checked. The shell is left open; the caller closes
/// it.
pub async fn run_sampling<S, F>(
    shell: &mut S,
    host: &str,
    platform: &PlatformDefinition,
    options: &SamplingOptions,
    mut on_sample: F,
) -> Result<SampleReport>
where
    S: Shell,
    F: FnMut(&SampleProgress),
{
    if options.sample_count == 0 {
        return Err(ConfigError::NotPositive {
            field: "sample_count",
        }
        .into());
    }

    let mut machine = SamplingMachine::new(platform, options.sample_count);
    let mut ticker = SampleTicker::idle();
    let mut sample_command = String::new();
    let mut deadline: Option<Instant> = arm_deadline(options.response_timeout);

    loop {
        let output = tokio::select! {
            output = shell.next_output() => output?,
            _ = ticker.next(), if ticker.is_armed() => {
                debug!(
                    "({}) timer resend, {} left: {}",
                    host,
                    ticker.remaining(),
                    sample_command
                );
                shell.send_line(&sample_command).await?;
                deadline = arm_deadline(options.response_timeout);
                continue;
            }
            _ = expire(deadline) => {
                let waited = options.response_timeout.unwrap_or_default();
                debug!("({}) no response in {:?} while {:?}", host, waited, machine.state());
                return Err(TransportError::Timeout(waited).into());
            }
        };

        let Some(data) = output else {
            debug!("({}) channel closed while {:?}", host, machine.state());
            return Err(TransportError::Disconnected.into());
        };
        trace!("({}) {}", host, String::from_utf8_lossy(&data));

        let before = machine.state();
        for step in machine.feed(&data) {
            match step {
                SamplingStep::Send(command) => {
                    debug!("({}) sending: {}", host, command);
                    shell.send_line(&command).await?;
                    deadline = arm_deadline(options.response_timeout);
                }
                SamplingStep::StartSampling { command, repeats } => {
                    info!("({}) requesting samples: {}", host, command);
                    shell.send_line(&command).await?;
                    ticker.arm(options.interval, repeats);
                    sample_command = command;
                    deadline = arm_deadline(options.response_timeout);
                }
                SamplingStep::Collected(progress) => {
                    info!(
                        "({}) sample {}/{}: {} logs/s",
                        host, progress.index, progress.total, progress.rate
                    );
                    deadline = None;
                    on_sample(&progress);
                }
                SamplingStep::Complete(report) => {
                    debug!("({}) sampling complete", host);
                    return Ok(report);
                }
            }
        }

        if before == SamplingState::DeviceTypeRequested {
            if let Some(classification) = machine.classification() {
                info!("({}) detected device type: {}", host, classification);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::panos::{
        FIREWALL_COMMAND, LOG_COLLECTOR_COMMAND, PAGER_COMMAND, platform,
    };
    use crate::session::testing::ScriptedShell;

    const PROMPT: &str = "\r\nadmin@PA-3220> ";

    fn firewall_shell(rate: &str) -> ScriptedShell {
        let reply = format!("Log incoming rate:      {}\r\n{}", rate, PROMPT);
        ScriptedShell::new("Last login: today\r\nadmin@PA-3220> ")
            .reply(PAGER_COMMAND, &[PROMPT])
            .reply(LOG_COLLECTOR_COMMAND, &["Invalid syntax.\r\n", PROMPT])
            .reply(FIREWALL_COMMAND, &[&reply])
    }

    fn drive(machine: &mut SamplingMachine<'_>, chunks: &[&str]) -> Vec<SamplingStep> {
        chunks
            .iter()
            .flat_map(|chunk| machine.feed(chunk.as_bytes()))
            .collect()
    }

    #[test]
    fn test_pager_then_probe() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 1);

        let steps = machine.feed(b"Welcome\r\nadmin@PA-3220> ");
        assert_eq!(steps, vec![SamplingStep::Send(PAGER_COMMAND.into())]);
        assert_eq!(machine.state(), SamplingState::PagerDisabled);

        let steps = machine.feed(b"set cli pager off\r\n\r\nadmin@PA-3220> ");
        assert_eq!(steps, vec![SamplingStep::Send(LOG_COLLECTOR_COMMAND.into())]);
        assert_eq!(machine.state(), SamplingState::DeviceTypeRequested);
    }

    #[test]
    fn test_invalid_syntax_means_firewall() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 2);
        drive(&mut machine, &["admin@PA> ", "admin@PA> "]);

        let steps = machine.feed(b"\r\nInvalid syntax.\r\n");
        assert!(steps.is_empty());
        assert_eq!(machine.classification(), Some(DeviceClassification::Firewall));
        assert_eq!(machine.state(), SamplingState::SamplesRequested);

        let steps = machine.feed(b"\r\nadmin@PA> ");
        assert_eq!(
            steps,
            vec![SamplingStep::StartSampling {
                command: FIREWALL_COMMAND.into(),
                repeats: 1,
            }]
        );
        assert_eq!(machine.state(), SamplingState::Sampling);
    }

    #[test]
    fn test_rate_means_log_collector() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 1);
        drive(&mut machine, &["admin@Panorama> ", "admin@Panorama> "]);

        // answer and prompt in one chunk
        let steps = machine.feed(b"Incoming log rate = 310.25\r\n\r\nadmin@Panorama> ");
        assert_eq!(
            machine.classification(),
            Some(DeviceClassification::LogCollector)
        );
        assert_eq!(
            steps,
            vec![SamplingStep::StartSampling {
                command: LOG_COLLECTOR_COMMAND.into(),
                repeats: 0,
            }]
        );
    }

    #[test]
    fn test_classification_is_fixed() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 2);
        drive(
            &mut machine,
            &["admin@PA> ", "admin@PA> ", "Invalid syntax.\r\nadmin@PA> "],
        );
        assert_eq!(machine.state(), SamplingState::Sampling);

        // a collector-looking line later on changes nothing
        let steps = machine.feed(b"Incoming log rate = 5.5\r\n");
        assert!(steps.is_empty());
        assert_eq!(machine.classification(), Some(DeviceClassification::Firewall));
    }

    #[test]
    fn test_unrecognised_probe_response_waits() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 1);
        drive(&mut machine, &["admin@PA> ", "admin@PA> "]);

        let steps = drive(
            &mut machine,
            &["Server error: busy\r\n", "\r\nadmin@PA> ", "more noise\r\n"],
        );
        assert!(steps.is_empty());
        assert_eq!(machine.state(), SamplingState::DeviceTypeRequested);
        assert_eq!(machine.classification(), None);

        machine.feed(b"Invalid syntax.\r\n");
        assert_eq!(machine.classification(), Some(DeviceClassification::Firewall));
    }

    #[test]
    fn test_collects_exact_count() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 2);
        drive(
            &mut machine,
            &["admin@PA> ", "admin@PA> ", "Invalid syntax.\r\nadmin@PA> "],
        );

        // two rates in one chunk, plus a third that must be ignored
        let steps = machine.feed(
            b"Log incoming rate: 10\r\nLog incoming rate: 20\r\nLog incoming rate: 30\r\n",
        );
        assert_eq!(steps.len(), 3);
        match &steps[2] {
            SamplingStep::Complete(report) => {
                assert_eq!(report.samples.as_slice(), &[10.0, 20.0]);
                assert_eq!(report.classification, DeviceClassification::Firewall);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(machine.state(), SamplingState::Complete);
        assert!(machine.feed(b"Log incoming rate: 40\r\n").is_empty());
    }

    #[test]
    fn test_split_rate_is_not_truncated() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 1);
        drive(
            &mut machine,
            &["admin@PA> ", "admin@PA> ", "Invalid syntax.\r\nadmin@PA> "],
        );

        assert!(machine.feed(b"Log incoming rate: 12").is_empty());
        let steps = machine.feed(b"34\r\n");
        match &steps[0] {
            SamplingStep::Collected(progress) => assert_eq!(progress.rate, 1234.0),
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    #[test]
    fn test_fractional_firewall_rate_does_not_stall() {
        let platform = platform();
        let mut machine = SamplingMachine::new(&platform, 2);
        drive(
            &mut machine,
            &["admin@PA> ", "admin@PA> ", "Invalid syntax.\r\nadmin@PA> "],
        );

        let steps = machine.feed(b"Log incoming rate: 12.5/sec\r\nadmin@PA> ");
        assert!(matches!(steps.as_slice(), [SamplingStep::Collected(_)]));
        assert_eq!(machine.samples().as_slice(), &[12.0]);

        let steps = machine.feed(b"Log incoming rate: 13/sec\r\n");
        match steps.last() {
            Some(SamplingStep::Complete(report)) => {
                assert_eq!(report.samples.as_slice(), &[12.0, 13.0])
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_firewall_session_timer_discipline() {
        let platform = platform();
        let mut shell = firewall_shell("1520");
        let options = SamplingOptions::new(3);
        let start = Instant::now();
        let mut progress = Vec::new();

        let report = run_sampling(&mut shell, "10.0.0.1", &platform, &options, |p| {
            progress.push(*p)
        })
        .await
        .unwrap();

        assert_eq!(report.classification, DeviceClassification::Firewall);
        assert_eq!(report.samples.as_slice(), &[1520.0, 1520.0, 1520.0]);
        // 1 immediate + 2 timer sends, the last at 20s
        assert_eq!(shell.count_sent(FIREWALL_COMMAND), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(
            shell.sent(),
            &[
                PAGER_COMMAND.to_string(),
                LOG_COLLECTOR_COMMAND.to_string(),
                FIREWALL_COMMAND.to_string(),
                FIREWALL_COMMAND.to_string(),
                FIREWALL_COMMAND.to_string(),
            ]
        );

        let indexes: Vec<usize> = progress.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert!(progress[2].is_last());
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_collector_session() {
        let platform = platform();
        let reply = format!("Incoming log rate = 2231.40\r\n{}", PROMPT);
        let mut shell = ScriptedShell::new("admin@Panorama> ")
            .reply(PAGER_COMMAND, &["\r\nadmin@Panorama> "])
            .reply(LOG_COLLECTOR_COMMAND, &[&reply]);
        let options = SamplingOptions::new(2);

        let report = run_sampling(&mut shell, "10.0.0.9", &platform, &options, |_| {})
            .await
            .unwrap();

        assert_eq!(report.classification, DeviceClassification::LogCollector);
        assert_eq!(report.samples.as_slice(), &[2231.4, 2231.4]);
        // probe + 2 samples
        assert_eq!(shell.count_sent(LOG_COLLECTOR_COMMAND), 3);
        assert_eq!(shell.count_sent(FIREWALL_COMMAND), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_sample_never_arms_timer() {
        let platform = platform();
        let mut shell = firewall_shell("7");
        let start = Instant::now();

        let report = run_sampling(&mut shell, "h", &platform, &SamplingOptions::new(1), |_| {})
            .await
            .unwrap();

        assert_eq!(report.samples.len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_mid_sampling() {
        let platform = platform();
        let mut shell = firewall_shell("100").fail_after(FIREWALL_COMMAND, 1);
        let mut collected = 0;

        let err = run_sampling(&mut shell, "h", &platform, &SamplingOptions::new(3), |_| {
            collected += 1
        })
        .await
        .unwrap_err();

        assert_eq!(err.reason(), "transport");
        assert_eq!(collected, 1);
        assert_eq!(shell.count_sent(FIREWALL_COMMAND), 1);

        // the timer died with the session
        let sent = shell.sent().len();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(shell.sent().len(), sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_closed_mid_sampling() {
        let platform = platform();
        let mut shell = firewall_shell("100").close_after(FIREWALL_COMMAND, 1);

        let err = run_sampling(&mut shell, "h", &platform, &SamplingOptions::new(2), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::Disconnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_timeout() {
        let platform = platform();
        // the probe is never answered
        let mut shell = ScriptedShell::new("admin@PA> ").reply(PAGER_COMMAND, &[PROMPT]);
        let mut options = SamplingOptions::new(1);
        options.response_timeout = Some(Duration::from_secs(30));

        let err = run_sampling(&mut shell, "h", &platform, &options, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::Timeout(t)) if t == Duration::from_secs(30)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_samples_rejected() {
        let platform = platform();
        let mut shell = firewall_shell("5");

        let err = run_sampling(&mut shell, "h", &platform, &SamplingOptions::new(0), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::NotPositive {
                field: "sample_count"
            })
        ));
        assert!(shell.sent().is_empty());
    }
}
