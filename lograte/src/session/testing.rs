//! In-memory shell used by the session tests.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::transport::Shell;

enum Scripted {
    Data(Bytes),
    Fail,
    Close,
}

/// Shell that echoes each command and answers from a fixed script.
///
/// Output that has not been scripted never arrives, like a device that has
/// gone quiet.
pub(crate) struct ScriptedShell {
    replies: Vec<(String, Vec<String>)>,
    pending: VecDeque<Scripted>,
    sent: Vec<String>,
    fail_after: Option<(String, usize)>,
    close_after: Option<(String, usize)>,
}

impl ScriptedShell {
    /// Start with the login banner and first prompt.
    pub(crate) fn new(greeting: &str) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(Scripted::Data(Bytes::from(greeting.to_string())));
        Self {
            replies: Vec::new(),
            pending,
            sent: Vec::new(),
            fail_after: None,
            close_after: None,
        }
    }

    /// Answer every send of `command` with `chunks`, one read each.
    pub(crate) fn reply(mut self, command: &str, chunks: &[&str]) -> Self {
        self.replies.push((
            command.to_string(),
            chunks.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Fail the read following the answer to the `sends`-th `command`.
    pub(crate) fn fail_after(mut self, command: &str, sends: usize) -> Self {
        self.fail_after = Some((command.to_string(), sends));
        self
    }

    /// Close the channel after the answer to the `sends`-th `command`.
    pub(crate) fn close_after(mut self, command: &str, sends: usize) -> Self {
        self.close_after = Some((command.to_string(), sends));
        self
    }

    pub(crate) fn sent(&self) -> &[String] {
        &self.sent
    }

    pub(crate) fn count_sent(&self, command: &str) -> usize {
        self.sent.iter().filter(|c| c.as_str() == command).count()
    }
}

impl Shell for ScriptedShell {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.push(line.to_string());
        let sends = self.count_sent(line);

        self.pending
            .push_back(Scripted::Data(Bytes::from(format!("{}\r\n", line))));
        if let Some((_, chunks)) = self.replies.iter().find(|(c, _)| c == line) {
            for chunk in chunks {
                self.pending
                    .push_back(Scripted::Data(Bytes::from(chunk.clone())));
            }
        }

        if self.fail_after.as_ref() == Some(&(line.to_string(), sends)) {
            self.pending.push_back(Scripted::Fail);
        }
        if self.close_after.as_ref() == Some(&(line.to_string(), sends)) {
            self.pending.push_back(Scripted::Close);
        }
        Ok(())
    }

    async fn next_output(&mut self) -> Result<Option<Bytes>> {
        match self.pending.pop_front() {
            Some(Scripted::Data(data)) => Ok(Some(data)),
            Some(Scripted::Fail) => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
            .into()),
            Some(Scripted::Close) => Ok(None),
            None => std::future::pending().await,
        }
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
