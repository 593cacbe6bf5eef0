//! Interactive shell abstraction consumed by the session state machines.

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// An open interactive shell on a remote device.
///
/// Implemented by [`SshShell`](super::SshShell) for real sessions; anything
/// that can write a line and hand back output chunks can drive a session.
pub trait Shell: Send {
    /// Write `line` followed by a carriage return.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote side has closed the channel.
    /// Must be cancel-safe: a dropped call loses no data.
    fn next_output(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Close the channel and disconnect.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}
