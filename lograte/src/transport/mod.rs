//! SSH transport layer wrapping russh.
//!
//! This module owns connection setup, password authentication and the
//! interactive shell channel. The session state machines only see the
//! [`Shell`] trait.

pub mod config;
mod shell;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use shell::Shell;
pub use ssh::{SshShell, SshTransport};
