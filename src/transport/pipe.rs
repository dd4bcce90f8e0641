//! Child-process stdio pipe transport.
//!
//! Frames travel over the child's stdout (inbound) and stdin (outbound).
//! Stderr is left alone so the child can log freely without corrupting
//! the frame stream.

use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::Transport;
use crate::error::{Result, VizwireError};

/// Transport over a spawned child process's stdio.
pub struct PipeTransport {
    child: Child,
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl PipeTransport {
    /// Spawn `command` with piped stdin/stdout and wrap its pipes.
    pub fn spawn(mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VizwireError::Protocol("child stdout not captured".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VizwireError::Protocol("child stdin not captured".to_string()))?;

        Ok(Self {
            child,
            stdout,
            stdin,
        })
    }
}

impl Transport for PipeTransport {
    type Reader = PipeReader;
    type Writer = ChildStdin;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        // The child handle rides with the read half so the process is
        // killed and reaped when the connection's read loop ends.
        (
            PipeReader {
                stdout: self.stdout,
                _child: self.child,
            },
            self.stdin,
        )
    }
}

/// Read half of a [`PipeTransport`]; owns the child process handle.
pub struct PipeReader {
    stdout: ChildStdout,
    _child: Child,
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}
