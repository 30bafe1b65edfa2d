//! Payload lines from standard input
//!
//! A background thread owns the blocking reader and reads exactly one line
//! per request. The consumer asks for the next line only once it is ready
//! for it, then waits with a short timeout so a termination request is
//! noticed while no input arrives.

use crate::cancel::CancelToken;
use log::{debug, warn};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Longest accepted payload line in bytes, excluding the line ending
pub const MAX_LINE_LEN: usize = 1024;

/// How long one wait for input lasts before cancellation is rechecked
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Result of waiting for the next payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLine {
    /// A non-empty payload, line ending removed
    Payload(String),
    /// Input is exhausted
    Eof,
    /// Cancellation was requested while waiting
    Cancelled,
}

enum Message {
    Line(String),
    Eof,
    Failed(io::Error),
}

/// Reads payload lines from any buffered reader on a worker thread
pub struct LineReader {
    requests: Sender<()>,
    lines: Receiver<Message>,
    /// A line has been requested and not yet received
    pending: bool,
    poll_timeout: Duration,
}

impl LineReader {
    /// Start a worker that reads from `reader` on demand
    pub fn spawn<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (line_tx, line_rx) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                let mut reader = reader;
                for () in request_rx {
                    let mut line = String::new();
                    let msg = match reader.read_line(&mut line) {
                        Ok(0) => Message::Eof,
                        Ok(_) => Message::Line(line),
                        Err(e) => Message::Failed(e),
                    };
                    let done = !matches!(msg, Message::Line(_));
                    if line_tx.send(msg).is_err() || done {
                        break;
                    }
                }
            })?;
        Ok(Self {
            requests: request_tx,
            lines: line_rx,
            pending: false,
            poll_timeout: POLL_TIMEOUT,
        })
    }

    /// Read from the process's standard input
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    /// Override the wait slice
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Wait for the next non-empty, acceptable payload line.
    ///
    /// Nothing is read until this is called. Empty lines are skipped
    /// silently. Lines longer than [`MAX_LINE_LEN`] are dropped with a
    /// warning.
    pub fn next_line(&mut self, cancel: &CancelToken) -> NextLine {
        loop {
            if cancel.is_cancelled() {
                return NextLine::Cancelled;
            }
            if !self.pending {
                if self.requests.send(()).is_err() {
                    return NextLine::Eof;
                }
                self.pending = true;
            }
            let raw = match self.lines.recv_timeout(self.poll_timeout) {
                Ok(Message::Line(raw)) => raw,
                Ok(Message::Eof) | Err(RecvTimeoutError::Disconnected) => {
                    self.pending = false;
                    return NextLine::Eof;
                }
                Ok(Message::Failed(e)) => {
                    self.pending = false;
                    warn!("error reading input: {}", e);
                    return NextLine::Eof;
                }
                Err(RecvTimeoutError::Timeout) => continue,
            };
            self.pending = false;

            let line = strip_line_ending(&raw);
            if line.is_empty() {
                debug!("skipping empty line");
                continue;
            }
            if line.len() > MAX_LINE_LEN {
                warn!(
                    "input line of {} bytes exceeds the {} byte limit, ignoring",
                    line.len(),
                    MAX_LINE_LEN
                );
                continue;
            }
            return NextLine::Payload(line.to_string());
        }
    }
}

fn strip_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}
