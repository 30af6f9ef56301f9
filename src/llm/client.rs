//! Line-framed protocol client for a long-lived model process
//!
//! Protocol: each request is one newline-terminated line written to the
//! child's stdin. The child answers with any number of lines followed by a
//! line exactly equal to the sentinel. A reader thread forwards stdout lines
//! into a bounded channel; queries wait on that channel with a deadline, so
//! a stuck child can never block the caller past its timeout.
//!
//! A response line that happens to equal the sentinel ends the response
//! early. Pick a sentinel the model will not produce.

use crate::llm::config::LlmConfig;
use crate::llm::exchange::Exchange;
use crate::{Result, SentioError};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long `close` waits for the reader thread before detaching it
const READER_JOIN_WAIT: Duration = Duration::from_millis(200);

/// Polling interval while waiting for the child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Messages from the stdout reader thread
#[derive(Debug)]
enum ReaderMessage {
    Line(String),
    Closed,
    Failed(String),
}

/// Marks the single in-flight exchange; cleared on drop
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A spawned model process and its I/O
struct ModelProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<ReaderMessage>,
    reader: Option<JoinHandle<()>>,
    /// Sentinels of abandoned exchanges not yet read back
    owed_sentinels: usize,
}

impl ModelProcess {
    fn spawn(config: &LlmConfig) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(config.resolved_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SentioError::ProcessSpawn(format!("{}: {}", config.program, e)))?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SentioError::ProcessSpawn(
                    "Model process pipes were not captured".into(),
                ));
            }
        };

        let (line_tx, line_rx) = bounded(config.line_buffer);
        let reader = thread::Builder::new()
            .name("llm-reader".into())
            .spawn({
                let max_line_bytes = config.max_line_bytes;
                move || forward_lines(stdout, line_tx, max_line_bytes)
            });

        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SentioError::ProcessSpawn(format!(
                    "Failed to start reader thread: {}",
                    e
                )));
            }
        };

        info!(
            "Model process started: {} (pid {})",
            config.program,
            child.id()
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines: line_rx,
            reader: Some(reader),
            owed_sentinels: 0,
        })
    }

    /// Discard output that has already arrived from an abandoned exchange
    fn drain_stale(&mut self, sentinel: &str) -> usize {
        let mut stale = 0;
        while let Ok(message) = self.lines.try_recv() {
            match message {
                ReaderMessage::Line(line) => {
                    if line == sentinel && self.owed_sentinels > 0 {
                        self.owed_sentinels -= 1;
                    }
                    stale += 1;
                }
                // Keep the closed state visible to the next read
                ReaderMessage::Closed | ReaderMessage::Failed(_) => break,
            }
        }
        stale
    }

    fn send_line(&mut self, text: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SentioError::ProcessError("Model input already closed".into()))?;

        // A request is exactly one line
        let line = text.replace(['\r', '\n'], " ");
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .map_err(|e| SentioError::ProcessError(format!("Failed to write query: {}", e)))
    }

    /// Collect lines until the sentinel, failing after `timeout`
    ///
    /// Output of abandoned exchanges still in flight is skipped first, within
    /// the same deadline. An exchange that ends before its sentinel arrives
    /// leaves that sentinel owed to the next read.
    fn read_until_sentinel(
        &mut self,
        sentinel: &str,
        timeout: Duration,
        max_lines: usize,
    ) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();

        loop {
            let line = match self.next_line(deadline, timeout) {
                Ok(line) => line,
                Err(e) => {
                    if matches!(e, SentioError::ResponseTimeout(_)) {
                        self.owed_sentinels += 1;
                    }
                    return Err(e);
                }
            };

            if self.owed_sentinels > 0 {
                if line == sentinel {
                    self.owed_sentinels -= 1;
                }
                debug!("Skipping stale line: {}", line);
                continue;
            }

            if line == sentinel {
                return Ok(lines);
            }
            if lines.len() >= max_lines {
                // The rest of this response is still on its way
                self.owed_sentinels += 1;
                return Err(SentioError::ResponseTooLong(max_lines));
            }
            lines.push(line);
        }
    }

    fn next_line(&self, deadline: Instant, timeout: Duration) -> Result<String> {
        match self.lines.recv_deadline(deadline) {
            Ok(ReaderMessage::Line(line)) => Ok(line),
            Ok(ReaderMessage::Closed) => Err(SentioError::ProcessError(
                "Model process closed its output".into(),
            )),
            Ok(ReaderMessage::Failed(e)) => Err(SentioError::ProcessError(e)),
            Err(RecvTimeoutError::Timeout) => Err(SentioError::ResponseTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SentioError::ProcessError("Model output reader stopped".into()))
            }
        }
    }

    /// Ask the process to exit, then kill it; errors are logged and swallowed
    fn shutdown(mut self, exit_command: &str, grace: Duration) {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = writeln!(stdin, "{}", exit_command).and_then(|_| stdin.flush()) {
                debug!("Could not send exit command: {}", e);
            }
        }

        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Model process exited: {}", status);
                    break;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => {
                    if let Err(e) = self.child.kill() {
                        debug!("Kill failed (process may be gone): {}", e);
                    }
                    let _ = self.child.wait();
                    break;
                }
                Err(e) => {
                    warn!("Failed to query model process status: {}", e);
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }

        // Unblocks a reader waiting on a full channel
        drop(self.lines);

        if let Some(reader) = self.reader.take() {
            let deadline = Instant::now() + READER_JOIN_WAIT;
            while !reader.is_finished() && Instant::now() < deadline {
                thread::sleep(EXIT_POLL_INTERVAL);
            }
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                debug!("Reader thread still attached to a pipe, detaching");
            }
        }
    }
}

/// Reader thread body: forward stdout lines until EOF
///
/// A line longer than `max_line_bytes` ends the stream as a failure.
fn forward_lines(stdout: ChildStdout, tx: Sender<ReaderMessage>, max_line_bytes: usize) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let limit = max_line_bytes as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut buf) {
            Ok(0) => {
                let _ = tx.send(ReaderMessage::Closed);
                return;
            }
            Ok(_) if !buf.ends_with(b"\n") && buf.len() > max_line_bytes => {
                let _ = tx.send(ReaderMessage::Failed(format!(
                    "Output line exceeded {} bytes",
                    max_line_bytes
                )));
                return;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                if tx.send(ReaderMessage::Line(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(ReaderMessage::Failed(format!("Failed to read output: {}", e)));
                return;
            }
        }
    }
}

/// Client owning one long-lived model process
///
/// `query` takes `&self` so the client can be shared, but only one exchange
/// runs at a time; overlapping calls fail with `ExchangeInProgress`.
pub struct LlmClient {
    config: LlmConfig,
    process: Mutex<Option<ModelProcess>>,
    in_flight: AtomicBool,
}

impl LlmClient {
    /// Create a client; the process starts on `open`
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            process: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the process is running
    ///
    /// Blocks while an exchange is in flight.
    pub fn is_open(&self) -> bool {
        self.process.lock().is_some()
    }

    /// Spawn the process; a no-op if already open
    pub fn open(&self) -> Result<()> {
        let mut process = self.process.lock();
        if process.is_some() {
            return Ok(());
        }

        let mut spawned = ModelProcess::spawn(&self.config)?;

        if let Some(ready_timeout) = self.config.ready_timeout() {
            if let Err(e) = spawned.read_until_sentinel(
                &self.config.sentinel,
                ready_timeout,
                self.config.max_response_lines,
            ) {
                spawned.shutdown(&self.config.exit_command, Duration::ZERO);
                return Err(SentioError::ProcessSpawn(format!(
                    "Model process never became ready: {}",
                    e
                )));
            }
            debug!("Model process ready");
        }

        *process = Some(spawned);
        Ok(())
    }

    /// Send one query and wait for the framed response
    pub fn query(&self, text: &str, timeout: Duration) -> Result<String> {
        let _guard =
            InFlightGuard::acquire(&self.in_flight).ok_or(SentioError::ExchangeInProgress)?;

        let mut process = self.process.lock();
        let running = process.as_mut().ok_or(SentioError::NotOpen)?;

        let stale = running.drain_stale(&self.config.sentinel);
        if stale > 0 {
            warn!("Discarded {} stale lines from the model process", stale);
        }

        debug!("Sending query: {}", text);
        running.send_line(text)?;

        let lines =
            running.read_until_sentinel(&self.config.sentinel, timeout, self.config.max_response_lines)?;
        let response = lines.join("\n").trim().to_string();
        debug!("Received response ({} lines): {}", lines.len(), response);
        Ok(response)
    }

    /// Run one exchange with the configured timeout
    pub fn exchange(&self, text: &str) -> Exchange {
        let started_at = Utc::now();
        let start = Instant::now();
        let result = self.query(text, self.config.response_timeout());
        let exchange = Exchange::resolve(text, result, start.elapsed(), started_at);

        info!(
            "Exchange {} finished in {:?}: {:?}",
            exchange.id(),
            exchange.elapsed(),
            exchange.outcome()
        );
        exchange
    }

    /// Stop the process and release its handles; safe to call repeatedly
    pub fn close(&self) {
        let process = self.process.lock().take();
        if let Some(process) = process {
            process.shutdown(&self.config.exit_command, self.config.shutdown_grace());
            info!("Model process closed");
        }
    }
}

impl Drop for LlmClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_config(script: &str) -> LlmConfig {
        LlmConfig::command("sh", ["-c", script])
    }

    #[test]
    fn test_query_before_open_fails() {
        let client = LlmClient::new(echo_config("cat"));
        assert_eq!(
            client.query("hi", Duration::from_millis(50)),
            Err(SentioError::NotOpen)
        );
    }

    #[test]
    fn test_in_flight_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(first);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_multiline_query_is_flattened() {
        // Echo back whatever single line arrives, then the sentinel
        let client = LlmClient::new(echo_config(
            "while IFS= read -r line; do echo \"$line\"; echo '>>>'; done",
        ));
        client.open().unwrap();
        let response = client.query("one\ntwo", Duration::from_secs(5)).unwrap();
        assert_eq!(response, "one two");
        client.close();
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = LlmClient::new(echo_config("cat"));
        client.open().unwrap();
        assert!(client.is_open());
        client.close();
        client.close();
        assert!(!client.is_open());
    }
}
