//! Fire-and-forget command channel to the peripheral
//!
//! Every send resolves to a `HardwareCommand` describing what happened.
//! Transport failures are logged and reported, never returned as errors.

use crate::hardware::link::{SerialLink, SerialPortLink};
use crate::hardware::{speak_command, STOP_COMMAND};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the serial peripheral
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Whether to try opening the device at all
    pub enabled: bool,

    /// Device path of the serial port
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Delay after opening the port before the first command
    pub boot_delay_ms: u64,

    /// Whether to wait for an acknowledgment line after each command
    pub expect_ack: bool,

    /// How long to wait before checking for the acknowledgment
    pub ack_wait_ms: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            boot_delay_ms: 2000,
            expect_ack: true,
            ack_wait_ms: 2000,
        }
    }
}

impl HardwareConfig {
    /// Configuration for running without a peripheral
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the device path and baud rate
    pub fn with_port(mut self, port: impl Into<String>, baud_rate: u32) -> Self {
        self.port = port.into();
        self.baud_rate = baud_rate;
        self
    }

    /// Set acknowledgment behavior
    pub fn with_ack(mut self, expect_ack: bool, ack_wait_ms: u64) -> Self {
        self.expect_ack = expect_ack;
        self.ack_wait_ms = ack_wait_ms;
        self
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }

    pub fn ack_wait(&self) -> Duration {
        Duration::from_millis(self.ack_wait_ms)
    }
}

/// What happened to a single command
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CommandOutcome {
    /// Written and answered with an acknowledgment line
    Acked,
    /// Written, but nothing came back within the ack wait
    NoResponse,
    /// Written without waiting for an acknowledgment
    Sent,
    /// The transport failed
    SendError(String),
    /// No device is connected
    Skipped,
}

/// A command sent to the peripheral and its resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HardwareCommand {
    pub command: String,
    pub ack: Option<String>,
    pub outcome: CommandOutcome,
}

impl HardwareCommand {
    fn resolved(command: &str, ack: Option<String>, outcome: CommandOutcome) -> Self {
        Self {
            command: command.to_string(),
            ack,
            outcome,
        }
    }

    /// Whether the command reached the device
    pub fn delivered(&self) -> bool {
        matches!(
            self.outcome,
            CommandOutcome::Acked | CommandOutcome::NoResponse | CommandOutcome::Sent
        )
    }
}

/// Command channel owning the serial link for the whole session
pub struct HardwareChannel {
    link: Option<Box<dyn SerialLink>>,
    expect_ack: bool,
    ack_wait: Duration,
}

impl HardwareChannel {
    /// Wrap an already-open link
    pub fn new(link: Box<dyn SerialLink>, config: &HardwareConfig) -> Self {
        Self {
            link: Some(link),
            expect_ack: config.expect_ack,
            ack_wait: config.ack_wait(),
        }
    }

    /// A channel with no device behind it; every send is skipped
    pub fn disconnected() -> Self {
        Self {
            link: None,
            expect_ack: false,
            ack_wait: Duration::ZERO,
        }
    }

    /// Open the configured serial device, falling back to a disconnected channel
    pub fn open(config: &HardwareConfig) -> Self {
        if !config.enabled {
            info!("Hardware sync disabled");
            return Self::disconnected();
        }

        match SerialPortLink::open(config) {
            Ok(link) => Self::new(Box::new(link), config),
            Err(e) => {
                warn!("Peripheral unavailable, continuing without it: {}", e);
                Self::disconnected()
            }
        }
    }

    /// Check if a device is attached
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Send a command using the configured acknowledgment policy
    pub fn send(&mut self, command: &str) -> HardwareCommand {
        self.send_with(command, self.expect_ack, self.ack_wait)
    }

    /// Send `speak(<secs>)`
    pub fn speak(&mut self, secs: u64) -> HardwareCommand {
        self.send(&speak_command(secs))
    }

    /// Send `stop`
    pub fn stop(&mut self) -> HardwareCommand {
        self.send(STOP_COMMAND)
    }

    /// Send a command with an explicit acknowledgment policy
    pub fn send_with(
        &mut self,
        command: &str,
        expect_ack: bool,
        ack_wait: Duration,
    ) -> HardwareCommand {
        let Some(link) = self.link.as_mut() else {
            debug!("Peripheral not connected, skipping command: {}", command);
            return HardwareCommand::resolved(command, None, CommandOutcome::Skipped);
        };

        if let Err(e) = link.write_line(command) {
            warn!("Failed to send '{}' to peripheral: {}", command, e);
            return HardwareCommand::resolved(command, None, CommandOutcome::SendError(e.to_string()));
        }
        debug!("Sent to peripheral: {}", command);

        if !expect_ack {
            return HardwareCommand::resolved(command, None, CommandOutcome::Sent);
        }

        thread::sleep(ack_wait);

        let waiting = match link.bytes_available() {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to poll peripheral after '{}': {}", command, e);
                return HardwareCommand::resolved(
                    command,
                    None,
                    CommandOutcome::SendError(e.to_string()),
                );
            }
        };

        if waiting == 0 {
            debug!("No response from peripheral for '{}'", command);
            return HardwareCommand::resolved(command, None, CommandOutcome::NoResponse);
        }

        match link.read_line() {
            Ok(ack) => {
                debug!("Peripheral response: {}", ack);
                HardwareCommand::resolved(command, Some(ack), CommandOutcome::Acked)
            }
            Err(e) => {
                warn!("Failed to read peripheral response for '{}': {}", command, e);
                HardwareCommand::resolved(command, None, CommandOutcome::SendError(e.to_string()))
            }
        }
    }

    /// Release the link; later sends are skipped
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            info!("Peripheral connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Arc;

    #[derive(Default)]
    struct ScriptedLink {
        written: Arc<Mutex<Vec<String>>>,
        replies: VecDeque<String>,
        fail_writes: bool,
    }

    impl SerialLink for ScriptedLink {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.written.lock().push(line.to_string());
            Ok(())
        }

        fn bytes_available(&mut self) -> io::Result<u32> {
            Ok(self.replies.front().map(|r| r.len() as u32 + 1).unwrap_or(0))
        }

        fn read_line(&mut self) -> io::Result<String> {
            Ok(self.replies.pop_front().unwrap_or_default())
        }
    }

    fn quick_config() -> HardwareConfig {
        HardwareConfig::default().with_ack(true, 0)
    }

    #[test]
    fn test_disconnected_send_is_skipped() {
        let mut channel = HardwareChannel::disconnected();
        let cmd = channel.send("wake up");
        assert_eq!(cmd.outcome, CommandOutcome::Skipped);
        assert!(!cmd.delivered());
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_disabled_config_opens_disconnected() {
        let channel = HardwareChannel::open(&HardwareConfig::disabled());
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_ack_is_read() {
        let link = ScriptedLink {
            replies: VecDeque::from(vec!["OK speak".to_string()]),
            ..Default::default()
        };
        let written = Arc::clone(&link.written);
        let mut channel = HardwareChannel::new(Box::new(link), &quick_config());

        let cmd = channel.speak(3);
        assert_eq!(cmd.command, "speak(3)");
        assert_eq!(cmd.outcome, CommandOutcome::Acked);
        assert_eq!(cmd.ack.as_deref(), Some("OK speak"));
        assert_eq!(*written.lock(), vec!["speak(3)".to_string()]);
    }

    #[test]
    fn test_silent_device_reports_no_response() {
        let mut channel = HardwareChannel::new(Box::new(ScriptedLink::default()), &quick_config());
        let cmd = channel.stop();
        assert_eq!(cmd.outcome, CommandOutcome::NoResponse);
        assert!(cmd.delivered());
    }

    #[test]
    fn test_write_failure_is_absorbed() {
        let link = ScriptedLink {
            fail_writes: true,
            ..Default::default()
        };
        let mut channel = HardwareChannel::new(Box::new(link), &quick_config());
        let cmd = channel.send("go sleep");
        assert!(matches!(cmd.outcome, CommandOutcome::SendError(_)));
    }

    #[test]
    fn test_no_ack_returns_immediately() {
        let config = HardwareConfig::default().with_ack(false, 60_000);
        let mut channel = HardwareChannel::new(Box::new(ScriptedLink::default()), &config);
        let cmd = channel.send("wake up");
        assert_eq!(cmd.outcome, CommandOutcome::Sent);
    }

    #[test]
    fn test_close_makes_later_sends_skip() {
        let mut channel = HardwareChannel::new(Box::new(ScriptedLink::default()), &quick_config());
        channel.close();
        assert_eq!(channel.send("stop").outcome, CommandOutcome::Skipped);
    }
}
