//! Peripheral synchronization over a serial link
//!
//! This module provides:
//! - `HardwareChannel` for fire-and-forget text commands with optional acks
//! - `SerialLink`, the byte-stream seam, and its `serialport` implementation

pub mod channel;
pub mod link;

pub use channel::{CommandOutcome, HardwareChannel, HardwareCommand, HardwareConfig};
pub use link::{SerialLink, SerialPortLink};

/// Command sent when the peripheral should stop its speaking animation
pub const STOP_COMMAND: &str = "stop";

/// Format the command that starts the speaking animation for `secs` seconds
pub fn speak_command(secs: u64) -> String {
    format!("speak({})", secs)
}
