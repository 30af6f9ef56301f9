use crate::hardware::channel::HardwareConfig;
use crate::{Result, SentioError};
use serialport::SerialPort;
use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Read timeout applied to the port so `read_line` cannot hang
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound on a single acknowledgment line
const MAX_LINE_BYTES: usize = 1024;

/// Duplex byte stream to the peripheral
pub trait SerialLink: Send {
    /// Write `line` followed by a newline
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Number of bytes waiting in the input buffer
    fn bytes_available(&mut self) -> io::Result<u32>;

    /// Read one line, without its terminator
    fn read_line(&mut self) -> io::Result<String>;
}

/// `SerialLink` backed by a real serial port
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialPortLink {
    /// Open the configured port and wait for the device to reset
    pub fn open(config: &HardwareConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .map_err(|e| {
                SentioError::Hardware(format!("Failed to open {}: {}", config.port, e))
            })?;

        // Boards like the Arduino reset when the port opens
        thread::sleep(config.boot_delay());

        info!("Serial link open on {} at {} baud", config.port, config.baud_rate);

        Ok(Self {
            port,
            path: config.port.clone(),
        })
    }

    /// Path of the underlying device
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialLink for SerialPortLink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while line.len() < MAX_LINE_BYTES {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    debug!("Serial read timed out on {} after {} bytes", self.path, line.len());
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }
}
