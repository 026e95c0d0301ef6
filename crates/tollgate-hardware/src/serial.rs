//! Serial tag reader backed by the `serialport` crate.

use crate::{HardwareError, Result, traits::TagByteSource};
use serialport::SerialPort;
use std::io::Read;
use std::time::Duration;
use tollgate_core::constants::DEFAULT_TAG_BAUD;
use tracing::{debug, info};

/// Read timeout applied to the port; reads never wait for data anyway.
const PORT_TIMEOUT: Duration = Duration::from_millis(1);

/// Tag reader attached to a UART at 9600 baud, 8N1.
pub struct SerialTagReader {
    port: Box<dyn SerialPort>,
    path: String,
    scratch: [u8; 64],
}

impl SerialTagReader {
    /// Open the reader on `path` at the default baud rate.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::CommunicationError`] if the port cannot be opened.
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_baud(path, DEFAULT_TAG_BAUD)
    }

    /// Open the reader on `path` at a custom baud rate.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::CommunicationError`] if the port cannot be opened.
    pub fn open_with_baud(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| HardwareError::communication(format!("{path}: {e}")))?;

        info!(path, baud, "Opened tag reader port");

        Ok(Self {
            port,
            path: path.to_string(),
            scratch: [0; 64],
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for SerialTagReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTagReader")
            .field("path", &self.path)
            .finish()
    }
}

impl TagByteSource for SerialTagReader {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;

        loop {
            let pending = self
                .port
                .bytes_to_read()
                .map_err(|e| HardwareError::communication(e.to_string()))?
                as usize;
            if pending == 0 {
                break;
            }

            let want = pending.min(self.scratch.len());
            let n = self.port.read(&mut self.scratch[..want])?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&self.scratch[..n]);
            total += n;
        }

        if total > 0 {
            debug!(path = %self.path, bytes = total, "Read tag reader bytes");
        }
        Ok(total)
    }
}
