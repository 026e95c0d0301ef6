//! Mock tag reader byte stream.
//!
//! Bytes sent through the handle become readable by the stream on its next
//! `read_available` call, in the order they were sent.

use crate::{HardwareError, Result, traits::TagByteSource};
use tokio::sync::mpsc;

/// Mock serial byte source for the tag reader.
///
/// # Examples
///
/// ```
/// use tollgate_hardware::mock::MockTagStream;
/// use tollgate_hardware::traits::TagByteSource;
///
/// let (mut stream, handle) = MockTagStream::new();
/// handle.send_bytes(&[0x01, 0x02]).unwrap();
///
/// let mut buf = Vec::new();
/// assert_eq!(stream.read_available(&mut buf).unwrap(), 2);
/// assert_eq!(buf, vec![0x01, 0x02]);
/// ```
#[derive(Debug)]
pub struct MockTagStream {
    byte_rx: mpsc::UnboundedReceiver<StreamEvent>,
    disconnected: bool,
    total_bytes: u64,
}

#[derive(Debug)]
enum StreamEvent {
    Bytes(Vec<u8>),
    SetConnected(bool),
}

impl MockTagStream {
    /// Create a new mock stream and its control handle.
    pub fn new() -> (Self, MockTagStreamHandle) {
        let (byte_tx, byte_rx) = mpsc::unbounded_channel();

        let stream = Self {
            byte_rx,
            disconnected: false,
            total_bytes: 0,
        };

        (stream, MockTagStreamHandle { byte_tx })
    }

    /// Total bytes handed out since creation.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

impl TagByteSource for MockTagStream {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let mut read = 0;

        while let Ok(event) = self.byte_rx.try_recv() {
            match event {
                StreamEvent::Bytes(bytes) => {
                    if !self.disconnected {
                        read += bytes.len();
                        buf.extend_from_slice(&bytes);
                    }
                }
                StreamEvent::SetConnected(connected) => self.disconnected = !connected,
            }
        }

        if self.disconnected && read == 0 {
            return Err(HardwareError::disconnected("Mock tag reader"));
        }

        self.total_bytes += read as u64;
        Ok(read)
    }
}

/// Handle for feeding bytes into a [`MockTagStream`].
#[derive(Debug, Clone)]
pub struct MockTagStreamHandle {
    byte_tx: mpsc::UnboundedSender<StreamEvent>,
}

impl MockTagStreamHandle {
    /// Queue bytes for the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream has been dropped.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.send(StreamEvent::Bytes(bytes.to_vec()))
    }

    /// Simulate unplugging (`false`) or reconnecting (`true`) the reader.
    ///
    /// Bytes sent while unplugged are lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream has been dropped.
    pub fn set_connected(&self, connected: bool) -> Result<()> {
        self.send(StreamEvent::SetConnected(connected))
    }

    fn send(&self, event: StreamEvent) -> Result<()> {
        self.byte_tx
            .send(event)
            .map_err(|_| HardwareError::disconnected("Tag stream channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_read() {
        let (mut stream, _handle) = MockTagStream::new();
        let mut buf = Vec::new();
        assert_eq!(stream.read_available(&mut buf).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_bytes_arrive_in_order() {
        let (mut stream, handle) = MockTagStream::new();
        handle.send_bytes(&[1, 2]).unwrap();
        handle.send_bytes(&[3]).unwrap();

        let mut buf = vec![0xAA];
        assert_eq!(stream.read_available(&mut buf).unwrap(), 3);
        assert_eq!(buf, vec![0xAA, 1, 2, 3]);
        assert_eq!(stream.total_bytes(), 3);
    }

    #[test]
    fn test_disconnect_drops_bytes() {
        let (mut stream, handle) = MockTagStream::new();
        handle.set_connected(false).unwrap();
        handle.send_bytes(&[1, 2, 3]).unwrap();

        let mut buf = Vec::new();
        assert!(stream.read_available(&mut buf).is_err());
        assert!(buf.is_empty());

        handle.set_connected(true).unwrap();
        handle.send_bytes(&[4]).unwrap();
        assert_eq!(stream.read_available(&mut buf).unwrap(), 1);
        assert_eq!(buf, vec![4]);
    }
}
