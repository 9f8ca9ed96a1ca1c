//! Mock USB transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{TransportError, UsbTransport};
use crate::protocol::CommandHeader;
use crate::protocol::constants::{NINTENDO_VENDOR_ID, SWITCH_PRODUCT_ID};

/// Mock transport for exercising the dispatcher without a device.
///
/// Inbound data is a single byte stream, so a test can queue whole
/// commands and the engine reads them back in whatever sizes it asks for.
/// Running out of queued bytes behaves like the device going away.
#[derive(Clone)]
pub struct MockTransport {
    /// Bytes the "device" will send.
    inbound: Arc<Mutex<VecDeque<u8>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Whether device is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue raw bytes to be returned by later reads.
    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend(bytes.iter().copied());
    }

    /// Queue an encoded command header.
    pub fn queue_header(&self, header: CommandHeader) {
        self.queue_bytes(&header.to_bytes());
    }

    /// Number of queued bytes not yet read.
    pub fn pending(&self) -> usize {
        self.inbound.lock().unwrap().len()
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// All captured writes joined into one stream.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.write_log.lock().unwrap().concat()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Simulate device disconnect.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbTransport for MockTransport {
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }

    fn read_exact(&self, len: usize) -> Result<Vec<u8>, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        let mut inbound = self.inbound.lock().unwrap();
        if inbound.len() < len {
            return Err(TransportError::Disconnected);
        }
        Ok(inbound.drain(..len).collect())
    }

    fn vendor_id(&self) -> u16 {
        NINTENDO_VENDOR_ID
    }

    fn product_id(&self) -> u16 {
        SWITCH_PRODUCT_ID
    }
}
