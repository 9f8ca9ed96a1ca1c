//! USB Transport layer abstraction.
//!
//! Defines the `UsbTransport` trait the protocol engine talks to,
//! allowing different implementations (nusb, mock, etc.).

use crate::protocol::HEADER_SIZE;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: VID={vid:04X} PID={pid:04X}")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("Endpoint not found: type={ep_type}, direction={direction}")]
    EndpointNotFound { ep_type: String, direction: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Device disconnected")]
    Disconnected,
}

/// Blocking byte channel to the device.
///
/// Reads and writes wait indefinitely; the protocol relies on this for its
/// ACK handshakes. A failed call ends the session.
pub trait UsbTransport {
    /// Write all of `data` to the OUT endpoint.
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read exactly `len` bytes from the IN endpoint.
    fn read_exact(&self, len: usize) -> Result<Vec<u8>, TransportError>;

    /// Read one header-sized block.
    fn read_header_block(&self) -> Result<Vec<u8>, TransportError> {
        self.read_exact(HEADER_SIZE)
    }

    /// Get the current VID.
    fn vendor_id(&self) -> u16;

    /// Get the current PID.
    fn product_id(&self) -> u16;
}
