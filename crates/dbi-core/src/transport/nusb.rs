//! nusb-based USB transport implementation.

use nusb::io::{EndpointRead, EndpointWrite};
use nusb::transfer::{Bulk, In, Out};
use nusb::{MaybeFuture, list_devices};
use std::io::{Read, Write};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use super::traits::{TransportError, UsbTransport};
use crate::protocol::constants::DBI_INTERFACE;

/// Transfer size used for the bulk reader.
const READ_BUFFER_SIZE: usize = 4096;
/// Transfer size used for the bulk writer; range chunks are up to 1 MiB.
const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// nusb-based USB transport.
///
/// The endpoint reader/writer are kept for the whole connection so bytes
/// buffered past one `read_exact` are not lost before the next.
pub struct NusbTransport {
    reader: Mutex<EndpointRead<Bulk>>,
    writer: Mutex<EndpointWrite<Bulk>>,
    vid: u16,
    pid: u16,
}

impl NusbTransport {
    /// Open a device with specific VID/PID.
    #[instrument(level = "debug", fields(vid = format!("{:04X}", vid), pid = format!("{:04X}", pid)))]
    pub fn open_with_ids(vid: u16, pid: u16) -> Result<Self, TransportError> {
        let device_info = list_devices()
            .wait()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .find(|d| d.vendor_id() == vid && d.product_id() == pid)
            .ok_or(TransportError::DeviceNotFound { vid, pid })?;

        Self::open_device_info(device_info)
    }

    fn open_device_info(device_info: nusb::DeviceInfo) -> Result<Self, TransportError> {
        let vid = device_info.vendor_id();
        let pid = device_info.product_id();

        info!(
            vendor_id = %format!("{:04X}", vid),
            product_id = %format!("{:04X}", pid),
            "Found device"
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;

        let interface = device.claim_interface(DBI_INTERFACE).wait().map_err(|e| {
            TransportError::ClaimInterfaceFailed {
                interface: DBI_INTERFACE,
                message: e.to_string(),
            }
        })?;

        // Find BULK endpoints
        let mut in_endpoint: u8 = 0;
        let mut out_endpoint: u8 = 0;

        for config in device.configurations() {
            for iface in config.interfaces() {
                if iface.interface_number() != DBI_INTERFACE {
                    continue;
                }
                for alt in iface.alt_settings() {
                    for ep in alt.endpoints() {
                        if ep.transfer_type() != nusb::descriptors::TransferType::Bulk {
                            continue;
                        }
                        if ep.direction() == nusb::transfer::Direction::In {
                            if in_endpoint == 0 {
                                in_endpoint = ep.address();
                            }
                        } else if out_endpoint == 0 {
                            out_endpoint = ep.address();
                        }
                    }
                }
            }
        }

        if in_endpoint == 0 {
            return Err(TransportError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "In".into(),
            });
        }
        if out_endpoint == 0 {
            return Err(TransportError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "Out".into(),
            });
        }

        let reader = interface
            .endpoint::<Bulk, In>(in_endpoint)
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .reader(READ_BUFFER_SIZE);
        let writer = interface
            .endpoint::<Bulk, Out>(out_endpoint)
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .writer(WRITE_BUFFER_SIZE);

        info!(
            in_ep = %format!("0x{:02X}", in_endpoint),
            out_ep = %format!("0x{:02X}", out_endpoint),
            "Device opened successfully"
        );

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            vid,
            pid,
        })
    }
}

impl UsbTransport for NusbTransport {
    #[instrument(level = "trace", skip(self, data), fields(len = data.len()))]
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TransportError::WriteFailed("writer lock poisoned".into()))?;

        writer
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    #[instrument(level = "trace", skip(self))]
    fn read_exact(&self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| TransportError::ReadFailed("reader lock poisoned".into()))?;

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::Disconnected,
            _ => TransportError::ReadFailed(e.to_string()),
        })?;

        debug!(bytes_read = len, "Read complete");
        Ok(buf)
    }

    fn vendor_id(&self) -> u16 {
        self.vid
    }

    fn product_id(&self) -> u16 {
        self.pid
    }
}
