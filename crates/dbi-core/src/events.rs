//! Event system for log decoupling.
//!
//! The protocol engine reports what it does through a `DbiObserver`
//! handed to it at construction, instead of writing to a global logger.

use std::fmt;
use std::path::PathBuf;

use crate::protocol::{CommandHeader, CommandId};

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
}

/// Why a dispatcher session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Device sent EXIT.
    Exit,
    /// Device sent a command the host does not serve; handled like EXIT.
    UnknownCommand(CommandId),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Exit => write!(f, "exit requested"),
            SessionEnd::UnknownCommand(id) => write!(f, "unknown command {}", id),
        }
    }
}

/// Events emitted while serving the device.
#[derive(Debug, Clone)]
pub enum DbiEvent {
    /// Device connected.
    DeviceConnected { vid: u16, pid: u16 },
    /// Still waiting for the device to show up.
    WaitingForDevice,
    /// Dispatch loop started.
    CommandLoopStarted,
    /// A valid header was read.
    CommandReceived { header: CommandHeader },
    /// 16 bytes without the magic were discarded.
    HeaderSkipped { bytes: Vec<u8> },
    /// Handshake ACK read from the device.
    AckReceived { header: Option<CommandHeader> },
    /// LIST served with a freshly built catalog.
    CatalogBuilt { entries: usize, payload_len: usize },
    /// FILE_RANGE request parsed and resolved.
    RangeRequested {
        name: String,
        path: PathBuf,
        offset: u64,
        size: u32,
        name_len: u32,
    },
    /// Progress of the current range transfer.
    Progress { current: u64, total: u64 },
    /// Local file ended before the requested range was satisfied.
    TransferTruncated { path: PathBuf, sent: u64, requested: u64 },
    /// Command id the host does not serve.
    UnknownCommand { id: CommandId },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// USB Packet sent/received.
    Packet {
        direction: PacketDirection,
        length: usize,
        /// First bytes of the packet.
        head: Vec<u8>,
    },
    /// Session finished.
    Finished { reason: SessionEnd },
}

/// USB packet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Transmit (Host -> Device)
    Rx, // Receive (Device -> Host)
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving DBI events.
pub trait DbiObserver {
    /// Called when an event occurs.
    fn on_event(&self, event: &DbiEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl DbiObserver for NullObserver {
    fn on_event(&self, _event: &DbiEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl DbiObserver for TracingObserver {
    fn on_event(&self, event: &DbiEvent) {
        match event {
            DbiEvent::DeviceConnected { vid, pid } => {
                tracing::info!(vid = %format!("{:04X}", vid), pid = %format!("{:04X}", pid), "Device connected");
            }
            DbiEvent::WaitingForDevice => {
                tracing::info!("Waiting for switch");
            }
            DbiEvent::CommandLoopStarted => {
                tracing::info!("Entering command loop");
            }
            DbiEvent::CommandReceived { header } => {
                tracing::debug!(
                    cmd_type = %header.cmd_type,
                    cmd_id = %header.cmd_id,
                    data_size = header.size,
                    "Command header"
                );
            }
            DbiEvent::HeaderSkipped { bytes } => {
                tracing::warn!(bytes = ?bytes, "Skipping block without DBI0 magic");
            }
            DbiEvent::AckReceived { header } => match header {
                Some(h) => tracing::debug!(
                    cmd_type = %h.cmd_type,
                    cmd_id = %h.cmd_id,
                    data_size = h.size,
                    "Ack"
                ),
                None => tracing::debug!("Ack (no DBI0 magic)"),
            },
            DbiEvent::CatalogBuilt {
                entries,
                payload_len,
            } => {
                tracing::info!(entries, payload_len, "Get list");
            }
            DbiEvent::RangeRequested {
                name,
                path,
                offset,
                size,
                name_len,
            } => {
                tracing::info!(
                    range_size = size,
                    range_offset = offset,
                    name_len,
                    name = %name,
                    path = %path.display(),
                    "File range"
                );
            }
            DbiEvent::Progress { current, total } => {
                let pct = if *total > 0 {
                    (*current * 100) / *total
                } else {
                    0
                };
                tracing::trace!(current, total, progress = %format!("{}%", pct), "Progress");
            }
            DbiEvent::TransferTruncated {
                path,
                sent,
                requested,
            } => {
                tracing::warn!(
                    path = %path.display(),
                    sent,
                    requested,
                    "Unexpected EOF reached before reading complete range"
                );
            }
            DbiEvent::UnknownCommand { id } => {
                tracing::warn!(cmd_id = %id, "Unknown command id");
            }
            DbiEvent::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
            },
            DbiEvent::Packet {
                direction,
                length,
                head,
            } => {
                tracing::trace!(dir = %direction, len = length, head = ?head, "USB Packet");
            }
            DbiEvent::Finished { reason } => {
                tracing::info!(reason = %reason, "Exit");
            }
        }
    }
}

/// Observer that keeps every event, for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: std::sync::Mutex<Vec<DbiEvent>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<DbiEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl DbiObserver for RecordingObserver {
    fn on_event(&self, event: &DbiEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
