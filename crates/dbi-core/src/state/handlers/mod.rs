//! Command handlers - one per DBI0 command id.
//!
//! This module is split into submodules by functionality:
//! - `control`: EXIT and unserved commands
//! - `list`: LIST (catalog build)
//! - `range`: FILE_RANGE (range transfer)

mod control;
mod list;
mod range;

use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::events::{DbiEvent, DbiObserver, LogLevel, SessionEnd};
use crate::protocol::{CommandHeader, CommandId};
use crate::transport::UsbTransport;

pub use range::{RangeTransfer, TransferOutcome};

use control::{handle_exit, handle_unknown};
use list::handle_list;
use range::handle_file_range;

/// Result of handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// Read the next header.
    Continue,
    /// Stop serving the device.
    Terminate(SessionEnd),
}

/// Handler context containing all resources.
pub struct HandlerContext<'a, T: UsbTransport, O: DbiObserver> {
    pub transport: &'a T,
    pub observer: &'a O,
    /// Library root walked by LIST.
    pub root_dir: &'a Path,
    /// Catalog from the last LIST, if any.
    pub catalog: &'a mut Option<Catalog>,
    /// Largest write while streaming a range.
    pub chunk_size: usize,
}

impl<'a, T: UsbTransport, O: DbiObserver> HandlerContext<'a, T, O> {
    pub(crate) fn emit(&self, event: DbiEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(DbiEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub(crate) fn send_header(&self, header: CommandHeader) -> Result<()> {
        self.transport
            .write(&header.to_bytes())
            .with_context(|| format!("sending {} header", header.cmd_id))?;
        Ok(())
    }

    /// Block until the device sends its ACK. The content is only logged.
    pub(crate) fn read_ack(&self) -> Result<()> {
        let block = self
            .transport
            .read_header_block()
            .context("waiting for ACK")?;
        self.emit(DbiEvent::AckReceived {
            header: CommandHeader::from_bytes(&block).ok(),
        });
        Ok(())
    }
}

/// Route a decoded header to its handler.
pub fn handle_command<T: UsbTransport, O: DbiObserver>(
    header: &CommandHeader,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    match header.cmd_id {
        CommandId::Exit => handle_exit(ctx),
        CommandId::List => handle_list(ctx),
        CommandId::FileRange => handle_file_range(header.size, ctx),
        CommandId::ListDeprecated | CommandId::Unknown(_) => handle_unknown(header.cmd_id, ctx),
    }
}
