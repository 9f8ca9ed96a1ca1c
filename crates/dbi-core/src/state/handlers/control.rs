//! Control flow handlers (exit, unserved commands).

use crate::events::{DbiEvent, DbiObserver, SessionEnd};
use crate::protocol::{CommandHeader, CommandId};
use crate::transport::UsbTransport;
use anyhow::Result;

use super::{HandleResult, HandlerContext};

/// EXIT - acknowledge with an empty response and stop.
pub fn handle_exit<T: UsbTransport, O: DbiObserver>(
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    ctx.send_header(CommandHeader::response(CommandId::Exit, 0))?;
    Ok(HandleResult::Terminate(SessionEnd::Exit))
}

/// Anything the host does not serve shuts the session down like EXIT.
pub fn handle_unknown<T: UsbTransport, O: DbiObserver>(
    id: CommandId,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    ctx.emit(DbiEvent::UnknownCommand { id });
    ctx.send_header(CommandHeader::response(CommandId::Exit, 0))?;
    Ok(HandleResult::Terminate(SessionEnd::UnknownCommand(id)))
}
