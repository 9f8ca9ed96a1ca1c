//! LIST handler.

use crate::catalog::Catalog;
use crate::events::{DbiEvent, DbiObserver, LogLevel};
use crate::protocol::{CommandHeader, CommandId};
use crate::transport::UsbTransport;
use anyhow::{Context, Result};

use super::{HandleResult, HandlerContext};

/// LIST - build a fresh catalog, announce its size, wait for the ACK,
/// send the names, then make it the active catalog.
pub fn handle_list<T: UsbTransport, O: DbiObserver>(
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    ctx.log(
        LogLevel::Debug,
        format!("Scanning {}", ctx.root_dir.display()),
    );
    let catalog = Catalog::build(ctx.root_dir, ctx.observer)?;
    let payload = catalog.to_list_payload();
    let payload_len =
        u32::try_from(payload.len()).context("list payload does not fit in a DBI0 header")?;

    ctx.emit(DbiEvent::CatalogBuilt {
        entries: catalog.len(),
        payload_len: payload.len(),
    });

    ctx.send_header(CommandHeader::response(CommandId::List, payload_len))?;
    ctx.read_ack()?;
    ctx.transport
        .write(&payload)
        .context("sending list payload")?;

    *ctx.catalog = Some(catalog);
    Ok(HandleResult::Continue)
}
