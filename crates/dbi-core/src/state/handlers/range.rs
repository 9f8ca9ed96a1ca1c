//! FILE_RANGE handler and range streaming.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::{Catalog, resolve_name};
use crate::events::{DbiEvent, DbiObserver};
use crate::protocol::{CommandHeader, CommandId, RangeRequest};
use crate::transport::UsbTransport;

use super::{HandleResult, HandlerContext};

/// What a range transfer actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Bytes written to the device.
    pub sent: u64,
    /// Bytes announced in the RESPONSE header.
    pub requested: u64,
    /// Counter left when streaming stopped. It is decremented by the
    /// requested chunk size, so after a short read it under-counts the
    /// bytes still owed (`requested - sent`).
    pub remaining: u64,
    /// Stopped on local EOF before `requested` bytes were sent.
    pub truncated: bool,
}

/// Streams a byte range of a local file to the device in bounded chunks.
pub struct RangeTransfer<'a, T: UsbTransport, O: DbiObserver> {
    transport: &'a T,
    observer: &'a O,
    chunk_size: usize,
}

impl<'a, T: UsbTransport, O: DbiObserver> RangeTransfer<'a, T, O> {
    pub fn new(transport: &'a T, observer: &'a O, chunk_size: usize) -> Self {
        Self {
            transport,
            observer,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Seek `source` to `offset` and send up to `size` bytes.
    ///
    /// Each round asks for `min(chunk_size, remaining)` bytes. A round that
    /// yields nothing, or less than it asked for, means local EOF: what was
    /// read is sent, a warning is emitted and streaming stops. The device just
    /// gets fewer bytes than announced.
    pub fn stream<R: Read + Seek>(
        &self,
        source: &mut R,
        path: &Path,
        offset: u64,
        size: u32,
    ) -> Result<TransferOutcome> {
        source
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("seeking {} to {}", path.display(), offset))?;

        let requested = u64::from(size);
        let mut remaining = requested;
        let mut sent = 0u64;
        let mut truncated = false;
        let mut buf = Vec::with_capacity(self.chunk_size.min(size as usize));

        while remaining > 0 {
            let chunk_size = remaining.min(self.chunk_size as u64);

            buf.clear();
            source
                .by_ref()
                .take(chunk_size)
                .read_to_end(&mut buf)
                .with_context(|| format!("reading {}", path.display()))?;

            if buf.is_empty() {
                truncated = true;
                break;
            }

            self.transport.write(&buf).context("sending range data")?;
            sent += buf.len() as u64;
            remaining -= chunk_size;

            self.observer.on_event(&DbiEvent::Progress {
                current: sent,
                total: requested,
            });

            if (buf.len() as u64) < chunk_size {
                truncated = true;
                break;
            }
        }

        if truncated {
            self.observer.on_event(&DbiEvent::TransferTruncated {
                path: path.to_path_buf(),
                sent,
                requested,
            });
        }

        Ok(TransferOutcome {
            sent,
            requested,
            remaining,
            truncated,
        })
    }
}

/// FILE_RANGE - ACK the request length, read and resolve the request,
/// announce the range size, wait for the ACK, then stream.
pub fn handle_file_range<T: UsbTransport, O: DbiObserver>(
    request_len: u32,
    ctx: &mut HandlerContext<'_, T, O>,
) -> Result<HandleResult> {
    ctx.send_header(CommandHeader::ack(CommandId::FileRange, request_len))?;

    let payload = ctx
        .transport
        .read_exact(request_len as usize)
        .context("reading range request")?;
    let request = RangeRequest::from_bytes(&payload)?;

    let catalog: Option<&Catalog> = ctx.catalog.as_ref();
    let path = resolve_name(catalog, &request.name);

    ctx.emit(DbiEvent::RangeRequested {
        name: request.name.clone(),
        path: path.clone(),
        offset: request.range_offset,
        size: request.range_size,
        name_len: request.name_len,
    });

    ctx.send_header(CommandHeader::response(
        CommandId::FileRange,
        request.range_size,
    ))?;
    ctx.read_ack()?;

    let mut file =
        File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    RangeTransfer::new(ctx.transport, ctx.observer, ctx.chunk_size).stream(
        &mut file,
        &path,
        request.range_offset,
        request.range_size,
    )?;

    Ok(HandleResult::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingObserver;
    use crate::protocol::BUFFER_SEGMENT_DATA_SIZE;
    use crate::transport::MockTransport;
    use std::io::Cursor;

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn truncated_events(observer: &RecordingObserver) -> usize {
        observer
            .events()
            .iter()
            .filter(|e| matches!(e, DbiEvent::TransferTruncated { .. }))
            .count()
    }

    #[test]
    fn test_full_range_in_capped_chunks() {
        let data = content(BUFFER_SEGMENT_DATA_SIZE * 2 + 100);
        let mock = MockTransport::new();
        let observer = RecordingObserver::default();
        let transfer = RangeTransfer::new(&mock, &observer, BUFFER_SEGMENT_DATA_SIZE);

        let size = (BUFFER_SEGMENT_DATA_SIZE * 2 + 50) as u32;
        let outcome = transfer
            .stream(&mut Cursor::new(&data), Path::new("big.nsp"), 40, size)
            .unwrap();

        let writes = mock.get_writes();
        let sizes: Vec<_> = writes.iter().map(Vec::len).collect();
        assert_eq!(
            sizes,
            [BUFFER_SEGMENT_DATA_SIZE, BUFFER_SEGMENT_DATA_SIZE, 50]
        );
        assert_eq!(mock.written_bytes(), &data[40..40 + size as usize]);
        assert_eq!(outcome.sent, u64::from(size));
        assert_eq!(outcome.remaining, 0);
        assert!(!outcome.truncated);
        assert_eq!(truncated_events(&observer), 0);
    }

    #[test]
    fn test_range_past_eof_is_truncated_without_error() {
        let data = content(10);
        let mock = MockTransport::new();
        let observer = RecordingObserver::default();
        let transfer = RangeTransfer::new(&mock, &observer, BUFFER_SEGMENT_DATA_SIZE);

        let outcome = transfer
            .stream(&mut Cursor::new(&data), Path::new("a.nsp"), 8, 4)
            .unwrap();

        assert_eq!(mock.written_bytes(), &data[8..10]);
        assert_eq!(outcome.sent, 2);
        assert!(outcome.truncated);
        assert_eq!(truncated_events(&observer), 1);
    }

    #[test]
    fn test_remaining_is_decremented_by_requested_chunk() {
        // 10-byte file, 4-byte chunks, 16 bytes asked for from offset 0:
        // rounds read 4, 4, then 2 of 4 requested and stop.
        let data = content(10);
        let mock = MockTransport::new();
        let observer = RecordingObserver::default();
        let transfer = RangeTransfer::new(&mock, &observer, 4);

        let outcome = transfer
            .stream(&mut Cursor::new(&data), Path::new("a.nsp"), 0, 16)
            .unwrap();

        let sizes: Vec<_> = mock.get_writes().iter().map(Vec::len).collect();
        assert_eq!(sizes, [4, 4, 2]);
        assert_eq!(outcome.sent, 10);
        assert_eq!(outcome.remaining, 4);
        assert_eq!(outcome.requested - outcome.sent, 6);
        assert!(outcome.truncated);
    }

    #[test]
    fn test_offset_beyond_eof_sends_nothing() {
        let data = content(10);
        let mock = MockTransport::new();
        let observer = RecordingObserver::default();
        let transfer = RangeTransfer::new(&mock, &observer, 4);

        let outcome = transfer
            .stream(&mut Cursor::new(&data), Path::new("a.nsp"), 100, 8)
            .unwrap();

        assert!(mock.get_writes().is_empty());
        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.remaining, 8);
        assert!(outcome.truncated);
        assert_eq!(truncated_events(&observer), 1);
    }

    #[test]
    fn test_zero_size_range() {
        let mock = MockTransport::new();
        let observer = RecordingObserver::default();
        let transfer = RangeTransfer::new(&mock, &observer, 4);

        let outcome = transfer
            .stream(&mut Cursor::new(content(10)), Path::new("a.nsp"), 3, 0)
            .unwrap();

        assert!(mock.get_writes().is_empty());
        assert!(!outcome.truncated);
    }
}
