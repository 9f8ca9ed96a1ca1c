//! Command loop: read a header, route it, repeat until EXIT.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::instrument;

use crate::catalog::Catalog;
use crate::events::{DbiEvent, DbiObserver, SessionEnd};
use crate::protocol::{BUFFER_SEGMENT_DATA_SIZE, CommandHeader, HeaderError};
use crate::state::{DispatchState, HandleResult, HandlerContext, handle_command};
use crate::transport::UsbTransport;

/// Serves DBI0 commands from one connected device.
///
/// Owns the catalog built by the last LIST; FILE_RANGE resolves names
/// against it read-only.
pub struct Dispatcher<'a, T: UsbTransport, O: DbiObserver> {
    transport: &'a T,
    observer: &'a O,
    root_dir: PathBuf,
    catalog: Option<Catalog>,
    chunk_size: usize,
    state: DispatchState,
}

impl<'a, T: UsbTransport, O: DbiObserver> Dispatcher<'a, T, O> {
    pub fn new(transport: &'a T, observer: &'a O, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            observer,
            root_dir: root_dir.into(),
            catalog: None,
            chunk_size: BUFFER_SEGMENT_DATA_SIZE,
            state: DispatchState::default(),
        }
    }

    /// Override the streaming chunk size (1 MiB by default).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Catalog from the most recent LIST.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Perform one state transition and return the new state.
    ///
    /// An error leaves the dispatcher in `Failed`; later calls error again
    /// instead of replaying the command that failed.
    pub fn step(&mut self) -> Result<DispatchState> {
        match self.advance() {
            Ok(next) => {
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                self.state = DispatchState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<DispatchState> {
        let next = match self.state {
            DispatchState::AwaitHeader => {
                let block = self
                    .transport
                    .read_header_block()
                    .context("reading command header")?;
                match CommandHeader::from_bytes(&block) {
                    Ok(header) => {
                        self.observer
                            .on_event(&DbiEvent::CommandReceived { header });
                        DispatchState::Dispatch(header)
                    }
                    // Resync at header granularity only.
                    Err(HeaderError::InvalidMagic { .. }) => {
                        self.observer
                            .on_event(&DbiEvent::HeaderSkipped { bytes: block });
                        DispatchState::AwaitHeader
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            DispatchState::Dispatch(header) => {
                let mut ctx = HandlerContext {
                    transport: self.transport,
                    observer: self.observer,
                    root_dir: &self.root_dir,
                    catalog: &mut self.catalog,
                    chunk_size: self.chunk_size,
                };
                match handle_command(&header, &mut ctx)
                    .with_context(|| format!("handling {}", header.cmd_id))?
                {
                    HandleResult::Continue => DispatchState::AwaitHeader,
                    HandleResult::Terminate(end) => DispatchState::Terminated(end),
                }
            }
            terminated @ DispatchState::Terminated(_) => terminated,
            DispatchState::Failed => bail!("dispatcher stopped after an earlier error"),
        };
        Ok(next)
    }

    /// Serve commands until the device exits or the transport fails.
    #[instrument(skip(self), fields(root = %self.root_dir.display()))]
    pub fn run(&mut self) -> Result<SessionEnd> {
        self.observer.on_event(&DbiEvent::CommandLoopStarted);
        loop {
            if let DispatchState::Terminated(end) = self.step()? {
                self.observer.on_event(&DbiEvent::Finished { reason: end });
                return Ok(end);
            }
        }
    }
}
