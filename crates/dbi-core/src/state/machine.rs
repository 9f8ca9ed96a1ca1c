//! Dispatcher states.

use crate::events::SessionEnd;
use crate::protocol::CommandHeader;

/// State of the command loop.
///
/// `AwaitHeader` → `Dispatch` → `AwaitHeader` for served commands;
/// EXIT and unserved commands end in `Terminated`, any error in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// Blocking on the next 16-byte header.
    #[default]
    AwaitHeader,
    /// A valid header was read and is about to be handled.
    Dispatch(CommandHeader),
    /// No further commands will be read.
    Terminated(SessionEnd),
    /// A step returned an error; the connection is not reusable.
    Failed,
}

impl DispatchState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, DispatchState::Terminated(_))
    }

    /// Whether no further step can make progress.
    pub fn is_final(&self) -> bool {
        matches!(self, DispatchState::Terminated(_) | DispatchState::Failed)
    }
}
