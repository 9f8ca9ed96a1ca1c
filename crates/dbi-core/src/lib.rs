//! DBI-Core: host side of the DBI0 USB install protocol in Rust.
//!
//! The Switch homebrew installer DBI pulls NSP/NSZ/XCI images from a PC over
//! USB. This crate implements the PC end: it lists a local game library and
//! streams byte ranges of the selected image on request.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Constants, 16-byte command header, range request payload
//! - **Transport**: USB communication abstraction (nusb, mock)
//! - **Catalog**: Library walk and name resolution for LIST / FILE_RANGE
//! - **State**: Dispatch states and per-command handlers
//! - **Dispatcher**: The read-dispatch-respond loop
//! - **Events**: Observer pattern for log decoupling
//! - **Session**: Device polling and top-level orchestration
//!
//! # Example
//!
//! ```no_run
//! use dbi_core::session::{DbiSession, SessionConfig};
//!
//! let session = DbiSession::new(SessionConfig::new("/path/to/games"));
//! session.run().expect("DBI session failed");
//! ```

pub mod catalog;
pub mod dispatcher;
pub mod events;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use catalog::{Catalog, CatalogEntry, CatalogError, resolve_name};
pub use dispatcher::Dispatcher;
pub use events::{DbiEvent, DbiObserver, LogLevel, NullObserver, SessionEnd, TracingObserver};
pub use protocol::{CommandHeader, CommandId, CommandType, HeaderError, RangeRequest};
pub use session::{DbiSession, SessionConfig};
pub use state::handlers::{RangeTransfer, TransferOutcome};
pub use transport::{MockTransport, NusbTransport, TransportError, UsbTransport};
