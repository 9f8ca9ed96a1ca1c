//! Protocol module - DBI0 wire format definitions.

pub mod constants;
pub mod header;
pub mod range;

pub use constants::*;
pub use header::{CommandHeader, CommandId, CommandType, HeaderError};
pub use range::{RangeRequest, RangeRequestError};
