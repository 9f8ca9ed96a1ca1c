//! DBI0 protocol constants.

/// Magic tag opening every command header: 'DBI0'.
pub const MAGIC: [u8; 4] = *b"DBI0";

/// Fixed size of a command header on the wire.
pub const HEADER_SIZE: usize = 16;

/// Largest chunk written to the device while streaming a file range (1 MiB).
pub const BUFFER_SEGMENT_DATA_SIZE: usize = 0x100000;

/// Fixed part of a FILE_RANGE request payload: size (4) + offset (8) + name length (4).
pub const RANGE_REQUEST_FIXED_SIZE: usize = 16;

/// File extensions (lowercase) offered in the LIST response.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["nsp", "nsz", "xci"];

pub const NINTENDO_VENDOR_ID: u16 = 0x057E;
pub const SWITCH_PRODUCT_ID: u16 = 0x3000;

/// Interface claimed on the Switch.
pub const DBI_INTERFACE: u8 = 0;

/// Delay between device polls while waiting for the Switch.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
