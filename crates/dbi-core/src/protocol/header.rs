//! Command header framing for the DBI0 protocol.
//!
//! Every exchange (request, response or ACK) starts with the same 16-byte header:
//!
//! ```text
//! +---------+---------+---------+---------+
//! |  magic  |  type   |   id    |  size   |
//! | "DBI0"  | u32 LE  | u32 LE  | u32 LE  |
//! +---------+---------+---------+---------+
//! ```

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use thiserror::Error;

use super::constants::{HEADER_SIZE, MAGIC};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
    #[error("Invalid magic: expected {expected:02X?}, got {actual:02X?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },
}

/// Command type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Request,
    Response,
    Ack,
    /// Any value the protocol does not define.
    Unknown(u32),
}

impl From<u32> for CommandType {
    fn from(value: u32) -> Self {
        match value {
            0 => CommandType::Request,
            1 => CommandType::Response,
            2 => CommandType::Ack,
            other => CommandType::Unknown(other),
        }
    }
}

impl From<CommandType> for u32 {
    fn from(value: CommandType) -> Self {
        match value {
            CommandType::Request => 0,
            CommandType::Response => 1,
            CommandType::Ack => 2,
            CommandType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::Request => write!(f, "REQUEST"),
            CommandType::Response => write!(f, "RESPONSE"),
            CommandType::Ack => write!(f, "ACK"),
            CommandType::Unknown(v) => write!(f, "UNKNOWN({})", v),
        }
    }
}

/// Command id field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Exit,
    /// Old listing command. Current DBI builds use `List`; the host treats it as unknown.
    ListDeprecated,
    FileRange,
    List,
    Unknown(u32),
}

impl From<u32> for CommandId {
    fn from(value: u32) -> Self {
        match value {
            0 => CommandId::Exit,
            1 => CommandId::ListDeprecated,
            2 => CommandId::FileRange,
            3 => CommandId::List,
            other => CommandId::Unknown(other),
        }
    }
}

impl From<CommandId> for u32 {
    fn from(value: CommandId) -> Self {
        match value {
            CommandId::Exit => 0,
            CommandId::ListDeprecated => 1,
            CommandId::FileRange => 2,
            CommandId::List => 3,
            CommandId::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandId::Exit => write!(f, "EXIT"),
            CommandId::ListDeprecated => write!(f, "LIST_DEPRECATED"),
            CommandId::FileRange => write!(f, "FILE_RANGE"),
            CommandId::List => write!(f, "LIST"),
            CommandId::Unknown(v) => write!(f, "UNKNOWN({})", v),
        }
    }
}

/// DBI0 command header (16 bytes).
///
/// The meaning of `size` depends on the command: payload length of a request,
/// announced byte count of a response, or echoed request length in an ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub cmd_type: CommandType,
    pub cmd_id: CommandId,
    pub size: u32,
}

impl CommandHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub fn new(cmd_type: CommandType, cmd_id: CommandId, size: u32) -> Self {
        Self {
            cmd_type,
            cmd_id,
            size,
        }
    }

    pub fn response(cmd_id: CommandId, size: u32) -> Self {
        Self::new(CommandType::Response, cmd_id, size)
    }

    pub fn ack(cmd_id: CommandId, size: u32) -> Self {
        Self::new(CommandType::Ack, cmd_id, size)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..4].copy_from_slice(&MAGIC);
        LittleEndian::write_u32(&mut buf[4..8], self.cmd_type.into());
        LittleEndian::write_u32(&mut buf[8..12], self.cmd_id.into());
        LittleEndian::write_u32(&mut buf[12..16], self.size);
        buf
    }

    /// Parse a header. `InvalidMagic` means the block is not a header at all
    /// and is recoverable; the magic itself is not kept.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() < Self::SIZE {
            return Err(HeaderError::BufferTooSmall {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        if data[..4] != MAGIC {
            let mut actual = [0u8; 4];
            actual.copy_from_slice(&data[..4]);
            return Err(HeaderError::InvalidMagic {
                expected: MAGIC,
                actual,
            });
        }
        Ok(Self {
            cmd_type: LittleEndian::read_u32(&data[4..8]).into(),
            cmd_id: LittleEndian::read_u32(&data[8..12]).into(),
            size: LittleEndian::read_u32(&data[12..16]),
        })
    }
}

impl fmt::Display for CommandHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} size={}", self.cmd_type, self.cmd_id, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let cases = [
            (CommandType::Request, CommandId::Exit, 0),
            (CommandType::Response, CommandId::List, 12),
            (CommandType::Ack, CommandId::FileRange, u32::MAX),
            (CommandType::Request, CommandId::ListDeprecated, 7),
            (CommandType::Unknown(9), CommandId::Unknown(99), 1),
        ];
        for (t, i, s) in cases {
            let bytes = CommandHeader::new(t, i, s).to_bytes();
            assert_eq!(bytes.len(), CommandHeader::SIZE);

            let parsed = CommandHeader::from_bytes(&bytes).unwrap();
            assert_eq!((parsed.cmd_type, parsed.cmd_id, parsed.size), (t, i, s));
        }
    }

    #[test]
    fn test_header_wire_layout() {
        let bytes = CommandHeader::response(CommandId::FileRange, 0x0102_0304).to_bytes();
        assert_eq!(
            bytes,
            [
                b'D', b'B', b'I', b'0', 1, 0, 0, 0, 2, 0, 0, 0, 0x04, 0x03, 0x02, 0x01
            ]
        );
    }

    #[test]
    fn test_non_magic_is_not_a_header() {
        for fill in [0x00u8, 0xFF, b'D'] {
            let data = [fill; 16];
            assert!(matches!(
                CommandHeader::from_bytes(&data),
                Err(HeaderError::InvalidMagic { .. })
            ));
        }

        let mut almost = CommandHeader::ack(CommandId::List, 0).to_bytes();
        almost[3] = b'1';
        assert!(matches!(
            CommandHeader::from_bytes(&almost),
            Err(HeaderError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(
            CommandHeader::from_bytes(b"DBI0"),
            Err(HeaderError::BufferTooSmall {
                expected: 16,
                actual: 4
            })
        );
    }

    #[test]
    fn test_unknown_values_survive_decoding() {
        let mut bytes = CommandHeader::new(CommandType::Request, CommandId::Exit, 0).to_bytes();
        bytes[8] = 99;
        let parsed = CommandHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.cmd_id, CommandId::Unknown(99));
        assert_eq!(u32::from(parsed.cmd_id), 99);
    }
}
