//! FILE_RANGE request payload.
//!
//! ```text
//! +------------+--------------+----------+------------------------+
//! | range_size | range_offset | name_len | name (UTF-8)           |
//! |   u32 LE   |    u64 LE    |  u32 LE  | rest of the payload    |
//! +------------+--------------+----------+------------------------+
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

use super::constants::RANGE_REQUEST_FIXED_SIZE;

#[derive(Error, Debug)]
pub enum RangeRequestError {
    #[error("Range request too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("Range request name is not valid UTF-8: {0}")]
    InvalidName(#[from] std::string::FromUtf8Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte range of an image requested by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub range_size: u32,
    pub range_offset: u64,
    /// Declared name length. Informational only: the name is always the
    /// remainder of the payload.
    pub name_len: u32,
    pub name: String,
}

impl RangeRequest {
    pub fn from_bytes(data: &[u8]) -> Result<Self, RangeRequestError> {
        if data.len() < RANGE_REQUEST_FIXED_SIZE {
            return Err(RangeRequestError::TooShort {
                expected: RANGE_REQUEST_FIXED_SIZE,
                actual: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let range_size = cursor.read_u32::<LittleEndian>()?;
        let range_offset = cursor.read_u64::<LittleEndian>()?;
        let name_len = cursor.read_u32::<LittleEndian>()?;
        let name = String::from_utf8(data[RANGE_REQUEST_FIXED_SIZE..].to_vec())?;

        Ok(Self {
            range_size,
            range_offset,
            name_len,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn payload(size: u32, offset: u64, name_len: u32, name: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(size).unwrap();
        buf.write_u64::<LittleEndian>(offset).unwrap();
        buf.write_u32::<LittleEndian>(name_len).unwrap();
        buf.extend_from_slice(name);
        buf
    }

    #[test]
    fn test_parse_range_request() {
        let data = payload(0x10_0000, 0x1_0000_0000, 8, b"game.nsp");
        let req = RangeRequest::from_bytes(&data).unwrap();
        assert_eq!(req.range_size, 0x10_0000);
        assert_eq!(req.range_offset, 0x1_0000_0000);
        assert_eq!(req.name_len, 8);
        assert_eq!(req.name, "game.nsp");
    }

    #[test]
    fn test_name_len_does_not_bound_name() {
        let data = payload(4, 2, 3, "Zelda – BotW.xci".as_bytes());
        let req = RangeRequest::from_bytes(&data).unwrap();
        assert_eq!(req.name_len, 3);
        assert_eq!(req.name, "Zelda – BotW.xci");
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let err = RangeRequest::from_bytes(&[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            RangeRequestError::TooShort {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_name() {
        let data = payload(1, 0, 2, &[0xC3, 0x28]);
        assert!(matches!(
            RangeRequest::from_bytes(&data),
            Err(RangeRequestError::InvalidName(_))
        ));
    }
}
