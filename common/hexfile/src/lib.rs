pub mod image;
pub mod record;

use std::io;
use thiserror::Error;

/// Value read from unoccupied addresses and used to fill gaps, matching the
/// erased state of an EPROM.
pub const FILL_BYTE: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum HexFileError {
    #[error("Error opening HEX file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("HEX record does not start with ':': {0}")]
    MissingStartCode(String),
    #[error("HEX record contains invalid hex digits: {0}")]
    InvalidHexDigits(String),
    #[error("HEX record too short to hold a header and checksum: {0}")]
    RecordTooShort(String),
    #[error("HEX record declares {declared} data bytes but contains {actual}: {record}")]
    ByteCountMismatch { record: String, declared: usize, actual: usize },
    #[error("HEX record checksum mismatch; expected={expected:02X}, actual={actual:02X}: {record}")]
    ChecksumMismatch { record: String, expected: u8, actual: u8 },
    #[error("Invalid payload length {len} for HEX record type {record_type:02X}: {record}")]
    InvalidPayloadLength { record: String, record_type: u8, len: usize },
    #[error("Unsupported HEX record type {record_type:02X}: {record}")]
    UnsupportedRecordType { record: String, record_type: u8 },
    #[error("HEX record after end-of-file record: {0}")]
    RecordAfterEof(String),
    #[error("HEX file contains overlapping data at address {address:#07X}")]
    OverlappingData { address: u32 },
}

pub type HexFileResult<T> = Result<T, HexFileError>;
