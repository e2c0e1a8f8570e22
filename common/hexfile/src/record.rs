//! Parsing for individual Intel HEX records

use crate::{HexFileError, HexFileResult};
use std::str::FromStr;

/// A single Intel HEX record, one `:`-prefixed line of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Type 00: data bytes at a 16-bit offset within the current address base
    Data { address: u16, data: Vec<u8> },
    /// Type 01: terminates the file
    EndOfFile,
    /// Type 02: sets the address base to a 16-bit segment value shifted left 4 bits
    ExtendedSegmentAddress(u16),
    /// Type 03: initial CS:IP register values
    StartSegmentAddress { cs: u16, ip: u16 },
    /// Type 04: sets the upper 16 bits of subsequent data record addresses
    ExtendedLinearAddress(u16),
    /// Type 05: 32-bit execution start address
    StartLinearAddress(u32),
}

impl FromStr for Record {
    type Err = HexFileError;

    fn from_str(line: &str) -> HexFileResult<Self> {
        let Some(digits) = line.strip_prefix(':') else {
            return Err(HexFileError::MissingStartCode(line.into()));
        };

        let bytes =
            decode_hex(digits).ok_or_else(|| HexFileError::InvalidHexDigits(line.into()))?;

        // Byte count + 2 address bytes + record type + checksum
        if bytes.len() < 5 {
            return Err(HexFileError::RecordTooShort(line.into()));
        }

        let declared = bytes[0] as usize;
        let payload = &bytes[4..bytes.len() - 1];
        if payload.len() != declared {
            return Err(HexFileError::ByteCountMismatch {
                record: line.into(),
                declared,
                actual: payload.len(),
            });
        }

        // The checksum byte is the two's complement of the sum of every byte
        // before it, so summing the whole record must wrap to zero
        let sum = bytes.iter().fold(0_u8, |sum, &b| sum.wrapping_add(b));
        if sum != 0 {
            let actual = bytes[bytes.len() - 1];
            return Err(HexFileError::ChecksumMismatch {
                record: line.into(),
                expected: actual.wrapping_sub(sum),
                actual,
            });
        }

        let address = u16::from_be_bytes([bytes[1], bytes[2]]);
        let record_type = bytes[3];
        match record_type {
            0x00 => Ok(Self::Data { address, data: payload.into() }),
            0x01 => {
                check_payload_len(line, record_type, payload, 0)?;
                Ok(Self::EndOfFile)
            }
            0x02 => {
                check_payload_len(line, record_type, payload, 2)?;
                Ok(Self::ExtendedSegmentAddress(u16::from_be_bytes([payload[0], payload[1]])))
            }
            0x03 => {
                check_payload_len(line, record_type, payload, 4)?;
                Ok(Self::StartSegmentAddress {
                    cs: u16::from_be_bytes([payload[0], payload[1]]),
                    ip: u16::from_be_bytes([payload[2], payload[3]]),
                })
            }
            0x04 => {
                check_payload_len(line, record_type, payload, 2)?;
                Ok(Self::ExtendedLinearAddress(u16::from_be_bytes([payload[0], payload[1]])))
            }
            0x05 => {
                check_payload_len(line, record_type, payload, 4)?;
                Ok(Self::StartLinearAddress(u32::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ])))
            }
            _ => Err(HexFileError::UnsupportedRecordType { record: line.into(), record_type }),
        }
    }
}

fn check_payload_len(
    line: &str,
    record_type: u8,
    payload: &[u8],
    expected: usize,
) -> HexFileResult<()> {
    if payload.len() != expected {
        return Err(HexFileError::InvalidPayloadLength {
            record: line.into(),
            record_type,
            len: payload.len(),
        });
    }

    Ok(())
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return None;
    }

    digits
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_record() {
        let record: Record = ":0B0010006164647265737320676170A7".parse().unwrap();
        assert_eq!(record, Record::Data { address: 0x0010, data: b"address gap".to_vec() });
    }

    #[test]
    fn end_of_file_record() {
        let record: Record = ":00000001FF".parse().unwrap();
        assert_eq!(record, Record::EndOfFile);
    }

    #[test]
    fn extended_segment_address_record() {
        let record: Record = ":020000021200EA".parse().unwrap();
        assert_eq!(record, Record::ExtendedSegmentAddress(0x1200));
    }

    #[test]
    fn start_segment_address_record() {
        let record: Record = ":0400000300003800C1".parse().unwrap();
        assert_eq!(record, Record::StartSegmentAddress { cs: 0x0000, ip: 0x3800 });
    }

    #[test]
    fn extended_linear_address_record() {
        let record: Record = ":020000040800F2".parse().unwrap();
        assert_eq!(record, Record::ExtendedLinearAddress(0x0800));
    }

    #[test]
    fn start_linear_address_record() {
        let record: Record = ":04000005000000CD2A".parse().unwrap();
        assert_eq!(record, Record::StartLinearAddress(0x000000CD));
    }

    #[test]
    fn missing_start_code() {
        let err = "00000001FF".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::MissingStartCode(_)));
    }

    #[test]
    fn invalid_hex_digits() {
        let err = ":0000000G".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::InvalidHexDigits(_)));

        // Odd number of digits
        let err = ":00000001F".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::InvalidHexDigits(_)));
    }

    #[test]
    fn record_too_short() {
        let err = ":000001FF".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::RecordTooShort(_)));
    }

    #[test]
    fn byte_count_mismatch() {
        let err = ":02000001FD".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::ByteCountMismatch { declared: 2, actual: 0, .. }));
    }

    #[test]
    fn checksum_mismatch() {
        let err = ":0B0010006164647265737320676170A8".parse::<Record>().unwrap_err();
        assert!(matches!(
            err,
            HexFileError::ChecksumMismatch { expected: 0xA7, actual: 0xA8, .. }
        ));
    }

    #[test]
    fn invalid_payload_length() {
        // End-of-file record with a 1-byte payload; 01 00 00 01 12 sums to 0x14
        let err = ":0100000112EC".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::InvalidPayloadLength { record_type: 0x01, len: 1, .. }));
    }

    #[test]
    fn unsupported_record_type() {
        let err = ":00000006FA".parse::<Record>().unwrap_err();
        assert!(matches!(err, HexFileError::UnsupportedRecordType { record_type: 0x06, .. }));
    }
}
