//! Minimal reader for the protobuf wire format.

use bytes::Buf;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireError {
    #[error("unexpected end of buffer")]
    Truncated,
    #[error("varint longer than 10 bytes")]
    VarintOverflow,
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),
    #[error("unsupported wire type {0}")]
    InvalidWireType(u8),
    #[error("field {field} has wire type {found}, expected {expected}")]
    UnexpectedWireType { field: u32, found: u8, expected: u8 },
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("place record without a travel code")]
    MissingCode,
}

pub(crate) type WireResult<T> = Result<T, WireError>;

const VARINT: u8 = 0;
const FIXED64: u8 = 1;
const LENGTH_DELIMITED: u8 = 2;
const FIXED32: u8 = 5;

/// A single field value, borrowed from the underlying buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> Value<'a> {
    fn wire_type(self) -> u8 {
        match self {
            Self::Varint(_) => VARINT,
            Self::Fixed64(_) => FIXED64,
            Self::Bytes(_) => LENGTH_DELIMITED,
            Self::Fixed32(_) => FIXED32,
        }
    }

    fn mismatch(self, field: u32, expected: u8) -> WireError {
        WireError::UnexpectedWireType {
            field,
            found: self.wire_type(),
            expected,
        }
    }

    pub(crate) fn varint(self, field: u32) -> WireResult<u64> {
        match self {
            Self::Varint(v) => Ok(v),
            other => Err(other.mismatch(field, VARINT)),
        }
    }

    pub(crate) fn double(self, field: u32) -> WireResult<f64> {
        match self {
            Self::Fixed64(bits) => Ok(f64::from_bits(bits)),
            other => Err(other.mismatch(field, FIXED64)),
        }
    }

    pub(crate) fn bytes(self, field: u32) -> WireResult<&'a [u8]> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            other => Err(other.mismatch(field, LENGTH_DELIMITED)),
        }
    }

    pub(crate) fn string(self, field: u32) -> WireResult<&'a str> {
        std::str::from_utf8(self.bytes(field)?).map_err(|_| WireError::InvalidUtf8)
    }
}

/// Walks the `(field number, value)` pairs of one message.
#[derive(Debug, Clone)]
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn read_varint(&mut self) -> WireResult<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            if !self.buf.has_remaining() {
                return Err(WireError::Truncated);
            }
            let byte = self.buf.get_u8();
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::VarintOverflow)
    }

    fn take(&mut self, len: usize) -> WireResult<&'a [u8]> {
        if self.buf.len() < len {
            return Err(WireError::Truncated);
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Next field of the message, `None` once the buffer is exhausted.
    pub(crate) fn next_field(&mut self) -> WireResult<Option<(u32, Value<'a>)>> {
        if !self.buf.has_remaining() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let field = u32::try_from(key >> 3)
            .ok()
            .filter(|&n| n != 0)
            .ok_or(WireError::InvalidFieldNumber(key >> 3))?;

        let value = match (key & 0x7) as u8 {
            VARINT => Value::Varint(self.read_varint()?),
            FIXED64 => {
                if self.buf.remaining() < 8 {
                    return Err(WireError::Truncated);
                }
                Value::Fixed64(self.buf.get_u64_le())
            }
            LENGTH_DELIMITED => {
                let len = usize::try_from(self.read_varint()?).map_err(|_| WireError::Truncated)?;
                Value::Bytes(self.take(len)?)
            }
            FIXED32 => {
                if self.buf.remaining() < 4 {
                    return Err(WireError::Truncated);
                }
                Value::Fixed32(self.buf.get_u32_le())
            }
            other => return Err(WireError::InvalidWireType(other)),
        };
        Ok(Some((field, value)))
    }
}


#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_reads_each_wire_type() {
        let mut buf = BytesMut::new();
        encode::uint(&mut buf, 1, 300);
        encode::double(&mut buf, 2, 1.5);
        encode::bytes(&mut buf, 3, b"nce");
        encode::key(&mut buf, 4, 5);
        buf.extend_from_slice(&7u32.to_le_bytes());

        let mut reader = FieldReader::new(&buf);
        assert_eq!(reader.next_field().unwrap(), Some((1, Value::Varint(300))));
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!((field, value.double(field).unwrap()), (2, 1.5));
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!(value.string(field).unwrap(), "nce");
        assert_eq!(reader.next_field().unwrap(), Some((4, Value::Fixed32(7))));
        assert_eq!(reader.next_field().unwrap(), None);
    }

    #[test]
    fn test_truncated_length_delimited() {
        let mut buf = BytesMut::new();
        encode::bytes(&mut buf, 1, b"sfo");
        buf.truncate(buf.len() - 1);
        assert_eq!(
            FieldReader::new(&buf).next_field(),
            Err(WireError::Truncated)
        );
    }

    #[test]
    fn test_group_wire_type_is_rejected() {
        let buf = [0x0b];
        assert_eq!(
            FieldReader::new(&buf).next_field(),
            Err(WireError::InvalidWireType(3))
        );
    }

    #[test]
    fn test_field_zero_is_rejected() {
        let buf = [0x00, 0x01];
        assert_eq!(
            FieldReader::new(&buf).next_field(),
            Err(WireError::InvalidFieldNumber(0))
        );
    }

    #[test]
    fn test_overlong_varint() {
        let buf = [0xff; 11];
        assert_eq!(
            FieldReader::new(&buf).next_field(),
            Err(WireError::VarintOverflow)
        );
    }

    #[test]
    fn test_wire_type_mismatch() {
        let value = Value::Varint(1);
        assert_eq!(
            value.bytes(3),
            Err(WireError::UnexpectedWireType {
                field: 3,
                found: 0,
                expected: 2
            })
        );
    }
}
