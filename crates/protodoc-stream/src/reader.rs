//! Binary stream reader.
//!
//! Every element value is located by its length before it is handed out,
//! so each [`ValueReader`] works on its own sub-slice. A value that is
//! dropped unread, or abandoned half way through a nested decode, never
//! desynchronises the enclosing block.

use protodoc_schema::{ScalarKind, ScalarValue};

use crate::{
    ArrayElement, ArrayReader, DocumentElement, DocumentReader, StreamError, ValueReader, WireType,
};

/// Smallest valid block: a length prefix and the terminator.
const MIN_BLOCK_LEN: usize = 5;

/// Reads a value out of a binary document stream.
///
/// [`BinaryReader::new`] positions the reader on the root document.
#[derive(Debug, Clone, Copy)]
pub struct BinaryReader<'b> {
    wire: WireType,
    bytes: &'b [u8],
    /// Absolute offset of `bytes` in the input, for error messages.
    offset: usize,
}

impl<'b> BinaryReader<'b> {
    /// A reader over a complete document stream.
    pub fn new(bytes: &'b [u8]) -> Self {
        Self {
            wire: WireType::Document,
            bytes,
            offset: 0,
        }
    }

    fn expect(&self, expected: WireType) -> Result<(), StreamError> {
        if self.wire == expected {
            Ok(())
        } else {
            Err(StreamError::TypeMismatch {
                expected,
                found: self.wire,
            })
        }
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N], StreamError> {
        self.bytes
            .get(..N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(StreamError::UnexpectedEof {
                offset: self.offset,
                needed: N.saturating_sub(self.bytes.len()),
            })
    }

    /// Validates the block framing and returns its element region.
    fn block(&self) -> Result<Elements<'b>, StreamError> {
        let len = i32::from_le_bytes(self.fixed::<4>()?);
        let size = usize::try_from(len).map_err(|_| StreamError::InvalidLength(len.into()))?;
        if size < MIN_BLOCK_LEN || size > self.bytes.len() {
            return Err(StreamError::InvalidLength(len.into()));
        }
        // Nested readers are cut to their value, so only the root can
        // carry extra input.
        if size < self.bytes.len() {
            return Err(StreamError::Protocol(format!(
                "{} trailing byte(s) after block at offset {}",
                self.bytes.len() - size,
                self.offset
            )));
        }
        if self.bytes[size - 1] != 0 {
            return Err(StreamError::Protocol("block is not NUL-terminated".into()));
        }
        Ok(Elements {
            bytes: &self.bytes[4..size - 1],
            pos: 0,
            offset: self.offset + 4,
        })
    }

    fn string(&self) -> Result<String, StreamError> {
        let len = i32::from_le_bytes(self.fixed::<4>()?);
        let size = usize::try_from(len).map_err(|_| StreamError::InvalidLength(len.into()))?;
        let body = self
            .bytes
            .get(4..4 + size)
            .filter(|body| body.last() == Some(&0))
            .ok_or(StreamError::InvalidLength(len.into()))?;
        String::from_utf8(body[..size - 1].to_vec()).map_err(|_| StreamError::InvalidUtf8("string"))
    }
}

impl ValueReader for BinaryReader<'_> {
    fn wire_type(&self) -> WireType {
        self.wire
    }

    fn read_document(&mut self) -> Result<Box<dyn DocumentReader + '_>, StreamError> {
        self.expect(WireType::Document)?;
        Ok(Box::new(self.block()?))
    }

    fn read_array(&mut self) -> Result<Box<dyn ArrayReader + '_>, StreamError> {
        self.expect(WireType::Array)?;
        Ok(Box::new(self.block()?))
    }

    fn read_scalar(&mut self, kind: ScalarKind) -> Result<ScalarValue, StreamError> {
        self.expect(WireType::for_scalar(kind))?;
        let value = match kind {
            ScalarKind::Bool => ScalarValue::Bool(self.fixed::<1>()?[0] != 0),
            ScalarKind::Int32 => ScalarValue::Int32(i32::from_le_bytes(self.fixed()?)),
            ScalarKind::Int64 => ScalarValue::Int64(i64::from_le_bytes(self.fixed()?)),
            ScalarKind::Uint32 => ScalarValue::Uint32(u32::from_le_bytes(self.fixed()?)),
            ScalarKind::Uint64 => ScalarValue::Uint64(u64::from_le_bytes(self.fixed()?)),
            ScalarKind::Float => ScalarValue::Float(f32::from_le_bytes(self.fixed()?)),
            ScalarKind::Double => ScalarValue::Double(f64::from_le_bytes(self.fixed()?)),
            ScalarKind::String => ScalarValue::String(self.string()?),
            ScalarKind::Bytes => {
                // Length was validated when the element was located.
                match self.fixed::<5>()?[4] {
                    0 => ScalarValue::Bytes(self.bytes[5..].to_vec()),
                    subtype => {
                        return Err(StreamError::Protocol(format!(
                            "unsupported binary subtype {subtype:#04x}"
                        )));
                    }
                }
            }
        };
        Ok(value)
    }

    fn read_timestamp(&mut self) -> Result<(i64, i32), StreamError> {
        self.expect(WireType::Timestamp)?;
        let raw = self.fixed::<12>()?;
        let mut seconds = [0; 8];
        let mut nanos = [0; 4];
        seconds.copy_from_slice(&raw[..8]);
        nanos.copy_from_slice(&raw[8..]);
        Ok((i64::from_le_bytes(seconds), i32::from_le_bytes(nanos)))
    }
}

// ---------------------------------------------------------------------------
// Elements: cursor over the element region of a block
// ---------------------------------------------------------------------------

/// Cursor over the elements of a document or array block.
#[derive(Debug)]
struct Elements<'b> {
    bytes: &'b [u8],
    pos: usize,
    offset: usize,
}

impl<'b> Elements<'b> {
    fn eof(&self, needed: usize) -> StreamError {
        StreamError::UnexpectedEof {
            offset: self.offset + self.pos,
            needed,
        }
    }

    fn read_i32_at(&self, at: usize) -> Result<i32, StreamError> {
        self.bytes
            .get(at..at + 4)
            .and_then(|slice| slice.try_into().ok())
            .map(i32::from_le_bytes)
            .ok_or_else(|| self.eof(4))
    }

    /// Byte size of a value of type `wire` starting at `at`.
    fn value_size(&self, wire: WireType, at: usize) -> Result<usize, StreamError> {
        let size = match wire {
            WireType::Bool => 1,
            WireType::Int32 | WireType::Uint32 | WireType::Float => 4,
            WireType::Int64 | WireType::Uint64 | WireType::Double => 8,
            WireType::Timestamp => 12,
            WireType::String => {
                let len = self.read_i32_at(at)?;
                let len = usize::try_from(len)
                    .ok()
                    .filter(|&len| len >= 1)
                    .ok_or(StreamError::InvalidLength(len.into()))?;
                4 + len
            }
            WireType::Binary => {
                let len = self.read_i32_at(at)?;
                let len =
                    usize::try_from(len).map_err(|_| StreamError::InvalidLength(len.into()))?;
                4 + 1 + len
            }
            WireType::Document | WireType::Array => {
                let len = self.read_i32_at(at)?;
                usize::try_from(len)
                    .ok()
                    .filter(|&len| len >= MIN_BLOCK_LEN)
                    .ok_or(StreamError::InvalidLength(len.into()))?
            }
        };
        Ok(size)
    }

    /// Locates the next element and advances past it.
    fn next(&mut self) -> Result<Option<(String, BinaryReader<'b>)>, StreamError> {
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }
        let result = self.locate();
        if result.is_err() {
            // A broken element poisons the rest of the block.
            self.pos = self.bytes.len();
        }
        result.map(Some)
    }

    fn locate(&mut self) -> Result<(String, BinaryReader<'b>), StreamError> {
        let code = self.bytes[self.pos];
        let wire = WireType::from_code(code).ok_or(StreamError::UnknownElementType(code))?;

        let key_start = self.pos + 1;
        let key_len = self.bytes[key_start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.eof(1))?;
        let key = std::str::from_utf8(&self.bytes[key_start..key_start + key_len])
            .map_err(|_| StreamError::InvalidUtf8("element key"))?
            .to_owned();

        let value_start = key_start + key_len + 1;
        let size = self.value_size(wire, value_start)?;
        let value_end = value_start + size;
        if value_end > self.bytes.len() {
            return Err(self.eof(value_end - self.bytes.len()));
        }

        let value = BinaryReader {
            wire,
            bytes: &self.bytes[value_start..value_end],
            offset: self.offset + value_start,
        };
        self.pos = value_end;
        Ok((key, value))
    }
}

impl DocumentReader for Elements<'_> {
    fn read_element(&mut self) -> Result<DocumentElement<'_>, StreamError> {
        Ok(match self.next()? {
            Some((key, value)) => DocumentElement::Field {
                key,
                value: Box::new(value),
            },
            None => DocumentElement::End,
        })
    }
}

/// Array keys are ignored: elements come back in stored order.
impl ArrayReader for Elements<'_> {
    fn read_element(&mut self) -> Result<ArrayElement<'_>, StreamError> {
        Ok(match self.next()? {
            Some((_, value)) => ArrayElement::Value(Box::new(value)),
            None => ArrayElement::End,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let bytes = [5, 0, 0, 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document().unwrap();
        assert!(matches!(doc.read_element().unwrap(), DocumentElement::End));
        // End is sticky.
        assert!(matches!(doc.read_element().unwrap(), DocumentElement::End));
    }

    #[test]
    fn test_int32_element() {
        let bytes = [12, 0, 0, 0, 0x10, b'a', 0, 7, 0, 0, 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document().unwrap();
        match doc.read_element().unwrap() {
            DocumentElement::Field { key, mut value } => {
                assert_eq!(key, "a");
                assert_eq!(value.wire_type(), WireType::Int32);
                assert_eq!(
                    value.read_scalar(ScalarKind::Int32).unwrap(),
                    ScalarValue::Int32(7)
                );
            }
            DocumentElement::End => panic!("expected a field"),
        }
    }

    #[test]
    fn test_type_mismatch() {
        let bytes = [12, 0, 0, 0, 0x10, b'a', 0, 7, 0, 0, 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document().unwrap();
        let DocumentElement::Field { mut value, .. } = doc.read_element().unwrap() else {
            panic!("expected a field");
        };
        let err = value.read_scalar(ScalarKind::String).unwrap_err();
        assert_eq!(
            err,
            StreamError::TypeMismatch {
                expected: WireType::String,
                found: WireType::Int32
            }
        );
    }

    #[test]
    fn test_length_beyond_input() {
        let bytes = [50, 0, 0, 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_document().err(),
            Some(StreamError::InvalidLength(50))
        ));
    }

    #[test]
    fn test_truncated_prefix() {
        let bytes = [5, 0];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_document().err(),
            Some(StreamError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_missing_terminator() {
        let bytes = [5, 0, 0, 0, 1];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_document().err(),
            Some(StreamError::Protocol(_))
        ));
    }

    #[test]
    fn test_unknown_element_type_poisons_block() {
        let bytes = [8, 0, 0, 0, 0x42, b'a', 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document().unwrap();
        assert!(matches!(
            doc.read_element().err(),
            Some(StreamError::UnknownElementType(0x42))
        ));
        assert!(matches!(doc.read_element().unwrap(), DocumentElement::End));
    }

    #[test]
    fn test_truncated_value() {
        // int64 element with only 2 value bytes before the terminator.
        let bytes = [10, 0, 0, 0, 0x12, b'a', 0, 1, 2, 0];
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document().unwrap();
        assert!(matches!(
            doc.read_element().err(),
            Some(StreamError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let bytes = [5, 0, 0, 0, 0, 0xde, 0xad, 0xbe, 0xef];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_document().err(),
            Some(StreamError::Protocol(msg)) if msg.contains("4 trailing byte(s)")
        ));
    }

    #[test]
    fn test_binary_subtype_checked() {
        let generic = [15, 0, 0, 0, 0x05, b'b', 0, 2, 0, 0, 0, 0, 0xab, 0xcd, 0];
        let mut patched = generic;
        patched[11] = 0x04;

        let read = |bytes: &[u8]| -> Result<ScalarValue, StreamError> {
            let mut reader = BinaryReader::new(bytes);
            let mut doc = reader.read_document()?;
            let DocumentElement::Field { mut value, .. } = doc.read_element()? else {
                panic!("expected a field");
            };
            value.read_scalar(ScalarKind::Bytes)
        };
        assert_eq!(read(&generic).unwrap(), ScalarValue::Bytes(vec![0xab, 0xcd]));
        assert!(matches!(read(&patched), Err(StreamError::Protocol(_))));
    }

    #[test]
    fn test_root_is_not_an_array() {
        let bytes = [5, 0, 0, 0, 0];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_array().err(),
            Some(StreamError::TypeMismatch { .. })
        ));
    }
}
