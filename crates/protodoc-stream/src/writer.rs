//! Binary stream writer.
//!
//! Output is BSON-compatible framing: every block is an `i32` little-endian
//! byte length, its elements, and a trailing `0x00`; every element is a type
//! byte, a NUL-terminated key, and the value. Block lengths are unknown
//! until the block is closed, so the writer keeps a stack of open blocks and
//! patches each length in [`DocumentWriter::end`] / [`ArrayWriter::end`].

use protodoc_schema::ScalarValue;

use crate::{ArrayWriter, DocumentWriter, StreamError, ValueWriter, WireType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Document,
    Array,
}

#[derive(Debug)]
struct Frame {
    block: Block,
    /// Offset of the block's length prefix.
    start: usize,
    /// Next array index (arrays only).
    next_index: usize,
}

/// Writes a document stream into an in-memory buffer.
///
/// The root value must be a document. Call [`BinaryWriter::into_bytes`]
/// after closing it.
///
/// ```rust
/// use protodoc_stream::{BinaryWriter, ValueWriter};
///
/// let mut writer = BinaryWriter::new();
/// let doc = writer.write_document().unwrap();
/// doc.write_element("answer").unwrap().write_scalar(&42i32.into()).unwrap();
/// doc.end().unwrap();
///
/// let bytes = writer.into_bytes().unwrap();
/// assert_eq!(bytes.len(), 4 + (1 + 7 + 4) + 1);
/// ```
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
    frames: Vec<Frame>,
    /// Offset of the type byte of an element whose value is still missing.
    pending: Option<usize>,
    root_written: bool,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far, including unfinished blocks.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of blocks still open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns the finished stream.
    ///
    /// # Errors
    /// [`StreamError::Protocol`] if nothing was written or a block is still
    /// open. After an encode error the buffer is incomplete and must be
    /// discarded; this check is what stops it from leaking out.
    pub fn into_bytes(self) -> Result<Vec<u8>, StreamError> {
        if !self.root_written {
            return Err(StreamError::Protocol("no document was written".into()));
        }
        if !self.frames.is_empty() || self.pending.is_some() {
            return Err(StreamError::Protocol(format!(
                "{} block(s) left open",
                self.frames.len()
            )));
        }
        Ok(self.buf)
    }

    /// Claims the slot for the next value and records its type.
    fn begin_value(&mut self, wire: WireType) -> Result<(), StreamError> {
        if let Some(at) = self.pending.take() {
            self.buf[at] = wire.code();
            return Ok(());
        }
        if self.frames.is_empty() && !self.root_written {
            if wire != WireType::Document {
                return Err(StreamError::Protocol(format!(
                    "root value must be a document, not {wire}"
                )));
            }
            self.root_written = true;
            return Ok(());
        }
        Err(StreamError::Protocol(format!(
            "{wire} value written without an element key"
        )))
    }

    fn open_block(&mut self, block: Block) {
        self.frames.push(Frame {
            block,
            start: self.buf.len(),
            next_index: 0,
        });
        self.buf.extend_from_slice(&[0; 4]);
    }

    fn begin_element(&mut self, block: Block, key: &str) -> Result<(), StreamError> {
        match self.frames.last() {
            Some(frame) if frame.block == block => {}
            _ => {
                return Err(StreamError::Protocol(format!(
                    "no open {block:?} block to add element {key:?} to"
                )));
            }
        }
        if self.pending.is_some() {
            return Err(StreamError::Protocol(
                "previous element has no value".into(),
            ));
        }
        if key.as_bytes().contains(&0) {
            return Err(StreamError::InvalidKey(key.to_owned()));
        }
        self.pending = Some(self.buf.len());
        self.buf.push(0);
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    fn close_block(&mut self, block: Block) -> Result<(), StreamError> {
        if self.pending.is_some() {
            return Err(StreamError::Protocol(
                "block closed while an element has no value".into(),
            ));
        }
        let frame = match self.frames.pop() {
            Some(frame) if frame.block == block => frame,
            Some(frame) => {
                let found = frame.block;
                self.frames.push(frame);
                return Err(StreamError::Protocol(format!(
                    "cannot end {block:?}: innermost open block is {found:?}"
                )));
            }
            None => {
                return Err(StreamError::Protocol(format!(
                    "cannot end {block:?}: no block is open"
                )));
            }
        };
        self.buf.push(0);
        let len = self.buf.len() - frame.start;
        let len = i32::try_from(len).map_err(|_| StreamError::InvalidLength(len as i64))?;
        self.buf[frame.start..frame.start + 4].copy_from_slice(&len.to_le_bytes());
        tracing::trace!(?block, len, depth = self.frames.len(), "block closed");
        Ok(())
    }

    fn put_len_prefixed(&mut self, bytes: &[u8], extra: usize) -> Result<(), StreamError> {
        let len = bytes.len() + extra;
        let len = i32::try_from(len).map_err(|_| StreamError::InvalidLength(len as i64))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }
}

impl ValueWriter for BinaryWriter {
    fn write_document(&mut self) -> Result<&mut dyn DocumentWriter, StreamError> {
        self.begin_value(WireType::Document)?;
        self.open_block(Block::Document);
        Ok(self)
    }

    fn write_array(&mut self) -> Result<&mut dyn ArrayWriter, StreamError> {
        self.begin_value(WireType::Array)?;
        self.open_block(Block::Array);
        Ok(self)
    }

    fn write_scalar(&mut self, value: &ScalarValue) -> Result<(), StreamError> {
        self.begin_value(WireType::for_scalar(value.kind()))?;
        match value {
            ScalarValue::Bool(v) => self.buf.push(u8::from(*v)),
            ScalarValue::Int32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Int64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Uint32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Uint64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Float(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Double(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::String(v) => {
                // Length counts the trailing NUL.
                self.put_len_prefixed(v.as_bytes(), 1)?;
                self.buf.extend_from_slice(v.as_bytes());
                self.buf.push(0);
            }
            ScalarValue::Bytes(v) => {
                self.put_len_prefixed(v, 0)?;
                self.buf.push(0); // generic binary subtype
                self.buf.extend_from_slice(v);
            }
        }
        Ok(())
    }

    fn write_timestamp(&mut self, seconds: i64, nanos: i32) -> Result<(), StreamError> {
        self.begin_value(WireType::Timestamp)?;
        self.buf.extend_from_slice(&seconds.to_le_bytes());
        self.buf.extend_from_slice(&nanos.to_le_bytes());
        Ok(())
    }
}

impl DocumentWriter for BinaryWriter {
    fn write_element(&mut self, key: &str) -> Result<&mut dyn ValueWriter, StreamError> {
        self.begin_element(Block::Document, key)?;
        Ok(self)
    }

    fn end(&mut self) -> Result<(), StreamError> {
        self.close_block(Block::Document)
    }
}

impl ArrayWriter for BinaryWriter {
    fn write_element(&mut self) -> Result<&mut dyn ValueWriter, StreamError> {
        let index = match self.frames.last_mut() {
            Some(frame) if frame.block == Block::Array => {
                let index = frame.next_index;
                frame.next_index += 1;
                index
            }
            _ => {
                return Err(StreamError::Protocol(
                    "no open Array block to add an element to".into(),
                ));
            }
        };
        self.begin_element(Block::Array, &index.to_string())?;
        Ok(self)
    }

    fn end(&mut self) -> Result<(), StreamError> {
        self.close_block(Block::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_bytes() {
        let mut w = BinaryWriter::new();
        w.write_document().unwrap().end().unwrap();
        assert_eq!(w.into_bytes().unwrap(), vec![5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_int32_element_layout() {
        let mut w = BinaryWriter::new();
        let doc = w.write_document().unwrap();
        doc.write_element("a")
            .unwrap()
            .write_scalar(&ScalarValue::Int32(1))
            .unwrap();
        doc.end().unwrap();
        assert_eq!(
            w.into_bytes().unwrap(),
            vec![12, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_array_keys_are_indices() {
        let mut w = BinaryWriter::new();
        let doc = w.write_document().unwrap();
        let arr = doc.write_element("x").unwrap().write_array().unwrap();
        arr.write_element().unwrap().write_scalar(&true.into()).unwrap();
        arr.write_element().unwrap().write_scalar(&false.into()).unwrap();
        arr.end().unwrap();
        DocumentWriter::end(&mut w).unwrap();

        let bytes = w.into_bytes().unwrap();
        // Array starts after: len(4) + type(1) + "x\0"(2).
        let array = &bytes[7..];
        assert_eq!(&array[4..7], &[0x08, b'0', 0]);
        assert_eq!(&array[8..11], &[0x08, b'1', 0]);
    }

    #[test]
    fn test_root_must_be_document() {
        let mut w = BinaryWriter::new();
        let err = w.write_scalar(&ScalarValue::Int32(1)).unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_value_without_key_rejected() {
        let mut w = BinaryWriter::new();
        w.write_document().unwrap();
        let err = w.write_scalar(&ScalarValue::Bool(true)).unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_unbalanced_end_rejected() {
        let mut w = BinaryWriter::new();
        w.write_document().unwrap();
        assert!(ArrayWriter::end(&mut w).is_err());
        DocumentWriter::end(&mut w).unwrap();
        assert!(DocumentWriter::end(&mut w).is_err());
    }

    #[test]
    fn test_open_block_blocks_into_bytes() {
        let mut w = BinaryWriter::new();
        w.write_document().unwrap();
        assert_eq!(w.depth(), 1);
        assert!(matches!(w.into_bytes(), Err(StreamError::Protocol(_))));
    }

    #[test]
    fn test_nothing_written_rejected() {
        assert!(BinaryWriter::new().into_bytes().is_err());
    }

    #[test]
    fn test_nul_in_key_rejected() {
        let mut w = BinaryWriter::new();
        let doc = w.write_document().unwrap();
        let err = doc.write_element("a\0b").err().unwrap();
        assert_eq!(err, StreamError::InvalidKey("a\0b".into()));
    }

    #[test]
    fn test_element_without_value_rejected() {
        let mut w = BinaryWriter::new();
        let doc = w.write_document().unwrap();
        doc.write_element("a").unwrap();
        assert!(doc.write_element("b").is_err());
        assert!(doc.end().is_err());
    }
}
