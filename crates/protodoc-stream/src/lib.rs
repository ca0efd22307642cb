//! Document stream abstraction for protodoc.
//!
//! Provides the writer and reader traits the codec drives: nested
//! documents (keyed elements) and arrays (ordered elements), written and
//! read one element at a time.
//!
//! The end of a document or array is reported as a value
//! ([`DocumentElement::End`], [`ArrayElement::End`]), never as an error,
//! so ordinary iteration never goes through the error path.
//!
//! # Feature Flags
//!
//! - `binary` (default): a BSON-compatible reference format
//!   ([`BinaryWriter`], [`BinaryReader`])

mod error;
#[cfg(feature = "binary")]
mod reader;
#[cfg(feature = "binary")]
mod writer;

pub use error::StreamError;
#[cfg(feature = "binary")]
pub use reader::BinaryReader;
#[cfg(feature = "binary")]
pub use writer::BinaryWriter;

use std::fmt;

use protodoc_schema::{ScalarKind, ScalarValue};

// ---------------------------------------------------------------------------
// WireType
// ---------------------------------------------------------------------------

/// The type of an element as stored in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Double,
    String,
    Document,
    Array,
    Binary,
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Timestamp,
}

impl WireType {
    /// The wire type a scalar of `kind` is written as.
    pub fn for_scalar(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool,
            ScalarKind::Int32 => Self::Int32,
            ScalarKind::Int64 => Self::Int64,
            ScalarKind::Uint32 => Self::Uint32,
            ScalarKind::Uint64 => Self::Uint64,
            ScalarKind::Float => Self::Float,
            ScalarKind::Double => Self::Double,
            ScalarKind::String => Self::String,
            ScalarKind::Bytes => Self::Binary,
        }
    }

    /// The element type byte.
    pub fn code(self) -> u8 {
        match self {
            Self::Double => 0x01,
            Self::String => 0x02,
            Self::Document => 0x03,
            Self::Array => 0x04,
            Self::Binary => 0x05,
            Self::Bool => 0x08,
            Self::Int32 => 0x10,
            Self::Int64 => 0x12,
            Self::Uint32 => 0x80,
            Self::Uint64 => 0x81,
            Self::Float => 0x82,
            Self::Timestamp => 0x83,
        }
    }

    /// Inverse of [`WireType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        let wire = match code {
            0x01 => Self::Double,
            0x02 => Self::String,
            0x03 => Self::Document,
            0x04 => Self::Array,
            0x05 => Self::Binary,
            0x08 => Self::Bool,
            0x10 => Self::Int32,
            0x12 => Self::Int64,
            0x80 => Self::Uint32,
            0x81 => Self::Uint64,
            0x82 => Self::Float,
            0x83 => Self::Timestamp,
            _ => return None,
        };
        Some(wire)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "double",
            Self::String => "string",
            Self::Document => "document",
            Self::Array => "array",
            Self::Binary => "binary",
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Writer side
// ---------------------------------------------------------------------------

/// Writes one value at the current position of the stream.
pub trait ValueWriter {
    /// Opens a document block. Close it with [`DocumentWriter::end`].
    fn write_document(&mut self) -> Result<&mut dyn DocumentWriter, StreamError>;

    /// Opens an array block. Close it with [`ArrayWriter::end`].
    fn write_array(&mut self) -> Result<&mut dyn ArrayWriter, StreamError>;

    /// Writes a scalar in its native representation.
    fn write_scalar(&mut self, value: &ScalarValue) -> Result<(), StreamError>;

    /// Writes a composite timestamp.
    fn write_timestamp(&mut self, seconds: i64, nanos: i32) -> Result<(), StreamError>;
}

/// Writes keyed elements into an open document block.
pub trait DocumentWriter {
    /// Starts an element; the returned writer must write exactly one value.
    fn write_element(&mut self, key: &str) -> Result<&mut dyn ValueWriter, StreamError>;

    /// Closes the document block.
    fn end(&mut self) -> Result<(), StreamError>;
}

/// Writes ordered elements into an open array block.
pub trait ArrayWriter {
    /// Starts the next element; the returned writer must write exactly one
    /// value.
    fn write_element(&mut self) -> Result<&mut dyn ValueWriter, StreamError>;

    /// Closes the array block.
    fn end(&mut self) -> Result<(), StreamError>;
}

// ---------------------------------------------------------------------------
// Reader side
// ---------------------------------------------------------------------------

/// Reads the value at the current position of the stream.
pub trait ValueReader {
    /// The stored type of this value.
    fn wire_type(&self) -> WireType;

    /// Opens this value as a document.
    fn read_document(&mut self) -> Result<Box<dyn DocumentReader + '_>, StreamError>;

    /// Opens this value as an array.
    fn read_array(&mut self) -> Result<Box<dyn ArrayReader + '_>, StreamError>;

    /// Reads this value as a scalar of `kind`.
    fn read_scalar(&mut self, kind: ScalarKind) -> Result<ScalarValue, StreamError>;

    /// Reads this value as a composite timestamp `(seconds, nanos)`.
    fn read_timestamp(&mut self) -> Result<(i64, i32), StreamError>;
}

/// One step of iterating a document.
pub enum DocumentElement<'a> {
    /// A keyed element. Dropping `value` unread skips it.
    Field {
        key: String,
        value: Box<dyn ValueReader + 'a>,
    },
    /// The document has no more elements.
    End,
}

/// Iterates the elements of a document block.
pub trait DocumentReader {
    fn read_element(&mut self) -> Result<DocumentElement<'_>, StreamError>;
}

/// One step of iterating an array.
pub enum ArrayElement<'a> {
    /// The next element. Dropping it unread skips it.
    Value(Box<dyn ValueReader + 'a>),
    /// The array has no more elements.
    End,
}

/// Iterates the elements of an array block.
pub trait ArrayReader {
    fn read_element(&mut self) -> Result<ArrayElement<'_>, StreamError>;
}
