use crate::WireType;

/// Errors that can occur while writing or reading a document stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// The input ended in the middle of an element.
    #[error("unexpected end of input at offset {offset}: need {needed} more bytes")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A length prefix is negative, too small, or disagrees with the
    /// enclosing block.
    #[error("invalid length {0}")]
    InvalidLength(i64),

    /// The element type byte isn't part of the format.
    #[error("unknown element type 0x{0:02x}")]
    UnknownElementType(u8),

    /// The element holds a different type than the caller asked for.
    #[error("expected {expected} element, found {found}")]
    TypeMismatch { expected: WireType, found: WireType },

    /// A key or string isn't valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// The key can't be represented (it contains a NUL byte).
    #[error("invalid element key {0:?}")]
    InvalidKey(String),

    /// The writer or reader was driven out of order, e.g. a block was
    /// ended twice or a value was written without a key.
    #[error("stream protocol violated: {0}")]
    Protocol(String),
}
