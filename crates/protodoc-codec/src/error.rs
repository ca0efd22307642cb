//! Error types for the codec layer.

use protodoc_schema::{SchemaError, ValueKind};
use protodoc_stream::StreamError;

use crate::CodecTag;

/// Errors that can occur while encoding or decoding values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The basic codec was handed a message, list, or map.
    #[error("basic codec cannot handle {0} values")]
    UnsupportedType(ValueKind),

    /// No codec is registered for a required message type or kind.
    #[error("no codec registered for {0}")]
    CodecNotFound(String),

    /// The value handed to a codec is the wrong variant or fails its own
    /// validity check.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A map key can't be encoded, or a decoded key doesn't have the map's
    /// key kind.
    #[error("invalid map key: {0}")]
    MapKey(String),

    /// A message codec bound to one type was handed another.
    #[error("expected message {expected}, found {found}")]
    WrongMessageType { expected: String, found: String },

    /// The tag is already bound to a different codec instance.
    #[error("{0} is already bound to a different codec")]
    DuplicateBinding(CodecTag),

    /// The stream refused a write or produced malformed data.
    #[error("malformed stream: {0}")]
    MalformedStream(#[from] StreamError),

    /// A decoded value didn't fit its field.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Strict mode only: the document has a key the message doesn't define.
    #[error("unknown field {key:?} in {message}")]
    UnknownField { message: String, key: String },

    /// Values are nested deeper than [`CodecConfig::max_depth`](crate::CodecConfig).
    #[error("values nested deeper than {max} levels")]
    DepthLimitExceeded { max: usize },
}

impl CodecError {
    /// Returns `true` for errors that abort a decode even in lenient mode.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DepthLimitExceeded { .. } | Self::UnknownField { .. } | Self::CodecNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KindTag;

    #[test]
    fn test_from_stream_error() {
        let err: CodecError = StreamError::UnknownElementType(0x42).into();
        assert!(matches!(err, CodecError::MalformedStream(_)));
        assert!(err.to_string().contains("0x42"));
    }

    #[test]
    fn test_from_schema_error() {
        let err: CodecError = SchemaError::InvalidMapKey(protodoc_schema::ScalarKind::Bytes).into();
        assert!(matches!(err, CodecError::Schema(_)));
    }

    #[test]
    fn test_duplicate_binding_names_the_tag() {
        let err = CodecError::DuplicateBinding(CodecTag::Kind(KindTag::List));
        assert_eq!(err.to_string(), "kind:list is already bound to a different codec");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(CodecError::DepthLimitExceeded { max: 3 }.is_fatal());
        assert!(CodecError::CodecNotFound("kind:map".into()).is_fatal());
        assert!(!CodecError::InvalidValue("x".into()).is_fatal());
        assert!(!CodecError::UnsupportedType(ValueKind::List).is_fatal());
    }
}
