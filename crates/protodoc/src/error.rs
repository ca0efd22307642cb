//! Unified error type for protodoc.

use protodoc_codec::CodecError;
use protodoc_schema::SchemaError;
use protodoc_stream::StreamError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of the facade deal with this single type instead of importing
/// errors from each sub-crate. Every variant has a `From` impl, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ProtodocError {
    /// A descriptor or value had the wrong shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The stream could not be written or read.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A codec refused a value or failed to decode one.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ProtodocError {
    /// The codec error, if this is one.
    pub fn as_codec(&self) -> Option<&CodecError> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use protodoc_schema::ScalarKind;

    use super::*;

    #[test]
    fn test_from_schema_error() {
        let err = SchemaError::InvalidMapKey(ScalarKind::Bytes);
        let protodoc_err: ProtodocError = err.into();
        assert!(matches!(protodoc_err, ProtodocError::Schema(_)));
        assert!(protodoc_err.to_string().contains("bytes"));
    }

    #[test]
    fn test_from_stream_error() {
        let err = StreamError::InvalidLength(-1);
        let protodoc_err: ProtodocError = err.into();
        assert!(matches!(protodoc_err, ProtodocError::Stream(_)));
        assert_eq!(protodoc_err.to_string(), "invalid length -1");
    }

    #[test]
    fn test_from_codec_error() {
        let err = CodecError::CodecNotFound("test.Missing".into());
        let protodoc_err: ProtodocError = err.into();
        assert!(matches!(
            protodoc_err.as_codec(),
            Some(CodecError::CodecNotFound(name)) if name == "test.Missing"
        ));
    }

    #[test]
    fn test_from_config_error() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let protodoc_err: ProtodocError = err.into();
        assert!(matches!(protodoc_err, ProtodocError::Config(_)));
        assert!(protodoc_err.as_codec().is_none());
    }
}
