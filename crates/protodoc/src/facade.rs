//! Whole-message encode and decode.

use std::mem;
use std::sync::Arc;

use protodoc_codec::{CodecConfig, CodecError, DecodeContext, EncodeContext, Registry, ValueCodec};
use protodoc_schema::{DynamicMessage, Value};
use protodoc_stream::{BinaryReader, BinaryWriter, ValueReader, ValueWriter};

use crate::ProtodocError;

/// Encodes root messages to documents and decodes them back.
///
/// Holds the registry the root codec is looked up in and the
/// [`CodecConfig`] every call runs with. Cloning is cheap; the registry is
/// shared.
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    registry: Arc<Registry>,
    config: CodecConfig,
}

impl DocumentCodec {
    pub fn new(registry: Arc<Registry>, config: CodecConfig) -> Self {
        tracing::info!(
            codecs = registry.registered_tags().len(),
            strict = config.strict,
            field_keys = %config.field_keys,
            max_depth = config.max_depth,
            "document codec ready"
        );
        Self { registry, config }
    }

    /// Uses the global registry with configuration read from the
    /// `PROTODOC_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(Registry::global(), CodecConfig::from_env())
    }

    /// Uses the global registry with configuration parsed from JSON.
    pub fn from_json_config(json: &str) -> Result<Self, ProtodocError> {
        Ok(Self::new(Registry::global(), CodecConfig::from_json(json)?))
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn root_codec(&self, message: &DynamicMessage) -> Result<Arc<dyn ValueCodec>, CodecError> {
        let name = message.descriptor().full_name();
        self.registry
            .get_for_message(name)
            .ok_or_else(|| CodecError::CodecNotFound(name.to_owned()))
    }

    // -----------------------------------------------------------------------
    // Encode
    // -----------------------------------------------------------------------

    /// Writes `message` into a caller-supplied stream.
    ///
    /// On error the writer may hold a partial document; discard it.
    pub fn encode_into(
        &self,
        writer: &mut dyn ValueWriter,
        message: &DynamicMessage,
    ) -> Result<(), ProtodocError> {
        let codec = self.root_codec(message)?;
        let ctx = EncodeContext::new(&self.registry, &self.config);
        codec.encode_message(&ctx, writer, message)?;
        Ok(())
    }

    /// Encodes `message` as a binary document.
    pub fn encode_document(&self, message: &DynamicMessage) -> Result<Vec<u8>, ProtodocError> {
        let mut writer = BinaryWriter::new();
        self.encode_into(&mut writer, message)?;
        let bytes = writer.into_bytes()?;
        tracing::debug!(
            message = message.descriptor().full_name(),
            len = bytes.len(),
            "encoded document"
        );
        Ok(bytes)
    }

    // -----------------------------------------------------------------------
    // Decode
    // -----------------------------------------------------------------------

    /// Reads a document from a caller-supplied stream into `message`.
    ///
    /// Fields present in the document are set on top of whatever `message`
    /// already holds. On a fatal error `message` keeps the fields decoded
    /// before the failure.
    pub fn decode_from(
        &self,
        reader: &mut dyn ValueReader,
        message: &mut DynamicMessage,
    ) -> Result<(), ProtodocError> {
        let codec = self.root_codec(message)?;
        let ctx = DecodeContext::new(&self.registry, &self.config);

        let placeholder = DynamicMessage::new(Arc::clone(message.descriptor()));
        let mut value = Value::Message(mem::replace(message, placeholder));
        let result = codec.decode(&ctx, reader, &mut value);
        if let Value::Message(decoded) = value {
            *message = decoded;
        }
        result?;
        Ok(())
    }

    /// Decodes a binary document into `message`.
    pub fn decode_document(
        &self,
        bytes: &[u8],
        message: &mut DynamicMessage,
    ) -> Result<(), ProtodocError> {
        self.decode_from(&mut BinaryReader::new(bytes), message)?;
        tracing::debug!(
            message = message.descriptor().full_name(),
            fields = message.len(),
            "decoded document"
        );
        Ok(())
    }
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self::new(Registry::global(), CodecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use protodoc_codec::FieldKeyStyle;
    use protodoc_schema::{FieldKind, MessageDescriptor, ScalarKind};

    use super::*;

    fn note() -> DynamicMessage {
        let descriptor = MessageDescriptor::builder("test.Note")
            .field(1, "title", FieldKind::Scalar(ScalarKind::String))
            .field(2, "pinned", FieldKind::Scalar(ScalarKind::Bool))
            .build()
            .unwrap();
        DynamicMessage::new(descriptor)
    }

    #[test]
    fn test_round_trip() {
        let codec = DocumentCodec::default();
        let mut message = note();
        message.set_by_name("title", "groceries").unwrap();
        message.set_by_name("pinned", true).unwrap();

        let bytes = codec.encode_document(&message).unwrap();
        let mut decoded = note();
        codec.decode_document(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_empty_registry_has_no_root_codec() {
        let codec = DocumentCodec::new(Arc::new(Registry::new()), CodecConfig::default());
        let err = codec.encode_document(&note()).unwrap_err();
        assert!(matches!(
            err.as_codec(),
            Some(CodecError::CodecNotFound(name)) if name == "test.Note"
        ));

        let err = codec.decode_document(&[5, 0, 0, 0, 0], &mut note()).unwrap_err();
        assert!(matches!(err.as_codec(), Some(CodecError::CodecNotFound(_))));
    }

    #[test]
    fn test_failed_decode_keeps_message() {
        let codec = DocumentCodec::default();
        let mut message = note();
        message.set_by_name("title", "kept").unwrap();

        let err = codec.decode_document(&[1, 2], &mut message).unwrap_err();
        assert!(matches!(err.as_codec(), Some(CodecError::MalformedStream(_))));
        assert_eq!(message.get_by_name("title"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = DocumentCodec::default();
        let mut message = note();
        message.set_by_name("pinned", true).unwrap();
        let mut bytes = codec.encode_document(&message).unwrap();
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let err = codec.decode_document(&bytes, &mut note()).unwrap_err();
        assert!(matches!(
            err.as_codec(),
            Some(CodecError::MalformedStream(protodoc_stream::StreamError::Protocol(_)))
        ));
    }

    #[test]
    fn test_with_config() {
        let config = CodecConfig {
            field_keys: FieldKeyStyle::Name,
            ..CodecConfig::default()
        };
        let codec = DocumentCodec::default().with_config(config.clone());
        assert_eq!(codec.config(), &config);
        assert!(Arc::ptr_eq(codec.registry(), &Registry::global()));
    }

    #[test]
    fn test_from_json_config() {
        let codec = DocumentCodec::from_json_config(r#"{"strict": true}"#).unwrap();
        assert!(codec.config().strict);
        assert_eq!(codec.config().max_depth, CodecConfig::default().max_depth);

        let err = DocumentCodec::from_json_config("{").unwrap_err();
        assert!(matches!(err, ProtodocError::Config(_)));
    }
}
