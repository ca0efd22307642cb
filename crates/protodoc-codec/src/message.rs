//! Generic codec for messages.

use std::borrow::Cow;
use std::sync::Arc;

use protodoc_schema::{DynamicMessage, FieldDescriptor, MessageDescriptor, Value};
use protodoc_stream::{DocumentElement, ValueReader, ValueWriter};

use crate::{CodecError, DecodeContext, EncodeContext, FieldKeyStyle, ValueCodec};

/// Encodes any [`DynamicMessage`] as a document block, one element per set
/// field.
///
/// ## Field order
///
/// The active member of each oneof group comes first, groups in descriptor
/// order. Then every field outside a oneof, in declaration order. Unset
/// fields are left out entirely.
///
/// ## Keys
///
/// Fields are keyed by decimal field number unless
/// [`CodecConfig::field_keys`](crate::CodecConfig::field_keys) says
/// otherwise. Decode reads the same style it would write.
///
/// ## Decode
///
/// Unknown keys and fields that fail to decode are logged and skipped, so a
/// document written by a newer schema still loads. With
/// [`CodecConfig::strict`](crate::CodecConfig::strict) they fail the decode.
#[derive(Debug, Default)]
pub struct MessageCodec;

impl MessageCodec {
    pub fn new() -> Self {
        Self
    }

    /// The set fields of `message`, in the order they are written.
    pub fn resolve_fields(message: &DynamicMessage) -> Vec<&FieldDescriptor> {
        let descriptor = message.descriptor();
        let active = (0..descriptor.oneofs().len())
            .filter_map(|group| message.active_oneof_field(group));
        let plain = descriptor
            .fields()
            .iter()
            .filter(|field| field.oneof().is_none() && message.has(field));
        active.chain(plain).collect()
    }

    /// The document key of `field`.
    pub fn field_key(field: &FieldDescriptor, style: FieldKeyStyle) -> Cow<'_, str> {
        match style {
            FieldKeyStyle::Number => Cow::Owned(field.number().to_string()),
            FieldKeyStyle::Name => Cow::Borrowed(field.name()),
        }
    }

    /// The field of `descriptor` that `key` names.
    pub fn lookup_field<'d>(
        descriptor: &'d MessageDescriptor,
        key: &str,
        style: FieldKeyStyle,
    ) -> Option<&'d FieldDescriptor> {
        match style {
            FieldKeyStyle::Number => key
                .parse::<u32>()
                .ok()
                .and_then(|number| descriptor.field_by_number(number)),
            FieldKeyStyle::Name => descriptor.field_by_name(key),
        }
    }
}

impl ValueCodec for MessageCodec {
    fn encode(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError> {
        let Value::Message(message) = value else {
            return Err(CodecError::InvalidValue(format!(
                "message codec given a {} value",
                value.kind()
            )));
        };
        self.encode_message(ctx, writer, message)
    }

    fn encode_message(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        message: &DynamicMessage,
    ) -> Result<(), CodecError> {
        if !message.is_valid() {
            return Err(CodecError::InvalidValue(format!(
                "{} has fields holding values of the wrong type",
                message.descriptor().full_name()
            )));
        }

        let style = ctx.config().field_keys;
        let doc = writer.write_document()?;
        for field in Self::resolve_fields(message) {
            let Some(field_value) = message.get(field) else {
                continue;
            };
            let key = Self::field_key(field, style);
            ctx.encode_field(doc.write_element(&key)?, field, field_value)?;
        }
        doc.end()?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &DecodeContext<'_>,
        reader: &mut dyn ValueReader,
        value: &mut Value,
    ) -> Result<(), CodecError> {
        let kind = value.kind();
        let Some(message) = value.as_message_mut() else {
            return Err(CodecError::InvalidValue(format!(
                "message codec given a {kind} value"
            )));
        };
        let descriptor = Arc::clone(message.descriptor());
        let name = descriptor.full_name();
        let style = ctx.config().field_keys;

        let mut doc = reader.read_document()?;
        loop {
            let (key, mut field_reader) = match doc.read_element()? {
                DocumentElement::Field { key, value: field_reader } => (key, field_reader),
                DocumentElement::End => break,
            };

            let Some(field) = Self::lookup_field(&descriptor, &key, style) else {
                if ctx.config().strict {
                    return Err(CodecError::UnknownField {
                        message: name.to_owned(),
                        key,
                    });
                }
                tracing::debug!(message = name, %key, "skipping unknown field");
                continue;
            };

            let mut field_value = message.new_field_value(field);
            let result = ctx
                .decode_field(field_reader.as_mut(), field, &mut field_value)
                .and_then(|()| message.set(field, field_value).map_err(CodecError::from));
            match result {
                Ok(()) => {}
                Err(err) if ctx.aborts_on(&err) => return Err(err),
                Err(err) => {
                    tracing::warn!(message = name, %key, error = %err, "skipping field that failed to decode");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use protodoc_schema::{ElementType, FieldKind, ListValue, ScalarKind};
    use protodoc_stream::{BinaryReader, BinaryWriter};

    use super::*;
    use crate::{CodecConfig, Registry};

    fn contact() -> Arc<MessageDescriptor> {
        MessageDescriptor::builder("test.Contact")
            .field(1, "name", FieldKind::Scalar(ScalarKind::String))
            .field(2, "email", FieldKind::Scalar(ScalarKind::String))
            .field(3, "phone", FieldKind::Scalar(ScalarKind::String))
            .field(4, "tags", FieldKind::List(ElementType::Scalar(ScalarKind::String)))
            .field(5, "priority", FieldKind::Enum)
            .oneof("channel", [2, 3])
            .build()
            .unwrap()
    }

    fn encode_with(config: &CodecConfig, message: &DynamicMessage) -> Result<Vec<u8>, CodecError> {
        let registry = Registry::with_defaults();
        let ctx = EncodeContext::new(&registry, config);
        let mut writer = BinaryWriter::new();
        MessageCodec::new().encode(&ctx, &mut writer, &Value::Message(message.clone()))?;
        Ok(writer.into_bytes()?)
    }

    fn decode_with(config: &CodecConfig, bytes: &[u8], target: &mut DynamicMessage) -> Result<(), CodecError> {
        let registry = Registry::with_defaults();
        let ctx = DecodeContext::new(&registry, config);
        let mut value = Value::Message(target.clone());
        MessageCodec::new().decode(&ctx, &mut BinaryReader::new(bytes), &mut value)?;
        if let Value::Message(message) = value {
            *target = message;
        }
        Ok(())
    }

    /// Top-level keys of a document, in stored order.
    fn keys(bytes: &[u8]) -> Vec<String> {
        let mut reader = BinaryReader::new(bytes);
        let mut doc = reader.read_document().unwrap();
        let mut keys = Vec::new();
        while let DocumentElement::Field { key, .. } = doc.read_element().unwrap() {
            keys.push(key);
        }
        keys
    }

    #[test]
    fn test_oneof_first_then_declaration_order() {
        let mut message = DynamicMessage::new(contact());
        message.set_by_name("priority", Value::Enum(2)).unwrap();
        message.set_by_name("name", "ada").unwrap();
        message.set_by_name("phone", "555").unwrap();

        let fields: Vec<&str> = MessageCodec::resolve_fields(&message)
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(fields, vec!["phone", "name", "priority"]);

        let bytes = encode_with(&CodecConfig::default(), &message).unwrap();
        assert_eq!(keys(&bytes), vec!["3", "1", "5"]);
    }

    #[test]
    fn test_unset_fields_omitted() {
        let mut message = DynamicMessage::new(contact());
        message.set_by_name("name", "ada").unwrap();
        let bytes = encode_with(&CodecConfig::default(), &message).unwrap();
        assert_eq!(keys(&bytes), vec!["1"]);

        let mut decoded = DynamicMessage::new(contact());
        decode_with(&CodecConfig::default(), &bytes, &mut decoded).unwrap();
        assert_eq!(decoded, message);
        assert!(decoded.get_by_name("tags").is_none());
    }

    #[test]
    fn test_oneof_round_trip_activates_one_member() {
        let mut message = DynamicMessage::new(contact());
        message.set_by_name("email", "ada@example.com").unwrap();
        let bytes = encode_with(&CodecConfig::default(), &message).unwrap();

        let mut decoded = DynamicMessage::new(contact());
        decoded.set_by_name("phone", "stale").unwrap();
        decode_with(&CodecConfig::default(), &bytes, &mut decoded).unwrap();

        let active = decoded.active_oneof_field(0).unwrap();
        assert_eq!(active.name(), "email");
        assert!(decoded.get_by_name("phone").is_none());
    }

    #[test]
    fn test_name_keys_round_trip() {
        let config = CodecConfig {
            field_keys: FieldKeyStyle::Name,
            ..CodecConfig::default()
        };
        let mut message = DynamicMessage::new(contact());
        message.set_by_name("name", "ada").unwrap();
        message
            .set_by_name(
                "tags",
                ListValue::from_values(
                    ElementType::Scalar(ScalarKind::String),
                    [Value::from("a"), Value::from("b")],
                ),
            )
            .unwrap();

        let bytes = encode_with(&config, &message).unwrap();
        assert_eq!(keys(&bytes), vec!["name", "tags"]);

        let mut decoded = DynamicMessage::new(contact());
        decode_with(&config, &bytes, &mut decoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_unknown_key_skipped_unless_strict() {
        let mut writer = BinaryWriter::new();
        let doc = writer.write_document().unwrap();
        doc.write_element("1").unwrap().write_scalar(&"ada".into()).unwrap();
        doc.write_element("99").unwrap().write_scalar(&true.into()).unwrap();
        doc.end().unwrap();
        let bytes = writer.into_bytes().unwrap();

        let mut decoded = DynamicMessage::new(contact());
        decode_with(&CodecConfig::default(), &bytes, &mut decoded).unwrap();
        assert_eq!(decoded.get_by_name("name"), Some(&Value::from("ada")));
        assert_eq!(decoded.len(), 1);

        let strict = CodecConfig {
            strict: true,
            ..CodecConfig::default()
        };
        let err = decode_with(&strict, &bytes, &mut DynamicMessage::new(contact())).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownField {
                message: "test.Contact".into(),
                key: "99".into()
            }
        );
    }

    #[test]
    fn test_mistyped_field_skipped() {
        let mut writer = BinaryWriter::new();
        let doc = writer.write_document().unwrap();
        doc.write_element("1").unwrap().write_scalar(&7i32.into()).unwrap();
        doc.write_element("2").unwrap().write_scalar(&"a@b".into()).unwrap();
        doc.end().unwrap();
        let bytes = writer.into_bytes().unwrap();

        let mut decoded = DynamicMessage::new(contact());
        decode_with(&CodecConfig::default(), &bytes, &mut decoded).unwrap();
        assert!(decoded.get_by_name("name").is_none());
        assert_eq!(decoded.get_by_name("email"), Some(&Value::from("a@b")));
    }

    #[test]
    fn test_non_message_rejected() {
        let registry = Registry::with_defaults();
        let config = CodecConfig::default();
        let ctx = EncodeContext::new(&registry, &config);
        let err = MessageCodec::new()
            .encode(&ctx, &mut BinaryWriter::new(), &Value::from(1i32))
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue(_)));
    }

    #[test]
    fn test_borrowed_encode_matches_value_encode() {
        let mut message = DynamicMessage::new(contact());
        message.set_by_name("name", "ada").unwrap();
        message.set_by_name("email", "ada@example.com").unwrap();
        let config = CodecConfig::default();

        let registry = Registry::with_defaults();
        let mut writer = BinaryWriter::new();
        MessageCodec::new()
            .encode_message(&EncodeContext::new(&registry, &config), &mut writer, &message)
            .unwrap();
        assert_eq!(writer.into_bytes().unwrap(), encode_with(&config, &message).unwrap());
    }

    #[test]
    fn test_unstructured_input_is_fatal() {
        let mut decoded = DynamicMessage::new(contact());
        let err = decode_with(&CodecConfig::default(), &[9, 0, 0], &mut decoded).unwrap_err();
        assert!(matches!(err, CodecError::MalformedStream(_)));
    }
}
