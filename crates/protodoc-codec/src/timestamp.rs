//! Codec for `google.protobuf.Timestamp`.

use protodoc_schema::well_known::{self, TIMESTAMP_FULL_NAME};
use protodoc_schema::{DynamicMessage, Value};
use protodoc_stream::{ValueReader, ValueWriter};

use crate::{CodecError, DecodeContext, EncodeContext, ValueCodec};

/// Writes a timestamp message as the stream's native timestamp instead of
/// a two-field document.
///
/// Bound under `Type("google.protobuf.Timestamp")` in
/// [`Registry::with_defaults`](crate::Registry::with_defaults).
#[derive(Debug, Default)]
pub struct TimestampCodec;

impl TimestampCodec {
    pub fn new() -> Self {
        Self
    }
}

fn expect_timestamp(value: &Value) -> Result<&DynamicMessage, CodecError> {
    match value {
        Value::Message(message) => expect_timestamp_message(message),
        other => Err(CodecError::WrongMessageType {
            expected: TIMESTAMP_FULL_NAME.to_owned(),
            found: other.kind().to_string(),
        }),
    }
}

fn expect_timestamp_message(message: &DynamicMessage) -> Result<&DynamicMessage, CodecError> {
    let found = message.descriptor().full_name();
    if found == TIMESTAMP_FULL_NAME {
        Ok(message)
    } else {
        Err(CodecError::WrongMessageType {
            expected: TIMESTAMP_FULL_NAME.to_owned(),
            found: found.to_owned(),
        })
    }
}

/// Stores `seconds` at position 0 and `nanos` at position 1, leaving zero
/// sub-fields unset like [`well_known::timestamp`] does.
fn set_parts(message: &mut DynamicMessage, seconds: i64, nanos: i32) -> Result<(), CodecError> {
    let descriptor = std::sync::Arc::clone(message.descriptor());
    let parts = [(0, Value::from(seconds)), (1, Value::from(nanos))];
    for (position, part) in parts {
        let field = descriptor.field_at(position).ok_or_else(|| {
            CodecError::InvalidValue(format!(
                "{TIMESTAMP_FULL_NAME} has no field at position {position}"
            ))
        })?;
        if part == field.kind().zero_value() {
            message.clear(field);
        } else {
            message.set(field, part)?;
        }
    }
    Ok(())
}

impl ValueCodec for TimestampCodec {
    fn encode(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError> {
        self.encode_message(ctx, writer, expect_timestamp(value)?)
    }

    fn encode_message(
        &self,
        _ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        message: &DynamicMessage,
    ) -> Result<(), CodecError> {
        let message = expect_timestamp_message(message)?;
        let (seconds, nanos) = well_known::timestamp_parts(message).unwrap_or_default();
        writer.write_timestamp(seconds, nanos)?;
        Ok(())
    }

    fn decode(
        &self,
        _ctx: &DecodeContext<'_>,
        reader: &mut dyn ValueReader,
        value: &mut Value,
    ) -> Result<(), CodecError> {
        expect_timestamp(value)?;
        let (seconds, nanos) = reader.read_timestamp()?;
        if let Some(message) = value.as_message_mut() {
            set_parts(message, seconds, nanos)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use protodoc_schema::MessageDescriptor;
    use protodoc_stream::{BinaryReader, BinaryWriter, DocumentElement};

    use super::*;
    use crate::{CodecConfig, Registry};

    fn round_trip(message: DynamicMessage) -> Result<Value, CodecError> {
        let registry = Registry::new();
        let config = CodecConfig::default();
        let codec = TimestampCodec::new();

        let mut writer = BinaryWriter::new();
        let doc = writer.write_document()?;
        codec.encode(
            &EncodeContext::new(&registry, &config),
            doc.write_element("t")?,
            &Value::Message(message),
        )?;
        doc.end()?;
        let bytes = writer.into_bytes()?;

        let mut target = Value::Message(DynamicMessage::new(well_known::timestamp_descriptor()));
        let mut reader = BinaryReader::new(&bytes);
        let mut doc = reader.read_document()?;
        if let DocumentElement::Field { mut value, .. } = doc.read_element()? {
            codec.decode(&DecodeContext::new(&registry, &config), value.as_mut(), &mut target)?;
        }
        Ok(target)
    }

    #[test]
    fn test_round_trip_exact() {
        for (seconds, nanos) in [(1_700_000_000, 123_456_789), (-1, 999_999_999), (0, 0), (0, 1)] {
            let decoded = round_trip(well_known::timestamp(seconds, nanos)).unwrap();
            assert_eq!(decoded, Value::Message(well_known::timestamp(seconds, nanos)));
            let parts = well_known::timestamp_parts(decoded.as_message().unwrap());
            assert_eq!(parts, Some((seconds, nanos)));
        }
    }

    #[test]
    fn test_wrong_message_type() {
        let other = MessageDescriptor::builder("test.NotATimestamp").build().unwrap();
        let err = round_trip(DynamicMessage::new(other)).unwrap_err();
        assert_eq!(
            err,
            CodecError::WrongMessageType {
                expected: TIMESTAMP_FULL_NAME.into(),
                found: "test.NotATimestamp".into()
            }
        );
    }

    #[test]
    fn test_borrowed_encode_checks_type() {
        let registry = Registry::new();
        let config = CodecConfig::default();
        let ctx = EncodeContext::new(&registry, &config);
        let other = MessageDescriptor::builder("test.NotATimestamp").build().unwrap();
        let err = TimestampCodec::new()
            .encode_message(&ctx, &mut BinaryWriter::new(), &DynamicMessage::new(other))
            .unwrap_err();
        assert!(matches!(err, CodecError::WrongMessageType { .. }));
    }

    #[test]
    fn test_decode_into_wrong_type() {
        let registry = Registry::new();
        let config = CodecConfig::default();
        let mut target = Value::from(5i64);
        let err = TimestampCodec::new()
            .decode(
                &DecodeContext::new(&registry, &config),
                &mut BinaryReader::new(&[]),
                &mut target,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::WrongMessageType { .. }));
    }
}
