//! Leaf codec for scalars and enums.

use protodoc_schema::{ScalarKind, ScalarValue, Value, ValueKind};
use protodoc_stream::{ValueReader, ValueWriter};

use crate::{CodecError, DecodeContext, EncodeContext, ValueCodec};

/// Kinds the stream has no native type for, and the kind they travel as.
const CONVERTIBLE: &[(ValueKind, ScalarKind)] = &[(ValueKind::Enum, ScalarKind::Int32)];

/// Writes scalars and enums with the stream's native scalar types.
///
/// Enum numbers are written as `int32` and turned back into enums on
/// decode. Messages, lists, and maps are rejected with
/// [`CodecError::UnsupportedType`].
#[derive(Debug, Default)]
pub struct BasicCodec;

impl BasicCodec {
    pub fn new() -> Self {
        Self
    }

    /// The kind a value of `kind` is written as, or `None` for composites.
    pub fn canonical_kind(kind: ValueKind) -> Option<ScalarKind> {
        if let Some(&(_, canonical)) = CONVERTIBLE.iter().find(|(from, _)| *from == kind) {
            return Some(canonical);
        }
        match kind {
            ValueKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Writes a scalar or enum value.
    pub fn encode_value(&self, writer: &mut dyn ValueWriter, value: &Value) -> Result<(), CodecError> {
        let scalar = match value {
            Value::Scalar(scalar) => scalar.clone(),
            Value::Enum(number) => ScalarValue::Int32(*number),
            Value::Message(_) | Value::List(_) | Value::Map(_) => {
                return Err(CodecError::UnsupportedType(value.kind()));
            }
        };
        writer.write_scalar(&scalar)?;
        Ok(())
    }

    /// Reads a value of `target` kind.
    pub fn decode_kind(&self, reader: &mut dyn ValueReader, target: ValueKind) -> Result<Value, CodecError> {
        let canonical = Self::canonical_kind(target).ok_or(CodecError::UnsupportedType(target))?;
        let scalar = reader.read_scalar(canonical)?;
        match (target, scalar) {
            (ValueKind::Enum, ScalarValue::Int32(number)) => Ok(Value::Enum(number)),
            (ValueKind::Scalar(_), scalar) => Ok(Value::Scalar(scalar)),
            (target, scalar) => Err(CodecError::InvalidValue(format!(
                "read {} where {target} was expected",
                scalar.kind()
            ))),
        }
    }
}

impl ValueCodec for BasicCodec {
    fn encode(
        &self,
        _ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError> {
        self.encode_value(writer, value)
    }

    fn decode(
        &self,
        _ctx: &DecodeContext<'_>,
        reader: &mut dyn ValueReader,
        value: &mut Value,
    ) -> Result<(), CodecError> {
        *value = self.decode_kind(reader, value.kind())?;
        Ok(())
    }
}
