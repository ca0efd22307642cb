//! Codec for repeated values.

use protodoc_schema::Value;
use protodoc_stream::{ArrayElement, ValueReader, ValueWriter};

use crate::{CodecError, DecodeContext, EncodeContext, ValueCodec};

/// Encodes a [`ListValue`](protodoc_schema::ListValue) as an array block,
/// one element per item, in order.
#[derive(Debug, Default)]
pub struct ListCodec;

impl ListCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec for ListCodec {
    fn encode(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError> {
        let Value::List(list) = value else {
            return Err(CodecError::InvalidValue(format!(
                "list codec given a {} value",
                value.kind()
            )));
        };
        if !list.is_valid() {
            return Err(CodecError::InvalidValue(format!(
                "list holds values that are not {}",
                list.element_type()
            )));
        }

        let array = writer.write_array()?;
        for item in list {
            ctx.encode_value(array.write_element()?, item)?;
        }
        array.end()?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &DecodeContext<'_>,
        reader: &mut dyn ValueReader,
        value: &mut Value,
    ) -> Result<(), CodecError> {
        let kind = value.kind();
        let Some(list) = value.as_list_mut() else {
            return Err(CodecError::InvalidValue(format!(
                "list codec given a {kind} value"
            )));
        };

        let mut array = reader.read_array()?;
        let mut index = 0usize;
        loop {
            let mut element_reader = match array.read_element() {
                Ok(ArrayElement::Value(element_reader)) => element_reader,
                Ok(ArrayElement::End) => break,
                Err(err) => {
                    if ctx.config().strict {
                        return Err(err.into());
                    }
                    tracing::warn!(index, error = %err, "unreadable list element, ending list");
                    break;
                }
            };

            let mut element = list.new_element();
            match ctx.decode_value(element_reader.as_mut(), &mut element) {
                Ok(()) => list.append(element),
                Err(err) if ctx.aborts_on(&err) => return Err(err),
                Err(err) => {
                    tracing::warn!(index, error = %err, "skipping list element that failed to decode");
                }
            }
            index += 1;
        }
        Ok(())
    }
}
