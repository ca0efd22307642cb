//! Codec for maps, and the map-key token scheme.
//!
//! Document keys are strings, but map keys can be any scalar except bytes.
//! A non-string key is written as a *token*: the key's text, a `|`, and
//! the numeric kind tag of its type, so `42i64` becomes `"42|6"` and
//! `true` becomes `"true|1"`. String keys are written verbatim.
//!
//! A string key that itself ends in `|<known tag>` reads back as a typed
//! key through [`decode_map_key`]. [`MapCodec`] avoids that: when the map
//! it decodes into has string keys it takes every token verbatim.

use protodoc_schema::{MapKey, ScalarKind, Value};
use protodoc_stream::{DocumentElement, ValueReader, ValueWriter};

use crate::{CodecError, DecodeContext, EncodeContext, ValueCodec};

/// Separates a key's text from its kind tag.
pub const KEY_DELIMITER: char = '|';

/// Renders `key` as a document key.
///
/// Document keys are NUL-terminated, so [`MapCodec`] refuses string keys
/// containing `\0` with [`CodecError::MapKey`].
pub fn encode_map_key(key: &MapKey) -> String {
    match key {
        MapKey::String(s) => s.clone(),
        other => format!("{other}{KEY_DELIMITER}{}", other.kind().tag()),
    }
}

/// Parses a document key written by [`encode_map_key`].
///
/// Tokens without a delimiter, with an unknown or string kind tag, or whose
/// text doesn't parse as the tagged kind come back whole as string keys.
pub fn decode_map_key(token: &str) -> MapKey {
    token
        .rsplit_once(KEY_DELIMITER)
        .and_then(|(text, tag)| {
            let kind = tag.parse::<u8>().ok().and_then(ScalarKind::from_tag)?;
            if kind == ScalarKind::String {
                return None;
            }
            MapKey::parse(kind, text)
        })
        .unwrap_or_else(|| MapKey::String(token.to_owned()))
}

/// Encodes a [`MapValue`](protodoc_schema::MapValue) as a document block,
/// one element per entry, keyed by token.
///
/// Entries are written in token order, so equal maps always produce equal
/// bytes.
#[derive(Debug, Default)]
pub struct MapCodec;

impl MapCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec for MapCodec {
    fn encode(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError> {
        let Value::Map(map) = value else {
            return Err(CodecError::InvalidValue(format!(
                "map codec given a {} value",
                value.kind()
            )));
        };
        if !map.key_kind().is_map_key() {
            return Err(CodecError::MapKey(format!(
                "{} cannot be a map key",
                map.key_kind()
            )));
        }
        if !map.is_valid() {
            return Err(CodecError::InvalidValue(format!(
                "map entries do not match map<{}, {}>",
                map.key_kind(),
                map.value_type()
            )));
        }

        let mut entries: Vec<(String, &Value)> = map
            .iter()
            .map(|(key, value)| (encode_map_key(key), value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some((token, _)) = entries.iter().find(|(token, _)| token.contains('\0')) {
            return Err(CodecError::MapKey(format!(
                "key {token:?} contains NUL, which document keys cannot hold"
            )));
        }

        let doc = writer.write_document()?;
        for (token, value) in entries {
            ctx.encode_value(doc.write_element(&token)?, value)?;
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
        let Some(map) = value.as_map_mut() else {
            return Err(CodecError::InvalidValue(format!(
                "map codec given a {kind} value"
            )));
        };
        let key_kind = map.key_kind();
        if !key_kind.is_map_key() {
            return Err(CodecError::MapKey(format!("{key_kind} cannot be a map key")));
        }

        let mut doc = reader.read_document()?;
        loop {
            let (token, mut entry_reader) = match doc.read_element()? {
                DocumentElement::Field { key, value: entry } => (key, entry),
                DocumentElement::End => break,
            };

            let key = if key_kind == ScalarKind::String {
                MapKey::String(token.clone())
            } else {
                decode_map_key(&token)
            };
            if key.kind() != key_kind {
                let err = CodecError::MapKey(format!(
                    "token {token:?} is not a {key_kind} key"
                ));
                if ctx.config().strict {
                    return Err(err);
                }
                tracing::warn!(%token, error = %err, "skipping map entry");
                continue;
            }

            let mut entry = map.new_value();
            match ctx.decode_value(entry_reader.as_mut(), &mut entry) {
                Ok(()) => map.set(key, entry),
                Err(err) if ctx.aborts_on(&err) => return Err(err),
                Err(err) => {
                    tracing::warn!(%token, error = %err, "skipping map entry that failed to decode");
                }
            }
        }
        Ok(())
    }
}
