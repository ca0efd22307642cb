//! Per-call state handed down through recursive encode and decode.

use protodoc_schema::{FieldDescriptor, Value};
use protodoc_stream::{ValueReader, ValueWriter};

use crate::{CodecConfig, CodecError, Registry};

/// State of one encode call: where to find codecs, how to behave, and how
/// deep the current value sits.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    registry: &'a Registry,
    config: &'a CodecConfig,
    depth: usize,
}

impl<'a> EncodeContext<'a> {
    /// A context for the root value.
    pub fn new(registry: &'a Registry, config: &'a CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A context one level deeper.
    ///
    /// # Errors
    /// [`CodecError::DepthLimitExceeded`] past `config.max_depth`.
    pub fn child(&self) -> Result<Self, CodecError> {
        let depth = child_depth(self.depth, self.config)?;
        Ok(Self { depth, ..*self })
    }

    /// Encodes the value of `field` with the codec the registry binds to it.
    pub fn encode_field(
        &self,
        writer: &mut dyn ValueWriter,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<(), CodecError> {
        let codec = self.registry.codec_for_field(field)?;
        let ctx = self.descend(value)?;
        codec.encode(&ctx, writer, value)
    }

    /// Encodes a list element or map value, dispatching on its variant.
    pub fn encode_value(&self, writer: &mut dyn ValueWriter, value: &Value) -> Result<(), CodecError> {
        let codec = self.registry.codec_for_value(value)?;
        let ctx = self.descend(value)?;
        codec.encode(&ctx, writer, value)
    }

    fn descend(&self, value: &Value) -> Result<Self, CodecError> {
        if value.kind().is_composite() {
            self.child()
        } else {
            Ok(*self)
        }
    }
}

/// State of one decode call. See [`EncodeContext`].
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    registry: &'a Registry,
    config: &'a CodecConfig,
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    /// A context for the root value.
    pub fn new(registry: &'a Registry, config: &'a CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A context one level deeper.
    ///
    /// # Errors
    /// [`CodecError::DepthLimitExceeded`] past `config.max_depth`.
    pub fn child(&self) -> Result<Self, CodecError> {
        let depth = child_depth(self.depth, self.config)?;
        Ok(Self { depth, ..*self })
    }

    /// Decodes into `value`, a fresh value for `field`.
    pub fn decode_field(
        &self,
        reader: &mut dyn ValueReader,
        field: &FieldDescriptor,
        value: &mut Value,
    ) -> Result<(), CodecError> {
        let codec = self.registry.codec_for_field(field)?;
        let ctx = self.descend(value)?;
        codec.decode(&ctx, reader, value)
    }

    /// Decodes into a fresh list element or map value, dispatching on its
    /// variant.
    pub fn decode_value(&self, reader: &mut dyn ValueReader, value: &mut Value) -> Result<(), CodecError> {
        let codec = self.registry.codec_for_value(value)?;
        let ctx = self.descend(value)?;
        codec.decode(&ctx, reader, value)
    }

    /// Whether a failed field, element, or entry aborts the whole decode
    /// instead of being skipped.
    pub fn aborts_on(&self, err: &CodecError) -> bool {
        self.config.strict || err.is_fatal()
    }

    fn descend(&self, value: &Value) -> Result<Self, CodecError> {
        if value.kind().is_composite() {
            self.child()
        } else {
            Ok(*self)
        }
    }
}

fn child_depth(depth: usize, config: &CodecConfig) -> Result<usize, CodecError> {
    let depth = depth + 1;
    if depth > config.max_depth {
        return Err(CodecError::DepthLimitExceeded {
            max: config.max_depth,
        });
    }
    Ok(depth)
}
