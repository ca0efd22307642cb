//! Codec registry: binds kind tags and message types to codecs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use protodoc_schema::{FieldDescriptor, FieldKind, Value, well_known};

use crate::{
    BasicCodec, CodecError, ListCodec, MapCodec, MessageCodec, TimestampCodec, ValueCodec,
};

// ---------------------------------------------------------------------------
// CodecTag
// ---------------------------------------------------------------------------

/// The generic kinds a codec can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Message,
    List,
    Map,
}

/// What a codec is bound to: a generic kind, or one message type by its
/// fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodecTag {
    Kind(KindTag),
    Type(String),
}

impl CodecTag {
    /// Tag for a specific message type.
    pub fn message_type(full_name: impl Into<String>) -> Self {
        Self::Type(full_name.into())
    }
}

impl fmt::Display for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(KindTag::Message) => f.write_str("kind:message"),
            Self::Kind(KindTag::List) => f.write_str("kind:list"),
            Self::Kind(KindTag::Map) => f.write_str("kind:map"),
            Self::Type(name) => write!(f, "type:{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup table from [`CodecTag`]s to codecs.
///
/// Lookups take a read lock and clone the codec's `Arc`, so many encodes
/// and decodes can dispatch concurrently. Registration takes the write
/// lock; it is meant for start-up, before the registry is shared.
///
/// The [`BasicCodec`] is not stored under a tag. Scalars and enums always
/// go to it; messages, lists, and maps never do.
pub struct Registry {
    codecs: RwLock<HashMap<CodecTag, Arc<dyn ValueCodec>>>,
    basic: Arc<BasicCodec>,
}

impl Registry {
    /// A registry holding only the basic codec.
    pub fn new() -> Self {
        Self {
            codecs: RwLock::new(HashMap::new()),
            basic: Arc::new(BasicCodec::new()),
        }
    }

    /// A registry with the built-in message, list, map, and timestamp
    /// codecs bound.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let defaults: [(CodecTag, Arc<dyn ValueCodec>); 4] = [
            (CodecTag::Kind(KindTag::Message), Arc::new(MessageCodec::new())),
            (CodecTag::Kind(KindTag::List), Arc::new(ListCodec::new())),
            (CodecTag::Kind(KindTag::Map), Arc::new(MapCodec::new())),
            (
                CodecTag::message_type(well_known::TIMESTAMP_FULL_NAME),
                Arc::new(TimestampCodec::new()),
            ),
        ];
        {
            let mut codecs = registry.codecs.write();
            codecs.extend(defaults);
        }
        registry
    }

    /// The process-wide default registry, built with
    /// [`Registry::with_defaults`] on first use.
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            tracing::debug!("initialising global codec registry");
            Arc::new(Registry::with_defaults())
        }))
    }

    /// Binds `codec` under `tag`.
    ///
    /// Re-registering the same instance is a no-op.
    ///
    /// # Errors
    /// [`CodecError::DuplicateBinding`] if `tag` is bound to a different
    /// codec.
    pub fn register(&self, tag: CodecTag, codec: Arc<dyn ValueCodec>) -> Result<(), CodecError> {
        let mut codecs = self.codecs.write();
        match codecs.get(&tag) {
            Some(existing) if Arc::ptr_eq(existing, &codec) => Ok(()),
            Some(_) => Err(CodecError::DuplicateBinding(tag)),
            None => {
                tracing::debug!(%tag, "codec registered");
                codecs.insert(tag, codec);
                Ok(())
            }
        }
    }

    /// Direct lookup.
    pub fn get_by_kind(&self, tag: &CodecTag) -> Option<Arc<dyn ValueCodec>> {
        self.codecs.read().get(tag).cloned()
    }

    /// The codec for messages of type `full_name`: a codec registered for
    /// exactly that type wins over the generic message codec.
    pub fn get_for_message(&self, full_name: &str) -> Option<Arc<dyn ValueCodec>> {
        let codecs = self.codecs.read();
        codecs
            .get(&CodecTag::message_type(full_name))
            .or_else(|| codecs.get(&CodecTag::Kind(KindTag::Message)))
            .cloned()
    }

    /// The codec for values of `field`, or `None` for scalar and enum
    /// fields.
    pub fn get_by_field(&self, field: &FieldDescriptor) -> Option<Arc<dyn ValueCodec>> {
        match field.kind() {
            FieldKind::List(_) => self.get_by_kind(&CodecTag::Kind(KindTag::List)),
            FieldKind::Map { .. } => self.get_by_kind(&CodecTag::Kind(KindTag::Map)),
            FieldKind::Message(descriptor) | FieldKind::Group(descriptor) => {
                self.get_for_message(descriptor.full_name())
            }
            FieldKind::Scalar(_) | FieldKind::Enum => None,
        }
    }

    /// The codec for `value`, chosen by its variant. `None` for scalars and
    /// enums.
    pub fn get_by_value(&self, value: &Value) -> Option<Arc<dyn ValueCodec>> {
        match value {
            Value::List(_) => self.get_by_kind(&CodecTag::Kind(KindTag::List)),
            Value::Map(_) => self.get_by_kind(&CodecTag::Kind(KindTag::Map)),
            Value::Message(message) => self.get_for_message(message.descriptor().full_name()),
            Value::Scalar(_) | Value::Enum(_) => None,
        }
    }

    /// The leaf codec for scalars and enums.
    pub fn basic(&self) -> &BasicCodec {
        &self.basic
    }

    /// The codec for `field`: the basic codec for scalar and enum fields,
    /// otherwise the bound codec.
    ///
    /// # Errors
    /// [`CodecError::CodecNotFound`] if a message, list, or map field has
    /// no codec bound.
    pub fn codec_for_field(&self, field: &FieldDescriptor) -> Result<Arc<dyn ValueCodec>, CodecError> {
        match field.kind() {
            FieldKind::Scalar(_) | FieldKind::Enum => Ok(self.basic_codec()),
            FieldKind::List(_) => self.require(KindTag::List),
            FieldKind::Map { .. } => self.require(KindTag::Map),
            FieldKind::Message(descriptor) | FieldKind::Group(descriptor) => {
                self.require_message(descriptor.full_name())
            }
        }
    }

    /// The codec for `value`, chosen by its variant. See
    /// [`Registry::codec_for_field`].
    pub fn codec_for_value(&self, value: &Value) -> Result<Arc<dyn ValueCodec>, CodecError> {
        match value {
            Value::Scalar(_) | Value::Enum(_) => Ok(self.basic_codec()),
            Value::List(_) => self.require(KindTag::List),
            Value::Map(_) => self.require(KindTag::Map),
            Value::Message(message) => self.require_message(message.descriptor().full_name()),
        }
    }

    /// Every bound tag, in no particular order.
    pub fn registered_tags(&self) -> Vec<CodecTag> {
        self.codecs.read().keys().cloned().collect()
    }

    fn basic_codec(&self) -> Arc<dyn ValueCodec> {
        self.basic.clone()
    }

    fn require(&self, kind: KindTag) -> Result<Arc<dyn ValueCodec>, CodecError> {
        let tag = CodecTag::Kind(kind);
        self.get_by_kind(&tag)
            .ok_or_else(|| CodecError::CodecNotFound(tag.to_string()))
    }

    fn require_message(&self, full_name: &str) -> Result<Arc<dyn ValueCodec>, CodecError> {
        self.get_for_message(full_name)
            .ok_or_else(|| CodecError::CodecNotFound(full_name.to_owned()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<String> = self.codecs.read().keys().map(ToString::to_string).collect();
        tags.sort();
        f.debug_struct("Registry").field("tags", &tags).finish()
    }
}
