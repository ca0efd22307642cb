//! # protodoc
//!
//! Encodes schema-described messages to a document stream and decodes them
//! back.
//!
//! Messages are [`DynamicMessage`](protodoc_schema::DynamicMessage)s built
//! against runtime descriptors. Each value is handed to a codec picked from
//! a [`Registry`](protodoc_codec::Registry) by its schema type; composite
//! codecs dispatch their children back through the registry, so custom
//! codecs plug in at any depth.
//!
//! ```text
//!  DynamicMessage ──► MessageCodec ──► ListCodec / MapCodec / TimestampCodec / BasicCodec
//!        ▲                │                         │
//!        │                ▼                         ▼
//!        └──────── ValueWriter / ValueReader (BinaryWriter, BinaryReader)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use protodoc::prelude::*;
//!
//! let descriptor = MessageDescriptor::builder("demo.Greeting")
//!     .field(1, "text", FieldKind::Scalar(ScalarKind::String))
//!     .build()?;
//! let mut message = DynamicMessage::new(descriptor.clone());
//! message.set_by_name("text", "hello")?;
//!
//! let bytes = protodoc::encode_document(&message)?;
//! let mut decoded = DynamicMessage::new(descriptor);
//! protodoc::decode_document(&bytes, &mut decoded)?;
//! assert_eq!(decoded, message);
//! # Ok::<(), protodoc::ProtodocError>(())
//! ```

mod error;
mod facade;
pub mod logging;

pub use error::ProtodocError;
pub use facade::DocumentCodec;

pub use protodoc_codec as codec;
pub use protodoc_schema as schema;
pub use protodoc_stream as stream;

use std::sync::OnceLock;

use protodoc_schema::DynamicMessage;

fn default_codec() -> &'static DocumentCodec {
    static CODEC: OnceLock<DocumentCodec> = OnceLock::new();
    CODEC.get_or_init(DocumentCodec::default)
}

/// Encodes `message` with the default [`DocumentCodec`].
pub fn encode_document(message: &DynamicMessage) -> Result<Vec<u8>, ProtodocError> {
    default_codec().encode_document(message)
}

/// Decodes `bytes` into `message` with the default [`DocumentCodec`].
pub fn decode_document(bytes: &[u8], message: &mut DynamicMessage) -> Result<(), ProtodocError> {
    default_codec().decode_document(bytes, message)
}

pub mod prelude {
    pub use crate::{DocumentCodec, ProtodocError, decode_document, encode_document};
    pub use protodoc_codec::{
        CodecConfig, CodecError, CodecTag, DecodeContext, EncodeContext, FieldKeyStyle, Registry,
        ValueCodec,
    };
    pub use protodoc_schema::{
        DynamicMessage, ElementType, FieldKind, ListValue, MapKey, MapValue, MessageDescriptor,
        ScalarKind, ScalarValue, Value, well_known,
    };
    pub use protodoc_stream::{BinaryReader, BinaryWriter, ValueReader, ValueWriter};
}
