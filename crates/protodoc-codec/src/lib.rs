//! Recursive codecs between dynamic messages and document streams.
//!
//! A [`Registry`] binds generic kinds (message, list, map) and specific
//! message types to [`ValueCodec`]s. Encoding a message walks its fields
//! and hands each value to the codec the registry picks for it; those
//! codecs recurse the same way into nested messages, lists, and maps.
//! Scalars and enums always land in the [`BasicCodec`].
//!
//! ```text
//! MessageCodec ──field──→ Registry ──→ ListCodec / MapCodec / TimestampCodec
//!      ↑                     │              │
//!      └─────nested message──┴──────────────┘        scalars → BasicCodec
//! ```
//!
//! Codecs hold no state. The registry, the [`CodecConfig`], and the current
//! nesting depth travel in an [`EncodeContext`] / [`DecodeContext`].

mod basic;
mod config;
mod context;
mod error;
mod list;
mod map;
mod message;
mod registry;
mod timestamp;

use std::fmt::Debug;

use protodoc_schema::{DynamicMessage, Value};
use protodoc_stream::{ValueReader, ValueWriter};

pub use basic::BasicCodec;
pub use config::{CodecConfig, ENV_FIELD_KEYS, ENV_MAX_DEPTH, ENV_STRICT, FieldKeyStyle};
pub use context::{DecodeContext, EncodeContext};
pub use error::CodecError;
pub use list::ListCodec;
pub use map::{KEY_DELIMITER, MapCodec, decode_map_key, encode_map_key};
pub use message::MessageCodec;
pub use registry::{CodecTag, KindTag, Registry};
pub use timestamp::TimestampCodec;

/// Encodes one kind of [`Value`] into a stream and decodes it back.
///
/// `decode` writes into a value the caller allocated with the right shape
/// (a zero value from the field, list, or map that will own it), so a codec
/// always knows the target type without looking at the input.
pub trait ValueCodec: Send + Sync + Debug {
    /// Writes `value` at the writer's current position.
    ///
    /// # Errors
    /// Any error aborts the encode; the writer's output must be discarded.
    fn encode(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        value: &Value,
    ) -> Result<(), CodecError>;

    /// Writes a root message without wrapping it in a [`Value`].
    ///
    /// The default clones `message` into a [`Value::Message`] and calls
    /// [`ValueCodec::encode`]. Message-level codecs override it to borrow.
    fn encode_message(
        &self,
        ctx: &EncodeContext<'_>,
        writer: &mut dyn ValueWriter,
        message: &DynamicMessage,
    ) -> Result<(), CodecError> {
        self.encode(ctx, writer, &Value::Message(message.clone()))
    }

    /// Reads the reader's value into `value`.
    fn decode(
        &self,
        ctx: &DecodeContext<'_>,
        reader: &mut dyn ValueReader,
        value: &mut Value,
    ) -> Result<(), CodecError>;
}
