//! Reflective message model for protodoc.
//!
//! This crate is the "what" that the codec walks over:
//!
//! - **Descriptors** ([`MessageDescriptor`], [`FieldDescriptor`],
//!   [`FieldKind`]): static metadata of message types.
//! - **Values** ([`Value`], [`DynamicMessage`], [`ListValue`],
//!   [`MapValue`]): instances driven by those descriptors.
//! - **Well-known types** ([`well_known`]): the timestamp message.
//! - **Errors** ([`SchemaError`]): invalid descriptors or mistyped values.
//!
//! ```text
//! MessageDescriptor ──describes──→ DynamicMessage ──holds──→ Value
//! ```

mod descriptor;
mod error;
mod kind;
mod value;
pub mod well_known;

pub use descriptor::{
    ElementType, FieldDescriptor, FieldKind, MessageDescriptor, MessageDescriptorBuilder,
    OneofDescriptor,
};
pub use error::SchemaError;
pub use kind::{ScalarKind, ScalarValue, ValueKind};
pub use value::{DynamicMessage, ListValue, MapKey, MapValue, Value};
