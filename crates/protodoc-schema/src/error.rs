//! Error types for the schema layer.
//!
//! These are raised while building descriptors or while mutating dynamic
//! values in a way the schema forbids. The codec layer wraps them, so a
//! `SchemaError` reaching a caller always means the *shape* of a value or
//! descriptor was wrong, never the bytes.

use crate::{ScalarKind, ValueKind};

/// Errors that can occur while building or using a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Two fields of one message share a number.
    #[error("message {message}: duplicate field number {number}")]
    DuplicateFieldNumber { message: String, number: u32 },

    /// Two fields of one message share a name.
    #[error("message {message}: duplicate field name {name:?}")]
    DuplicateFieldName { message: String, name: String },

    /// A oneof group names a field number the message doesn't declare.
    #[error("message {message}: oneof {oneof:?} references unknown field {number}")]
    UnknownOneofMember {
        message: String,
        oneof: String,
        number: u32,
    },

    /// A list or map field was placed inside a oneof group, or a field was
    /// placed in two groups.
    #[error("message {message}: field {number} cannot be a member of oneof {oneof:?}")]
    InvalidOneofMember {
        message: String,
        oneof: String,
        number: u32,
    },

    /// A map key of a kind that cannot be used as a key.
    #[error("invalid map key kind: {0}")]
    InvalidMapKey(ScalarKind),

    /// A value doesn't match the declared type of its slot.
    #[error("field {field:?}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: ValueKind,
    },

    /// The field doesn't belong to this message.
    #[error("message {message} has no field {field:?}")]
    UnknownField { message: String, field: String },
}
