//! Static message metadata: field and message descriptors.
//!
//! A [`MessageDescriptor`] is built once with [`MessageDescriptorBuilder`]
//! and then shared behind an `Arc`. Nested message types are referenced by
//! `Arc` too, which makes a descriptor graph acyclic by construction: a
//! message can't contain itself, so codec recursion always terminates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{DynamicMessage, ListValue, MapValue, ScalarKind, ScalarValue, SchemaError, Value};

// ---------------------------------------------------------------------------
// ElementType: the type of a list element or map value
// ---------------------------------------------------------------------------

/// The type of a list element or a map value.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Scalar(ScalarKind),
    Enum,
    Message(Arc<MessageDescriptor>),
}

impl ElementType {
    /// Allocates the zero value of this type.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Scalar(kind) => Value::Scalar(ScalarValue::default_for(*kind)),
            Self::Enum => Value::Enum(0),
            Self::Message(descriptor) => {
                Value::Message(DynamicMessage::new(Arc::clone(descriptor)))
            }
        }
    }

    /// Returns `true` if `value` can be stored in a slot of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Scalar(kind), Value::Scalar(scalar)) => scalar.kind() == *kind,
            (Self::Enum, Value::Enum(_)) => true,
            (Self::Message(descriptor), Value::Message(message)) => {
                message.descriptor().full_name() == descriptor.full_name()
            }
            _ => false,
        }
    }

    /// Type identity. Messages compare by full name only.
    pub fn same_type(&self, other: &ElementType) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Enum, Self::Enum) => true,
            (Self::Message(a), Self::Message(b)) => a.full_name() == b.full_name(),
            _ => false,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Enum => f.write_str("enum"),
            Self::Message(descriptor) => f.write_str(descriptor.full_name()),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// What a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum,
    Message(Arc<MessageDescriptor>),
    /// Legacy group encoding; behaves exactly like `Message`.
    Group(Arc<MessageDescriptor>),
    List(ElementType),
    Map { key: ScalarKind, value: ElementType },
}

impl FieldKind {
    /// Allocates the zero value of this field kind.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Scalar(kind) => Value::Scalar(ScalarValue::default_for(*kind)),
            Self::Enum => Value::Enum(0),
            Self::Message(descriptor) | Self::Group(descriptor) => {
                Value::Message(DynamicMessage::new(Arc::clone(descriptor)))
            }
            Self::List(element) => Value::List(ListValue::new(element.clone())),
            Self::Map { key, value } => Value::Map(MapValue::new(*key, value.clone())),
        }
    }

    /// Returns `true` if `value` has the type this field declares.
    ///
    /// Lists and maps are checked by their declared element types, not by
    /// their contents; see [`ListValue::is_valid`] for the deep check.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Scalar(kind), Value::Scalar(scalar)) => scalar.kind() == *kind,
            (Self::Enum, Value::Enum(_)) => true,
            (Self::Message(descriptor) | Self::Group(descriptor), Value::Message(message)) => {
                message.descriptor().full_name() == descriptor.full_name()
            }
            (Self::List(element), Value::List(list)) => list.element_type().same_type(element),
            (Self::Map { key, value: element }, Value::Map(map)) => {
                map.key_kind() == *key && map.value_type().same_type(element)
            }
            _ => false,
        }
    }

    /// The nested message descriptor of a `Message` or `Group` field.
    pub fn message_type(&self) -> Option<&Arc<MessageDescriptor>> {
        match self {
            Self::Message(descriptor) | Self::Group(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Enum => f.write_str("enum"),
            Self::Message(descriptor) | Self::Group(descriptor) => {
                f.write_str(descriptor.full_name())
            }
            Self::List(element) => write!(f, "repeated {element}"),
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// Static metadata of one field.
///
/// `(message full name, number)` identifies a field for good; the name may
/// change between schema versions, which is why the codec keys documents by
/// number.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    number: u32,
    name: String,
    kind: FieldKind,
    oneof: Option<usize>,
}

impl FieldDescriptor {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Index of the containing oneof group in [`MessageDescriptor::oneofs`].
    pub fn oneof(&self) -> Option<usize> {
        self.oneof
    }

    /// Full name of the nested message type, for message and group fields.
    pub fn message_type_name(&self) -> Option<&str> {
        self.kind.message_type().map(|descriptor| descriptor.full_name())
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, FieldKind::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, FieldKind::Map { .. })
    }
}

/// A group of mutually exclusive fields.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    name: String,
    fields: Vec<u32>,
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member field numbers, in declaration order.
    pub fn fields(&self) -> &[u32] {
        &self.fields
    }
}

// ---------------------------------------------------------------------------
// MessageDescriptor
// ---------------------------------------------------------------------------

/// Static metadata of a message type.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    full_name: String,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
    by_number: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl MessageDescriptor {
    /// Starts building a descriptor for `full_name`.
    pub fn builder(full_name: impl Into<String>) -> MessageDescriptorBuilder {
        MessageDescriptorBuilder {
            full_name: full_name.into(),
            fields: Vec::new(),
            oneofs: Vec::new(),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// The field at declaration position `position`.
    pub fn field_at(&self, position: usize) -> Option<&FieldDescriptor> {
        self.fields.get(position)
    }

    /// Returns `true` if `field` is one of this message's fields.
    pub fn contains(&self, field: &FieldDescriptor) -> bool {
        self.field_by_number(field.number())
            .is_some_and(|own| own.name() == field.name())
    }
}

/// Builder for [`MessageDescriptor`].
///
/// ```rust
/// use protodoc_schema::{FieldKind, MessageDescriptor, ScalarKind};
///
/// let descriptor = MessageDescriptor::builder("demo.Pet")
///     .field(1, "name", FieldKind::Scalar(ScalarKind::String))
///     .field(2, "cat_lives", FieldKind::Scalar(ScalarKind::Int32))
///     .field(3, "dog_tricks", FieldKind::Scalar(ScalarKind::Int32))
///     .oneof("species", [2, 3])
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.field_by_name("name").unwrap().number(), 1);
/// assert_eq!(descriptor.field_by_number(3).unwrap().oneof(), Some(0));
/// ```
#[derive(Debug)]
pub struct MessageDescriptorBuilder {
    full_name: String,
    fields: Vec<(u32, String, FieldKind)>,
    oneofs: Vec<(String, Vec<u32>)>,
}

impl MessageDescriptorBuilder {
    /// Declares a field. Declaration order is encoding order.
    pub fn field(mut self, number: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((number, name.into(), kind));
        self
    }

    /// Declares a oneof group over already-declared field numbers.
    pub fn oneof(mut self, name: impl Into<String>, numbers: impl IntoIterator<Item = u32>) -> Self {
        self.oneofs.push((name.into(), numbers.into_iter().collect()));
        self
    }

    /// Validates the declarations and freezes the descriptor.
    ///
    /// # Errors
    /// - [`SchemaError::DuplicateFieldNumber`] / [`SchemaError::DuplicateFieldName`]
    /// - [`SchemaError::UnknownOneofMember`] if a group names a missing field
    /// - [`SchemaError::InvalidOneofMember`] for list/map members or a field
    ///   claimed by two groups
    /// - [`SchemaError::InvalidMapKey`] for map fields keyed by `bytes`
    pub fn build(self) -> Result<Arc<MessageDescriptor>, SchemaError> {
        let full_name = self.full_name;
        let mut by_number = HashMap::new();
        let mut by_name = HashMap::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for (index, (number, name, kind)) in self.fields.into_iter().enumerate() {
            if by_number.insert(number, index).is_some() {
                return Err(SchemaError::DuplicateFieldNumber {
                    message: full_name,
                    number,
                });
            }
            if by_name.insert(name.clone(), index).is_some() {
                return Err(SchemaError::DuplicateFieldName {
                    message: full_name,
                    name,
                });
            }
            if let FieldKind::Map { key, .. } = &kind {
                if !key.is_map_key() {
                    return Err(SchemaError::InvalidMapKey(*key));
                }
            }
            fields.push(FieldDescriptor {
                number,
                name,
                kind,
                oneof: None,
            });
        }

        let mut oneofs = Vec::with_capacity(self.oneofs.len());
        for (group, (name, numbers)) in self.oneofs.into_iter().enumerate() {
            for &number in &numbers {
                let Some(&index) = by_number.get(&number) else {
                    return Err(SchemaError::UnknownOneofMember {
                        message: full_name,
                        oneof: name,
                        number,
                    });
                };
                let field: &mut FieldDescriptor = &mut fields[index];
                if field.oneof.is_some() || field.is_list() || field.is_map() {
                    return Err(SchemaError::InvalidOneofMember {
                        message: full_name,
                        oneof: name,
                        number,
                    });
                }
                field.oneof = Some(group);
            }
            oneofs.push(OneofDescriptor {
                name,
                fields: numbers,
            });
        }

        Ok(Arc::new(MessageDescriptor {
            full_name,
            fields,
            oneofs,
            by_number,
            by_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Arc<MessageDescriptor> {
        MessageDescriptor::builder("test.Nested")
            .field(1, "label", FieldKind::Scalar(ScalarKind::String))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_indexes_fields() {
        let d = MessageDescriptor::builder("test.Outer")
            .field(1, "a", FieldKind::Scalar(ScalarKind::Int32))
            .field(7, "b", FieldKind::Message(nested()))
            .build()
            .unwrap();

        assert_eq!(d.full_name(), "test.Outer");
        assert_eq!(d.field_by_number(7).unwrap().name(), "b");
        assert_eq!(d.field_by_name("a").unwrap().number(), 1);
        assert_eq!(d.field_at(1).unwrap().number(), 7);
        assert!(d.field_by_number(2).is_none());
        assert_eq!(d.field_at(1).unwrap().message_type_name(), Some("test.Nested"));
        assert_eq!(d.field_at(0).unwrap().message_type_name(), None);
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let err = MessageDescriptor::builder("test.Dup")
            .field(1, "a", FieldKind::Enum)
            .field(1, "b", FieldKind::Enum)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldNumber { number: 1, .. }));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = MessageDescriptor::builder("test.Dup")
            .field(1, "a", FieldKind::Enum)
            .field(2, "a", FieldKind::Enum)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldName { .. }));
    }

    #[test]
    fn test_oneof_unknown_member_rejected() {
        let err = MessageDescriptor::builder("test.Oneof")
            .field(1, "a", FieldKind::Enum)
            .oneof("choice", [1, 9])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOneofMember { number: 9, .. }));
    }

    #[test]
    fn test_oneof_list_member_rejected() {
        let err = MessageDescriptor::builder("test.Oneof")
            .field(1, "a", FieldKind::List(ElementType::Enum))
            .oneof("choice", [1])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOneofMember { number: 1, .. }));
    }

    #[test]
    fn test_field_in_two_oneofs_rejected() {
        let err = MessageDescriptor::builder("test.Oneof")
            .field(1, "a", FieldKind::Enum)
            .oneof("first", [1])
            .oneof("second", [1])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOneofMember { .. }));
    }

    #[test]
    fn test_bytes_map_key_rejected() {
        let err = MessageDescriptor::builder("test.Map")
            .field(
                1,
                "m",
                FieldKind::Map {
                    key: ScalarKind::Bytes,
                    value: ElementType::Enum,
                },
            )
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::InvalidMapKey(ScalarKind::Bytes));
    }

    #[test]
    fn test_field_kind_zero_values() {
        assert_eq!(
            FieldKind::Scalar(ScalarKind::String).zero_value(),
            Value::Scalar(ScalarValue::String(String::new()))
        );
        assert_eq!(FieldKind::Enum.zero_value(), Value::Enum(0));
        assert!(matches!(FieldKind::Message(nested()).zero_value(), Value::Message(_)));
        assert!(matches!(
            FieldKind::List(ElementType::Enum).zero_value(),
            Value::List(list) if list.is_empty()
        ));
    }

    #[test]
    fn test_field_kind_accepts() {
        let kind = FieldKind::List(ElementType::Scalar(ScalarKind::String));
        assert!(kind.accepts(&kind.zero_value()));
        assert!(!kind.accepts(&Value::Enum(1)));
        assert!(!FieldKind::Message(nested()).accepts(&Value::from(1i32)));
    }

    #[test]
    fn test_field_kind_display() {
        let kind = FieldKind::Map {
            key: ScalarKind::Int64,
            value: ElementType::Message(nested()),
        };
        assert_eq!(kind.to_string(), "map<int64, test.Nested>");
    }
}
