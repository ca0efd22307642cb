//! Dynamic values: the reflective message, list, and map containers.
//!
//! [`Value`] is a sealed tagged union. A codec that only holds a value
//! (a list element, a map value) can always tell what it is by matching on
//! the variant; there is no need to try an accessor and see if it fails.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    ElementType, FieldDescriptor, MessageDescriptor, ScalarKind, ScalarValue, SchemaError,
    ValueKind,
};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Any value a field, list element, or map entry can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(ScalarValue),
    /// An enum ordinal.
    Enum(i32),
    Message(DynamicMessage),
    List(ListValue),
    Map(MapValue),
}

impl Value {
    /// The kind of the active variant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(scalar) => ValueKind::Scalar(scalar.kind()),
            Self::Enum(_) => ValueKind::Enum,
            Self::Message(_) => ValueKind::Message,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i32> {
        match self {
            Self::Enum(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListValue> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut MapValue> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Scalar(ScalarValue::from(v))
                }
            }
        )*
    };
}

value_from_scalar!(bool, i32, i64, u32, u64, f32, f64, &str, String, Vec<u8>);

impl From<ScalarValue> for Value {
    fn from(v: ScalarValue) -> Self {
        Self::Scalar(v)
    }
}

impl From<DynamicMessage> for Value {
    fn from(v: DynamicMessage) -> Self {
        Self::Message(v)
    }
}

impl From<ListValue> for Value {
    fn from(v: ListValue) -> Self {
        Self::List(v)
    }
}

impl From<MapValue> for Value {
    fn from(v: MapValue) -> Self {
        Self::Map(v)
    }
}

// ---------------------------------------------------------------------------
// DynamicMessage
// ---------------------------------------------------------------------------

/// A message instance driven entirely by its descriptor.
///
/// Fields that were never set are absent, not zero: [`DynamicMessage::get`]
/// returns `None` for them and the codec omits them from documents.
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    fields: BTreeMap<u32, Value>,
}

impl DynamicMessage {
    /// Creates an empty message of the given type.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// The value of `field`, or `None` if it is unset.
    pub fn get(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(&field.number())
    }

    pub fn get_mut(&mut self, field: &FieldDescriptor) -> Option<&mut Value> {
        self.fields.get_mut(&field.number())
    }

    /// The value of `field`, or its zero value if it is unset.
    pub fn get_or_default(&self, field: &FieldDescriptor) -> Value {
        self.get(field)
            .cloned()
            .unwrap_or_else(|| field.kind().zero_value())
    }

    /// Looks a field up by name and returns its value.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor.field_by_name(name)?;
        self.fields.get(&field.number())
    }

    pub fn has(&self, field: &FieldDescriptor) -> bool {
        self.fields.contains_key(&field.number())
    }

    /// Sets `field` to `value`.
    ///
    /// Setting a member of a oneof group clears every other member of the
    /// same group, so at most one member is ever set.
    ///
    /// # Errors
    /// - [`SchemaError::UnknownField`] if `field` belongs to another message
    /// - [`SchemaError::TypeMismatch`] if `value` doesn't fit the field
    pub fn set(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), SchemaError> {
        if !self.descriptor.contains(field) {
            return Err(SchemaError::UnknownField {
                message: self.descriptor.full_name().to_owned(),
                field: field.name().to_owned(),
            });
        }
        if !field.kind().accepts(&value) {
            return Err(SchemaError::TypeMismatch {
                field: field.name().to_owned(),
                expected: field.kind().to_string(),
                found: value.kind(),
            });
        }
        if let Some(group) = field.oneof() {
            let siblings = self.descriptor.oneofs()[group].fields();
            self.fields.retain(|number, _| !siblings.contains(number));
        }
        self.fields.insert(field.number(), value);
        Ok(())
    }

    /// Sets a field by name. See [`DynamicMessage::set`].
    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = descriptor
            .field_by_name(name)
            .ok_or_else(|| SchemaError::UnknownField {
                message: descriptor.full_name().to_owned(),
                field: name.to_owned(),
            })?;
        self.set(field, value.into())
    }

    /// Unsets `field`.
    pub fn clear(&mut self, field: &FieldDescriptor) -> Option<Value> {
        self.fields.remove(&field.number())
    }

    /// Allocates the zero value for `field`, ready to be decoded into.
    pub fn new_field_value(&self, field: &FieldDescriptor) -> Value {
        field.kind().zero_value()
    }

    /// The member of oneof group `group` that is currently set, if any.
    pub fn active_oneof_field(&self, group: usize) -> Option<&FieldDescriptor> {
        let oneof = self.descriptor.oneofs().get(group)?;
        oneof
            .fields()
            .iter()
            .find(|number| self.fields.contains_key(number))
            .and_then(|&number| self.descriptor.field_by_number(number))
    }

    /// Returns `true` if every set field holds a value of its declared type.
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|(number, value)| {
            self.descriptor
                .field_by_number(*number)
                .is_some_and(|field| field.kind().accepts(value))
        })
    }

    /// Number of set fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.full_name() == other.descriptor.full_name() && self.fields == other.fields
    }
}

// ---------------------------------------------------------------------------
// ListValue
// ---------------------------------------------------------------------------

/// An ordered sequence of elements of one [`ElementType`].
///
/// `append` does not type-check; [`ListValue::is_valid`] does, and the
/// codec refuses to encode an invalid list.
#[derive(Debug, Clone)]
pub struct ListValue {
    element: ElementType,
    items: Vec<Value>,
}

impl ListValue {
    pub fn new(element: ElementType) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }

    /// Builds a list from existing values.
    pub fn from_values(element: ElementType, items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            element,
            items: items.into_iter().collect(),
        }
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Allocates a zero element, ready to be decoded into.
    pub fn new_element(&self) -> Value {
        self.element.zero_value()
    }

    pub fn append(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Returns `true` if every element has the declared element type.
    pub fn is_valid(&self) -> bool {
        self.items.iter().all(|item| self.element.accepts(item))
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        self.element.same_type(&other.element) && self.items == other.items
    }
}

impl<'a> IntoIterator for &'a ListValue {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// MapKey
// ---------------------------------------------------------------------------

/// A map key. Only scalar kinds other than `bytes` can be keys.
///
/// Floats are ordered and compared with `total_cmp`, so `0.0` and `-0.0`
/// are distinct keys. Every `NaN`, whatever its sign or payload, is one key
/// that sorts last, matching its single `NaN` rendering.
#[derive(Debug, Clone)]
pub enum MapKey {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
}

impl MapKey {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int32(_) => ScalarKind::Int32,
            Self::Int64(_) => ScalarKind::Int64,
            Self::Uint32(_) => ScalarKind::Uint32,
            Self::Uint64(_) => ScalarKind::Uint64,
            Self::Float(_) => ScalarKind::Float,
            Self::Double(_) => ScalarKind::Double,
            Self::String(_) => ScalarKind::String,
        }
    }

    /// Parses the [`Display`](fmt::Display) form of a key of `kind`.
    ///
    /// Returns `None` if `text` isn't a valid rendering, or `kind` can't be
    /// a key.
    pub fn parse(kind: ScalarKind, text: &str) -> Option<Self> {
        let key = match kind {
            ScalarKind::Bool => Self::Bool(text.parse().ok()?),
            ScalarKind::Int32 => Self::Int32(text.parse().ok()?),
            ScalarKind::Int64 => Self::Int64(text.parse().ok()?),
            ScalarKind::Uint32 => Self::Uint32(text.parse().ok()?),
            ScalarKind::Uint64 => Self::Uint64(text.parse().ok()?),
            ScalarKind::Float => Self::Float(text.parse().ok()?),
            ScalarKind::Double => Self::Double(text.parse().ok()?),
            ScalarKind::String => Self::String(text.to_owned()),
            ScalarKind::Bytes => return None,
        };
        Some(key)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the key so that [`MapKey::parse`] gives it back exactly.
impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Uint32(a), Self::Uint32(b)) => a.cmp(b),
            (Self::Uint64(a), Self::Uint64(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => cmp_float(a.is_nan(), b.is_nan(), || a.total_cmp(b)),
            (Self::Double(a), Self::Double(b)) => cmp_float(a.is_nan(), b.is_nan(), || a.total_cmp(b)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.kind().tag().cmp(&other.kind().tag()),
        }
    }
}

fn cmp_float(a_nan: bool, b_nan: bool, numbers: impl FnOnce() -> Ordering) -> Ordering {
    match (a_nan, b_nan) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => numbers(),
    }
}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MapKey {}

impl TryFrom<ScalarValue> for MapKey {
    type Error = SchemaError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        Ok(match value {
            ScalarValue::Bool(v) => Self::Bool(v),
            ScalarValue::Int32(v) => Self::Int32(v),
            ScalarValue::Int64(v) => Self::Int64(v),
            ScalarValue::Uint32(v) => Self::Uint32(v),
            ScalarValue::Uint64(v) => Self::Uint64(v),
            ScalarValue::Float(v) => Self::Float(v),
            ScalarValue::Double(v) => Self::Double(v),
            ScalarValue::String(v) => Self::String(v),
            ScalarValue::Bytes(_) => return Err(SchemaError::InvalidMapKey(ScalarKind::Bytes)),
        })
    }
}

impl From<MapKey> for ScalarValue {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(v) => Self::Bool(v),
            MapKey::Int32(v) => Self::Int32(v),
            MapKey::Int64(v) => Self::Int64(v),
            MapKey::Uint32(v) => Self::Uint32(v),
            MapKey::Uint64(v) => Self::Uint64(v),
            MapKey::Float(v) => Self::Float(v),
            MapKey::Double(v) => Self::Double(v),
            MapKey::String(v) => Self::String(v),
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for MapKey {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for MapKey {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u32> for MapKey {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}

// ---------------------------------------------------------------------------
// MapValue
// ---------------------------------------------------------------------------

/// An associative collection with scalar keys.
///
/// Like [`ListValue`], `set` doesn't type-check and
/// [`MapValue::is_valid`] does.
#[derive(Debug, Clone)]
pub struct MapValue {
    key: ScalarKind,
    value: ElementType,
    entries: BTreeMap<MapKey, Value>,
}

impl MapValue {
    pub fn new(key: ScalarKind, value: ElementType) -> Self {
        Self {
            key,
            value,
            entries: BTreeMap::new(),
        }
    }

    pub fn key_kind(&self) -> ScalarKind {
        self.key
    }

    pub fn value_type(&self) -> &ElementType {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Visits every entry.
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, MapKey, Value> {
        self.entries.iter()
    }

    /// Allocates a zero value, ready to be decoded into.
    pub fn new_value(&self) -> Value {
        self.value.zero_value()
    }

    /// Inserts or replaces an entry.
    pub fn set(&mut self, key: impl Into<MapKey>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Returns `true` if every key has the declared key kind and every
    /// value has the declared value type.
    pub fn is_valid(&self) -> bool {
        self.key.is_map_key()
            && self
                .entries
                .iter()
                .all(|(key, value)| key.kind() == self.key && self.value.accepts(value))
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value.same_type(&other.value) && self.entries == other.entries
    }
}
