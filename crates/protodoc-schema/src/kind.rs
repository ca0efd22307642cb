//! Scalar kinds, scalar values, and the payload-free [`ValueKind`].
//!
//! Every leaf of a message tree is a [`ScalarValue`] or an enum number.
//! The kind of any value is always known from its variant, so codecs can
//! dispatch with a plain `match` instead of probing the value.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ScalarKind
// ---------------------------------------------------------------------------

/// The scalar types a field, list element, or map key can hold.
///
/// Each kind carries a stable numeric *kind tag* (see [`ScalarKind::tag`]).
/// The tags are part of the map-key token format, so they must never be
/// renumbered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    String,
    Bytes,
}

impl ScalarKind {
    /// Every scalar kind, in declaration order.
    pub const ALL: [ScalarKind; 9] = [
        Self::Bool,
        Self::Int32,
        Self::Int64,
        Self::Uint32,
        Self::Uint64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Bytes,
    ];

    /// Returns the numeric kind tag embedded in map-key tokens.
    pub fn tag(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::Int32 => 5,
            Self::Int64 => 6,
            Self::Uint32 => 10,
            Self::Uint64 => 11,
            Self::Float => 13,
            Self::Double => 14,
            Self::Bytes => 23,
            Self::String => 24,
        }
    }

    /// Inverse of [`ScalarKind::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Returns `true` if values of this kind may be used as map keys.
    pub fn is_map_key(self) -> bool {
        !matches!(self, Self::Bytes)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ScalarValue
// ---------------------------------------------------------------------------

/// A single scalar, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScalarValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl ScalarValue {
    /// The kind of this scalar.
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
            Self::Bytes(_) => ScalarKind::Bytes,
        }
    }

    /// The zero value of `kind`.
    pub fn default_for(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(false),
            ScalarKind::Int32 => Self::Int32(0),
            ScalarKind::Int64 => Self::Int64(0),
            ScalarKind::Uint32 => Self::Uint32(0),
            ScalarKind::Uint64 => Self::Uint64(0),
            ScalarKind::Float => Self::Float(0.0),
            ScalarKind::Double => Self::Double(0.0),
            ScalarKind::String => Self::String(String::new()),
            ScalarKind::Bytes => Self::Bytes(Vec::new()),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u32> for ScalarValue {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}

impl From<u64> for ScalarValue {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}

impl From<f32> for ScalarValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for ScalarValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

// ---------------------------------------------------------------------------
// ValueKind
// ---------------------------------------------------------------------------

/// The kind of a [`Value`](crate::Value), without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar(ScalarKind),
    Enum,
    Message,
    List,
    Map,
}

impl ValueKind {
    /// Returns `true` for messages, lists, and maps.
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Message | Self::List | Self::Map)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Enum => f.write_str("enum"),
            Self::Message => f.write_str("message"),
            Self::List => f.write_str("list"),
            Self::Map => f.write_str("map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_kind_tag() {
        assert_eq!(ScalarKind::from_tag(0), None);
        assert_eq!(ScalarKind::from_tag(99), None);
    }

    #[test]
    fn test_bytes_is_not_a_map_key() {
        assert!(!ScalarKind::Bytes.is_map_key());
        assert!(ScalarKind::String.is_map_key());
        assert!(ScalarKind::Double.is_map_key());
    }

    #[test]
    fn test_default_for_matches_kind() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarValue::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_scalar_value_json_shape() {
        let json = serde_json::to_value(ScalarValue::Int64(-3)).unwrap();
        assert_eq!(json["kind"], "int64");
        assert_eq!(json["value"], -3);
    }

    #[test]
    fn test_value_kind_composite() {
        assert!(ValueKind::Message.is_composite());
        assert!(ValueKind::List.is_composite());
        assert!(ValueKind::Map.is_composite());
        assert!(!ValueKind::Enum.is_composite());
        assert!(!ValueKind::Scalar(ScalarKind::Bool).is_composite());
    }

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Scalar(ScalarKind::Uint64).to_string(), "uint64");
        assert_eq!(ValueKind::Map.to_string(), "map");
    }
}
