//! Codec configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable for [`CodecConfig::strict`].
pub const ENV_STRICT: &str = "PROTODOC_STRICT";
/// Environment variable for [`CodecConfig::field_keys`].
pub const ENV_FIELD_KEYS: &str = "PROTODOC_FIELD_KEYS";
/// Environment variable for [`CodecConfig::max_depth`].
pub const ENV_MAX_DEPTH: &str = "PROTODOC_MAX_DEPTH";

// ---------------------------------------------------------------------------
// FieldKeyStyle
// ---------------------------------------------------------------------------

/// How message fields are keyed in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKeyStyle {
    /// The decimal field number, e.g. `"3"`. Stable across renames.
    #[default]
    Number,
    /// The field name, e.g. `"email"`.
    Name,
}

impl FromStr for FieldKeyStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Ok(Self::Number),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown field key style {other:?}")),
        }
    }
}

impl fmt::Display for FieldKeyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::Name => f.write_str("name"),
        }
    }
}

// ---------------------------------------------------------------------------
// CodecConfig
// ---------------------------------------------------------------------------

/// Settings shared by every codec during one encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Turn skipped input into errors: unknown document keys, map keys of
    /// the wrong kind, and fields, elements, or entries that fail to decode.
    pub strict: bool,

    /// Key style for message fields, used by both encode and decode.
    pub field_keys: FieldKeyStyle,

    /// Maximum nesting of messages, lists, and maps below the root.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict: false,
            field_keys: FieldKeyStyle::Number,
            max_depth: 64,
        }
    }
}

impl CodecConfig {
    /// Reads the configuration from `PROTODOC_*` environment variables.
    ///
    /// Missing variables keep their defaults. Unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses a JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(strict) = parse_var(&lookup, ENV_STRICT, parse_bool) {
            config.strict = strict;
        }
        if let Some(style) = parse_var(&lookup, ENV_FIELD_KEYS, |raw| raw.parse().ok()) {
            config.field_keys = style;
        }
        if let Some(depth) = parse_var(&lookup, ENV_MAX_DEPTH, |raw| raw.trim().parse().ok()) {
            config.max_depth = depth;
        }
        config
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(name)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
    }
    parsed
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_codec_config_default() {
        let config = CodecConfig::default();
        assert!(!config.strict);
        assert_eq!(config.field_keys, FieldKeyStyle::Number);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = CodecConfig::from_lookup(lookup(&[
            (ENV_STRICT, "true"),
            (ENV_FIELD_KEYS, "Name"),
            (ENV_MAX_DEPTH, " 8 "),
        ]));
        assert!(config.strict);
        assert_eq!(config.field_keys, FieldKeyStyle::Name);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = CodecConfig::from_lookup(lookup(&[
            (ENV_STRICT, "maybe"),
            (ENV_FIELD_KEYS, "ordinal"),
            (ENV_MAX_DEPTH, "-1"),
        ]));
        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn test_from_json_partial() {
        let config = CodecConfig::from_json(r#"{"field_keys": "name"}"#).unwrap();
        assert_eq!(config.field_keys, FieldKeyStyle::Name);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_json_round_trip() {
        let config = CodecConfig {
            strict: true,
            field_keys: FieldKeyStyle::Name,
            max_depth: 3,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(CodecConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_rejects_bad_style() {
        assert!(CodecConfig::from_json(r#"{"field_keys": "ordinal"}"#).is_err());
    }
}
