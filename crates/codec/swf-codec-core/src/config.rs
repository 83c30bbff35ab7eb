//! Runtime knobs shared by the binary and JSON adapters.

use serde::{Deserialize, Serialize};

/// How strictly the binary decoder treats encodings that are valid but not
/// the ones the encoder would produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canonical {
    /// Reject non-canonical input with `NonCanonical`. Every accepted buffer
    /// re-encodes to the same bytes.
    #[default]
    Strict,
    /// Accept non-canonical input (logged at `warn`).
    Lenient,
}

/// What the JSON decoder does with object keys no field claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    #[default]
    Reject,
    Ignore,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub canonical: Canonical,
    pub unknown_fields: UnknownFieldPolicy,
    /// Maximum nesting of records, arrays and variants.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            canonical: Canonical::Strict,
            unknown_fields: UnknownFieldPolicy::Reject,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecConfig {
    pub fn lenient() -> Self {
        Self {
            canonical: Canonical::Lenient,
            unknown_fields: UnknownFieldPolicy::Ignore,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.canonical == Canonical::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_json_fills_defaults() {
        let cfg: CodecConfig = serde_json::from_str(r#"{"canonical":"lenient"}"#).unwrap();
        assert_eq!(cfg.canonical, Canonical::Lenient);
        assert_eq!(cfg.unknown_fields, UnknownFieldPolicy::Reject);
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
    }
}
