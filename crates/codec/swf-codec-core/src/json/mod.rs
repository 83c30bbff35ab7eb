//! JSON adapter over the same registry as the binary one.
//!
//! Objects are keyed by snake_case wire names, enum and discriminant values
//! render as kebab-case labels, byte blobs as lowercase hex and fixed-point
//! values as plain numbers. Non-finite floats are the strings `NaN`,
//! `Infinity` and `-Infinity`. Absent optional fields are omitted; `null`
//! reads as absent.

mod decode;
mod encode;

use serde_json::Value as JsonValue;

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, ResultExt};
use crate::registry::SchemaRegistry;
use crate::value::Value;

use decode::JsonDecoder;
use encode::JsonEncoder;

#[derive(Debug, Clone, Copy)]
pub struct JsonCodec<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
}

impl<'r> JsonCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry, config: CodecConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn decode(&self, doc: &JsonValue, name: &str) -> CodecResult<Value> {
        let def = self.registry.lookup(name)?;
        JsonDecoder::new(self.registry, self.config)
            .decode(&def.codec, doc)
            .at_type(name)
    }

    pub fn encode(&self, value: &Value, name: &str) -> CodecResult<JsonValue> {
        let def = self.registry.lookup(name)?;
        JsonEncoder::new(self.registry, self.config)
            .encode(&def.codec, value)
            .at_type(name)
    }

    /// Parse `text` and decode it as `name`.
    pub fn decode_str(&self, text: &str, name: &str) -> CodecResult<Value> {
        let doc: JsonValue = serde_json::from_str(text)
            .map_err(|e| CodecError::invalid(format!("malformed JSON: {e}")))?;
        self.decode(&doc, name)
    }
}

/// JSON stand-ins for floats JSON numbers cannot hold.
pub const NAN: &str = "NaN";
pub const INFINITY: &str = "Infinity";
pub const NEG_INFINITY: &str = "-Infinity";

pub(crate) fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
