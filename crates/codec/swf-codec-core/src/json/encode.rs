use serde_json::{Map, Number, Value as JsonValue};

use crate::binary::primitive;
use crate::coerce;
use crate::config::{CodecConfig, UnknownFieldPolicy};
use crate::error::{CodecError, CodecResult, ErrorKind, ResultExt};
use crate::fixed::FixedKind;
use crate::registry::SchemaRegistry;
use crate::schema::{
    ArraySpec, BitGroupSpec, BitMemberKind, FieldRole, FieldSpec, Presence, Primitive, RecordSpec,
    Termination, TypeCodec, VariantSpec,
};
use crate::value::{Record, Value};

use super::{INFINITY, NAN, NEG_INFINITY};

type Object = Map<String, JsonValue>;

pub(crate) struct JsonEncoder<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
    depth: usize,
}

impl<'r> JsonEncoder<'r> {
    pub(crate) fn new(registry: &'r SchemaRegistry, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
        }
    }

    fn enter(&mut self) -> CodecResult<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(ErrorKind::DepthExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn encode(&mut self, codec: &TypeCodec, value: &Value) -> CodecResult<JsonValue> {
        match codec {
            TypeCodec::Primitive(p) => encode_primitive(p, value),
            TypeCodec::Literal(lit) => self.encode(&lit.codec, &lit.value),
            TypeCodec::Enum(spec) => {
                let label = coerce::expect_label(value)?;
                spec.by_label(label)
                    .map(|v| JsonValue::String(v.wire_label.clone()))
                    .ok_or_else(|| {
                        ErrorKind::UnknownVariant {
                            discriminant: label.to_string(),
                        }
                        .into()
                    })
            }
            TypeCodec::BitGroup(group) => {
                let map = coerce::expect_record(value)?;
                self.check_unknown(map, group.members.iter().map(|m| m.name.as_str()))?;
                let mut obj = Object::new();
                encode_members(group, map, &mut obj)?;
                Ok(JsonValue::Object(obj))
            }
            TypeCodec::Array(spec) => self.encode_array(spec, coerce::expect_array(value)?),
            TypeCodec::Record(rec) => {
                self.enter()?;
                let obj = self.encode_record(rec, coerce::expect_record(value)?)?;
                self.leave();
                Ok(JsonValue::Object(obj))
            }
            TypeCodec::Variant(spec) => self.encode_variant(spec, value),
            TypeCodec::Ref(target) => {
                let resolved = self.registry.deref(codec)?;
                self.encode(resolved, value).at_type(&target.name)
            }
            TypeCodec::SlotBits(bits) => Ok(JsonValue::from(coerce::check_int(
                coerce::to_int(value)?,
                32,
                bits.signed,
                "bit field",
            )?)),
            TypeCodec::Switch(switch) => {
                let mut last = CodecError::invalid(format!("switch on `{}` has no cases", switch.slot));
                for (_, case) in &switch.cases {
                    match self.encode(case, value) {
                        Ok(doc) => return Ok(doc),
                        Err(err) => last = err,
                    }
                }
                Err(last)
            }
        }
    }

    fn encode_array(&mut self, spec: &ArraySpec, items: &[Value]) -> CodecResult<JsonValue> {
        let len = items.len();
        let count_mismatch = matches!(spec.termination, Termination::Count(n) if n != len);
        if len < spec.min_len || spec.max_len.is_some_and(|max| len > max) || count_mismatch {
            return Err(ErrorKind::LengthExceeded {
                len,
                min: spec.min_len,
                max: spec.max_len,
            }
            .into());
        }
        self.enter()?;
        let out = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.encode(&spec.item, item).at_index(i))
            .collect::<CodecResult<Vec<_>>>()?;
        self.leave();
        Ok(JsonValue::Array(out))
    }

    fn encode_variant(&mut self, spec: &VariantSpec, value: &Value) -> CodecResult<JsonValue> {
        let map = coerce::expect_record(value)?;
        let literal = map
            .get(&spec.discriminant)
            .ok_or_else(|| CodecError::missing(&spec.discriminant))?;
        let case = spec.case_for(literal).ok_or_else(|| {
            CodecError::from(ErrorKind::UnknownVariant {
                discriminant: literal.to_string(),
            })
        })?;
        let label = case.record.name.as_str();
        let rec = self.registry.record_of(label)?;
        self.enter()?;
        let obj = self.encode_record(rec, map).at_case(label)?;
        self.leave();
        Ok(JsonValue::Object(obj))
    }

    fn encode_record(&mut self, rec: &RecordSpec, map: &Record) -> CodecResult<Object> {
        self.check_unknown(map, self.registry.value_keys(rec)?)?;
        let mut obj = Object::new();
        self.encode_fields(rec, map, &mut obj)?;
        Ok(obj)
    }

    fn encode_fields(&mut self, rec: &RecordSpec, map: &Record, obj: &mut Object) -> CodecResult<()> {
        for field in rec.fields.iter().filter(|f| f.is_value()) {
            self.encode_field(field, map, obj).at_field(&field.name)?;
        }
        Ok(())
    }

    fn encode_field(&mut self, field: &FieldSpec, map: &Record, obj: &mut Object) -> CodecResult<()> {
        if field.flatten {
            let keys = self.registry.flattened_keys(&field.codec)?;
            if field.presence.is_optional() && !keys.iter().any(|k| map.contains_key(*k)) {
                return match &field.default {
                    Some(_) => Err(CodecError::missing(&field.name)),
                    None => Ok(()),
                };
            }
            return match self.registry.deref(&field.codec)? {
                TypeCodec::BitGroup(group) => encode_members(group, map, obj),
                TypeCodec::Record(rec) => {
                    self.enter()?;
                    self.encode_fields(rec, map, obj)?;
                    self.leave();
                    Ok(())
                }
                other => Err(CodecError::mismatch("record or bit group", other.describe())),
            };
        }
        match map.get(&field.name) {
            Some(value) => {
                let doc = self.encode(&field.codec, value)?;
                obj.insert(field.wire_name().to_string(), doc);
                Ok(())
            }
            None if field.role == FieldRole::Implied => {
                if let Some(implied) = &field.default {
                    let doc = self.encode(&field.codec, implied)?;
                    obj.insert(field.wire_name().to_string(), doc);
                }
                Ok(())
            }
            // defaulted fields are part of the value even when the wire omits them
            None if field.default.is_some() || !field.presence.is_optional() => {
                Err(CodecError::missing(&field.name))
            }
            None => Ok(()),
        }
    }

    fn check_unknown<'k>(
        &self,
        map: &Record,
        known: impl IntoIterator<Item = &'k str>,
    ) -> CodecResult<()> {
        let known: Vec<&str> = known.into_iter().collect();
        for key in map.keys().filter(|k| !known.contains(&k.as_str())) {
            match self.config.unknown_fields {
                UnknownFieldPolicy::Reject => {
                    return Err(ErrorKind::UnknownField { field: key.clone() }.into())
                }
                UnknownFieldPolicy::Ignore => log::debug!("dropping unknown key `{key}`"),
            }
        }
        Ok(())
    }
}

fn encode_members(group: &BitGroupSpec, map: &Record, obj: &mut Object) -> CodecResult<()> {
    for member in &group.members {
        let Some(value) = map.get(&member.name) else {
            if member.presence == Presence::Required {
                return Err(CodecError::missing(&member.name));
            }
            continue;
        };
        let doc = match member.kind {
            BitMemberKind::Signed => JsonValue::from(coerce::to_int(value)?),
            BitMemberKind::Unsigned => JsonValue::from(coerce::int_in_range(
                value,
                32,
                false,
                "unsigned bit field",
            )?),
            BitMemberKind::Fixed8 => float(coerce::to_fixed(value, FixedKind::Sfixed8P8)?.to_f64()),
            BitMemberKind::Fixed16 => {
                float(coerce::to_fixed(value, FixedKind::Sfixed16P16)?.to_f64())
            }
        };
        obj.insert(member.wire_name.clone(), doc);
    }
    Ok(())
}

/// Finite floats are numbers; the others are the strings `NaN`, `Infinity`
/// and `-Infinity`.
fn float(f: f64) -> JsonValue {
    match Number::from_f64(f) {
        Some(n) => JsonValue::Number(n),
        None if f.is_nan() => JsonValue::String(NAN.to_string()),
        None if f > 0.0 => JsonValue::String(INFINITY.to_string()),
        None => JsonValue::String(NEG_INFINITY.to_string()),
    }
}

fn encode_primitive(p: &Primitive, value: &Value) -> CodecResult<JsonValue> {
    primitive::check(p, value)?;
    Ok(match p {
        Primitive::Bool(_) => JsonValue::Bool(coerce::expect_bool(value)?),
        Primitive::Int(_) | Primitive::Bits { .. } | Primitive::EncodedU32 => {
            JsonValue::from(coerce::to_int(value)?)
        }
        Primitive::Fixed(kind) => float(coerce::to_fixed(value, *kind)?.to_f64()),
        // widening is exact, so the number narrows back to the same f32
        Primitive::Float16 | Primitive::Float32 => float(f64::from(coerce::to_f32(value)?)),
        Primitive::Float64 => float(coerce::to_f64(value)?),
        Primitive::Str(_) => JsonValue::String(coerce::expect_str(value)?.to_string()),
        Primitive::Bytes(_) => JsonValue::String(hex::encode(coerce::expect_bytes(value)?)),
    })
}
