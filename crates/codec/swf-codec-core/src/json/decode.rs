use serde_json::{Map, Value as JsonValue};

use crate::binary::primitive;
use crate::coerce;
use crate::config::{CodecConfig, UnknownFieldPolicy};
use crate::error::{CodecError, CodecResult, ErrorKind, ResultExt};
use crate::fixed::FixedKind;
use crate::registry::SchemaRegistry;
use crate::schema::{
    ArraySpec, BitGroupSpec, BitMemberKind, FieldRole, FieldSpec, Presence, Primitive, RecordSpec,
    SwitchSpec, Termination, TypeCodec, VariantSpec,
};
use crate::value::{Record, Value};

use super::{json_kind, INFINITY, NAN, NEG_INFINITY};

type Object = Map<String, JsonValue>;

pub(crate) struct JsonDecoder<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
    depth: usize,
}

impl<'r> JsonDecoder<'r> {
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

    pub(crate) fn decode(&mut self, codec: &TypeCodec, doc: &JsonValue) -> CodecResult<Value> {
        match codec {
            TypeCodec::Primitive(p) => decode_primitive(p, doc),
            TypeCodec::Literal(lit) => {
                let found = self.decode(&lit.codec, doc)?;
                if found != lit.value {
                    return Err(ErrorKind::ValueMismatch {
                        expected: lit.value.to_string(),
                        found: found.to_string(),
                    }
                    .into());
                }
                Ok(found)
            }
            TypeCodec::Enum(spec) => {
                let label = expect_str(doc)?;
                spec.by_wire_label(label)
                    .map(|v| Value::Enum(v.label.clone()))
                    .ok_or_else(|| {
                        ErrorKind::UnknownVariant {
                            discriminant: label.to_string(),
                        }
                        .into()
                    })
            }
            TypeCodec::BitGroup(group) => {
                let obj = expect_object(doc)?;
                let mut out = Record::new();
                let mut claimed = Vec::new();
                self.decode_members(group, obj, &mut out, &mut claimed)?;
                self.check_unknown(obj, &claimed)?;
                Ok(Value::Record(out))
            }
            TypeCodec::Array(spec) => self.decode_array(spec, doc),
            TypeCodec::Record(rec) => {
                self.enter()?;
                let out = self.decode_record(rec, expect_object(doc)?)?;
                self.leave();
                Ok(Value::Record(out))
            }
            TypeCodec::Variant(spec) => self.decode_variant(spec, doc),
            TypeCodec::Ref(target) => {
                let resolved = self.registry.deref(codec)?;
                self.decode(resolved, doc).at_type(&target.name)
            }
            TypeCodec::SlotBits(bits) => {
                let i = coerce::to_int(&number(doc)?)?;
                Ok(Value::Int(coerce::check_int(i, 32, bits.signed, "bit field")?))
            }
            TypeCodec::Switch(switch) => self.decode_switch(switch, doc),
        }
    }

    /// The first case that accepts `doc`; the slot is only known on the wire.
    fn decode_switch(&mut self, switch: &SwitchSpec, doc: &JsonValue) -> CodecResult<Value> {
        let mut last = CodecError::invalid(format!("switch on `{}` has no cases", switch.slot));
        for (_, codec) in &switch.cases {
            match self.decode(codec, doc) {
                Ok(value) => return Ok(value),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    fn decode_array(&mut self, spec: &ArraySpec, doc: &JsonValue) -> CodecResult<Value> {
        let items = match doc {
            JsonValue::Array(items) => items,
            other => return Err(CodecError::mismatch("array", json_kind(other))),
        };
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
            .map(|(i, item)| self.decode(&spec.item, item).at_index(i))
            .collect::<CodecResult<Vec<_>>>()?;
        self.leave();
        Ok(Value::Array(out))
    }

    fn decode_variant(&mut self, spec: &VariantSpec, doc: &JsonValue) -> CodecResult<Value> {
        let obj = expect_object(doc)?;
        let key = self.discriminant_key(spec)?;
        let tag = obj
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| CodecError::missing(&spec.discriminant))?;
        let literal = self.decode(&spec.discriminant_codec, tag)?;
        let case = spec.case_for(&literal).ok_or_else(|| {
            CodecError::from(ErrorKind::UnknownVariant {
                discriminant: literal.to_string(),
            })
        })?;
        let label = case.record.name.as_str();
        let rec = self.registry.record_of(label)?;
        self.enter()?;
        let out = self.decode_record(rec, obj).at_case(label)?;
        self.leave();
        Ok(Value::Record(out))
    }

    /// Wire key of the discriminant, taken from the first case record.
    fn discriminant_key(&self, spec: &VariantSpec) -> CodecResult<&'r str> {
        let registry: &'r SchemaRegistry = self.registry;
        let first = spec
            .cases
            .first()
            .ok_or_else(|| CodecError::invalid(format!("{} has no cases", spec.name)))?;
        let rec = registry.record_of(&first.record.name)?;
        rec.fields
            .first()
            .map(|f| f.wire_name())
            .ok_or_else(|| CodecError::missing(&spec.discriminant))
    }

    fn decode_record(&mut self, rec: &RecordSpec, obj: &Object) -> CodecResult<Record> {
        let mut out = Record::new();
        let mut claimed = Vec::new();
        self.decode_fields(rec, obj, &mut out, &mut claimed)?;
        self.check_unknown(obj, &claimed)?;
        Ok(out)
    }

    fn decode_fields(
        &mut self,
        rec: &RecordSpec,
        obj: &Object,
        out: &mut Record,
        claimed: &mut Vec<String>,
    ) -> CodecResult<()> {
        for field in rec.fields.iter().filter(|f| f.is_value()) {
            self.decode_field(field, obj, out, claimed)
                .at_field(&field.name)?;
        }
        Ok(())
    }

    fn decode_field(
        &mut self,
        field: &FieldSpec,
        obj: &Object,
        out: &mut Record,
        claimed: &mut Vec<String>,
    ) -> CodecResult<()> {
        if field.flatten {
            return self.decode_flattened(field, obj, out, claimed);
        }
        claimed.push(field.wire_name().to_string());
        match obj.get(field.wire_name()).filter(|v| !v.is_null()) {
            Some(doc) => {
                let value = self.decode(&field.codec, doc)?;
                if let (FieldRole::Implied, Some(implied)) = (&field.role, &field.default) {
                    if value != *implied {
                        return Err(ErrorKind::ValueMismatch {
                            expected: implied.to_string(),
                            found: value.to_string(),
                        }
                        .into());
                    }
                }
                out.insert(field.name.clone(), value);
            }
            None => absent(field, out)?,
        }
        Ok(())
    }

    fn decode_flattened(
        &mut self,
        field: &FieldSpec,
        obj: &Object,
        out: &mut Record,
        claimed: &mut Vec<String>,
    ) -> CodecResult<()> {
        let keys: Vec<String> = self
            .registry
            .flattened_wire_pairs(&field.codec)?
            .into_iter()
            .map(|(_, wire)| wire.to_string())
            .collect();
        let any_present = keys
            .iter()
            .any(|key| obj.get(key).is_some_and(|v| !v.is_null()));
        if !any_present && field.presence.is_optional() {
            claimed.extend(keys);
            return absent(field, out);
        }
        match self.registry.deref(&field.codec)? {
            TypeCodec::BitGroup(group) => self.decode_members(group, obj, out, claimed),
            TypeCodec::Record(rec) => {
                self.enter()?;
                self.decode_fields(rec, obj, out, claimed)?;
                self.leave();
                Ok(())
            }
            other => Err(CodecError::mismatch("record or bit group", other.describe())),
        }
    }

    fn decode_members(
        &self,
        group: &BitGroupSpec,
        obj: &Object,
        out: &mut Record,
        claimed: &mut Vec<String>,
    ) -> CodecResult<()> {
        for member in &group.members {
            claimed.push(member.wire_name.clone());
            let Some(doc) = obj.get(&member.wire_name).filter(|v| !v.is_null()) else {
                if member.presence == Presence::Required {
                    return Err(CodecError::missing(&member.name));
                }
                continue;
            };
            let number = number(doc).at_field(&member.name)?;
            let value = match member.kind {
                BitMemberKind::Signed => Value::Int(coerce::to_int(&number)?),
                BitMemberKind::Unsigned => {
                    let i = coerce::to_int(&number)?;
                    Value::Int(coerce::check_int(i, 32, false, "unsigned bit field")?)
                }
                BitMemberKind::Fixed8 => {
                    Value::Fixed(coerce::to_fixed(&number, FixedKind::Sfixed8P8)?)
                }
                BitMemberKind::Fixed16 => {
                    Value::Fixed(coerce::to_fixed(&number, FixedKind::Sfixed16P16)?)
                }
            };
            out.insert(member.name.clone(), value);
        }
        Ok(())
    }

    fn check_unknown(&self, obj: &Object, claimed: &[String]) -> CodecResult<()> {
        for key in obj.keys().filter(|k| !claimed.contains(k)) {
            match self.config.unknown_fields {
                UnknownFieldPolicy::Reject => {
                    return Err(ErrorKind::UnknownField { field: key.clone() }.into())
                }
                UnknownFieldPolicy::Ignore => log::debug!("ignoring unknown key `{key}`"),
            }
        }
        Ok(())
    }
}

/// Fill in an absent field: its default, nothing for optionals, or an error.
fn absent(field: &FieldSpec, out: &mut Record) -> CodecResult<()> {
    match (&field.default, field.flatten) {
        (Some(Value::Record(members)), true) => out.extend(members.clone()),
        (Some(default), _) => {
            out.insert(field.name.clone(), default.clone());
        }
        (None, _) if field.presence.is_optional() => {}
        (None, _) => return Err(CodecError::missing(&field.name)),
    }
    Ok(())
}

fn expect_object(doc: &JsonValue) -> CodecResult<&Object> {
    doc.as_object()
        .ok_or_else(|| CodecError::mismatch("object", json_kind(doc)))
}

fn expect_str(doc: &JsonValue) -> CodecResult<&str> {
    doc.as_str()
        .ok_or_else(|| CodecError::mismatch("string", json_kind(doc)))
}

fn number(doc: &JsonValue) -> CodecResult<Value> {
    let JsonValue::Number(n) = doc else {
        return Err(CodecError::mismatch("number", json_kind(doc)));
    };
    if let Some(i) = n.as_i64() {
        Ok(Value::Int(i))
    } else if let Some(u) = n.as_u64() {
        Err(CodecError::range(u, "i64"))
    } else {
        n.as_f64()
            .map(Value::Float)
            .ok_or_else(|| CodecError::invalid(format!("unrepresentable number {n}")))
    }
}

/// A number, or one of the strings standing in for non-finite values.
fn float(doc: &JsonValue) -> CodecResult<f64> {
    match doc {
        JsonValue::String(s) if s == NAN => Ok(f64::NAN),
        JsonValue::String(s) if s == INFINITY => Ok(f64::INFINITY),
        JsonValue::String(s) if s == NEG_INFINITY => Ok(f64::NEG_INFINITY),
        JsonValue::String(s) => Err(CodecError::invalid(format!("`{s}` is not a float"))),
        other => coerce::to_f64(&number(other)?),
    }
}

fn decode_primitive(p: &Primitive, doc: &JsonValue) -> CodecResult<Value> {
    let value = match p {
        Primitive::Bool(_) => Value::Bool(
            doc.as_bool()
                .ok_or_else(|| CodecError::mismatch("bool", json_kind(doc)))?,
        ),
        Primitive::Int(_) | Primitive::Bits { .. } | Primitive::EncodedU32 => {
            Value::Int(coerce::to_int(&number(doc)?)?)
        }
        Primitive::Fixed(kind) => Value::Fixed(coerce::to_fixed(&number(doc)?, *kind)?),
        // JSON carries doubles; narrow to the nearest f32 (halves must then be exact)
        Primitive::Float16 | Primitive::Float32 => Value::Float32(float(doc)? as f32),
        Primitive::Float64 => Value::Float(float(doc)?),
        Primitive::Str(_) => Value::Str(expect_str(doc)?.to_string()),
        Primitive::Bytes(_) => Value::Bytes(
            hex::decode(expect_str(doc)?)
                .map_err(|e| CodecError::invalid(format!("byte blob is not hex: {e}")))?,
        ),
    };
    primitive::check(p, &value)?;
    Ok(value)
}
