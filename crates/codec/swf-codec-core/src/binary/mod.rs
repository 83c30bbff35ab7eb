//! Binary adapter: SWF wire encoding driven by registry declarations.

mod decode;
mod encode;
pub(crate) mod primitive;

use hashbrown::HashMap;

use crate::bits::{BitReader, BitWriter};
use crate::coerce::{self, signed_bit_width, unsigned_bit_width};
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, ErrorKind, ResultExt};
use crate::registry::SchemaRegistry;
use crate::schema::{FieldRole, FieldSpec, Presence, RecordSpec, TypeCodec};
use crate::value::{Record, Value};

use decode::Decoder;
use encode::Encoder;

/// Binary view over a registry.
#[derive(Debug, Clone, Copy)]
pub struct BinaryCodec<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
}

impl<'r> BinaryCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry, config: CodecConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decode a whole buffer as `name`; leftover bytes are an error.
    pub fn decode(&self, bytes: &[u8], name: &str) -> CodecResult<Value> {
        let (value, consumed) = self.decode_prefix(bytes, name)?;
        if consumed < bytes.len() {
            return Err(ErrorKind::TrailingBytes {
                remaining: bytes.len() - consumed,
            }
            .into());
        }
        Ok(value)
    }

    /// Decode one `name` from the front of `bytes`, returning the bytes used.
    pub fn decode_prefix(&self, bytes: &[u8], name: &str) -> CodecResult<(Value, usize)> {
        let def = self.registry.lookup(name)?;
        log::trace!("decoding {name} from {} bytes", bytes.len());
        let mut reader = BitReader::new(bytes);
        let value = Decoder::new(self.registry, self.config)
            .decode(&mut reader, &def.codec)
            .at_type(name)?;
        reader.align(self.config.is_strict())?;
        Ok((value, reader.consumed_bytes()))
    }

    pub fn encode(&self, value: &Value, name: &str) -> CodecResult<Vec<u8>> {
        let mut writer = BitWriter::new();
        self.encode_into(&mut writer, value, name)?;
        Ok(writer.into_bytes())
    }

    /// Append the encoding of `value` to `writer`, then pad to a byte boundary.
    pub fn encode_into(&self, writer: &mut BitWriter, value: &Value, name: &str) -> CodecResult<()> {
        let def = self.registry.lookup(name)?;
        log::trace!("encoding {name}");
        Encoder::new(self.registry, self.config)
            .encode(writer, &def.codec, value)
            .at_type(name)?;
        writer.align();
        Ok(())
    }
}

/// Presence header values seen so far in one record.
#[derive(Debug, Default)]
pub(crate) struct Headers<'s>(Vec<(&'s str, u32)>);

impl<'s> Headers<'s> {
    pub(crate) fn set(&mut self, name: &'s str, value: u32) {
        self.0.push((name, value));
    }

    pub(crate) fn bit(&self, header: &str, bit: u8) -> Option<bool> {
        self.0
            .iter()
            .find(|(name, _)| *name == header)
            .map(|(_, value)| (value >> bit) & 1 == 1)
    }

    /// Whole header value; unset headers read as zero.
    pub(crate) fn value_of(&self, header: &str) -> u32 {
        self.0
            .iter()
            .find(|(name, _)| *name == header)
            .map_or(0, |(_, value)| *value)
    }
}

/// Bits of `header` claimed by record fields or flattened bit-group members.
pub(crate) fn bound_mask(
    registry: &SchemaRegistry,
    rec: &RecordSpec,
    header: &str,
) -> CodecResult<u32> {
    let mut mask = 0u32;
    let mut claim = |presence: &Presence| {
        if let Presence::HeaderBit { header: h, bit } = presence {
            if h == header {
                mask |= 1 << bit;
            }
        }
    };
    for field in rec.fields.iter().filter(|f| f.role == FieldRole::Value) {
        claim(&field.presence);
        if field.flatten {
            if let TypeCodec::BitGroup(group) = registry.deref(&field.codec)? {
                group.members.iter().for_each(|m| claim(&m.presence));
            }
        }
    }
    Ok(mask)
}

/// Integers published by earlier fields: style index widths, glyph counts,
/// wide-offset flags. Later fields read them by name.
#[derive(Debug, Default)]
pub(crate) struct Slots(HashMap<String, i64>);

impl Slots {
    pub(crate) fn get(&self, slot: &str) -> CodecResult<i64> {
        self.0
            .get(slot)
            .copied()
            .ok_or_else(|| CodecError::invalid(format!("slot `{slot}` is read before it is set")))
    }

    /// Slot value used as a bit width.
    pub(crate) fn width(&self, slot: &str) -> CodecResult<u8> {
        let n = self.get(slot)?;
        u8::try_from(n)
            .ok()
            .filter(|w| *w <= 32)
            .ok_or_else(|| CodecError::invalid(format!("slot `{slot}` holds width {n}")))
    }

    /// Product of the named slots, as an item count.
    pub(crate) fn count(&self, slots: &[String]) -> CodecResult<usize> {
        let mut count = 1usize;
        for slot in slots {
            let n = self.get(slot)?;
            count = usize::try_from(n)
                .ok()
                .and_then(|n| count.checked_mul(n))
                .ok_or_else(|| CodecError::range(n, format!("count from slot `{slot}`")))?;
        }
        Ok(count)
    }

    pub(crate) fn set(&mut self, slot: &str, value: i64) {
        self.0.insert(slot.to_string(), value);
    }

    /// Store the value a field publishes, if it has a slot.
    pub(crate) fn publish(&mut self, field: &FieldSpec, value: &Value) -> CodecResult<()> {
        let Some(slot) = &field.slot else {
            return Ok(());
        };
        let n = match value {
            Value::Bool(b) => i64::from(*b),
            other => coerce::to_int(other)?,
        };
        self.set(slot, n);
        Ok(())
    }
}

/// Item count of an array or byte value; anything else counts as empty.
pub(crate) fn value_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Bytes(bytes)) => bytes.len(),
        _ => 0,
    }
}

/// Width a `Fit` field at `at` must hold: the widest value written through
/// `slot` by the fields after it, up to the next field that sets the slot.
pub(crate) fn fit_width(
    registry: &SchemaRegistry,
    rec: &RecordSpec,
    at: usize,
    map: &Record,
    slot: &str,
    min: u8,
) -> CodecResult<u8> {
    let mut width = min;
    fit_fields(registry, &rec.fields[at + 1..], map, slot, &mut width)?;
    Ok(width)
}

/// Returns true once a field sets `slot` again.
fn fit_fields(
    registry: &SchemaRegistry,
    fields: &[FieldSpec],
    map: &Record,
    slot: &str,
    width: &mut u8,
) -> CodecResult<bool> {
    for field in fields {
        if field.slot.as_deref() == Some(slot) {
            return Ok(true);
        }
        if !field.is_wire_value() {
            continue;
        }
        if field.flatten {
            if let TypeCodec::Record(inner) = registry.deref(&field.codec)? {
                if fit_fields(registry, &inner.fields, map, slot, width)? {
                    return Ok(true);
                }
            }
            continue;
        }
        if let Some(value) = map.get(&field.name) {
            if fit_value(registry, &field.codec, value, slot, width)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn fit_value(
    registry: &SchemaRegistry,
    codec: &TypeCodec,
    value: &Value,
    slot: &str,
    width: &mut u8,
) -> CodecResult<bool> {
    match registry.deref(codec)? {
        TypeCodec::SlotBits(bits) if bits.slot == slot => {
            let v = coerce::to_int(value)?;
            let needed = if bits.signed {
                signed_bit_width(v)
            } else {
                unsigned_bit_width(v.max(0) as u64)
            };
            *width = (*width).max(needed);
            Ok(false)
        }
        TypeCodec::Array(arr) => {
            for item in coerce::expect_array(value)? {
                if fit_value(registry, &arr.item, item, slot, width)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        TypeCodec::Record(rec) => {
            fit_fields(registry, &rec.fields, coerce::expect_record(value)?, slot, width)
        }
        TypeCodec::Variant(var) => {
            let map = coerce::expect_record(value)?;
            let Some(case) = map.get(&var.discriminant).and_then(|d| var.case_for(d)) else {
                return Ok(false);
            };
            let rec = registry.record_of(&case.record.name)?;
            fit_fields(registry, &rec.fields, map, slot, width)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{prim, BitGroupSpec, BitMemberKind, FieldSpec, RecordSpec, Termination};

    fn pair_registry() -> SchemaRegistry {
        let mut b = SchemaRegistry::builder();
        b.record(
            RecordSpec::new("Pair")
                .required("left", prim::u8())
                .required("right", prim::u8()),
        );
        b.build().unwrap()
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let reg = pair_registry();
        let err = reg.binary().decode(&[1, 2, 3], "Pair").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TrailingBytes { remaining: 1 });
        let (value, used) = reg.binary().decode_prefix(&[1, 2, 3], "Pair").unwrap();
        assert_eq!(used, 2);
        assert_eq!(value.get("right"), Some(&Value::Int(2)));
    }

    #[test]
    fn unknown_type_names() {
        let reg = pair_registry();
        let err = reg.binary().decode(&[], "Nope").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownType { .. }));
    }

    #[test]
    fn header_bits_read_back() {
        let mut headers = Headers::default();
        headers.set("flags", 0b101);
        assert_eq!(headers.bit("flags", 0), Some(true));
        assert_eq!(headers.bit("flags", 1), Some(false));
        assert_eq!(headers.bit("other", 0), None);
        let reg = pair_registry();
        let rec = RecordSpec::new("R")
            .field(FieldSpec::presence_header("flags", 3))
            .field(FieldSpec::optional(
                "a",
                prim::u8(),
                Presence::header_bit("flags", 2),
            ));
        assert_eq!(bound_mask(&reg, &rec, "flags").unwrap(), 0b100);
    }

    fn empty_items() -> SchemaRegistry {
        let mut b = SchemaRegistry::builder();
        b.record(RecordSpec::new("Empty"));
        b.record(RecordSpec::new("List").required(
            "items",
            TypeCodec::array_of(
                prim::reference("Empty"),
                Termination::Terminator {
                    width: 8,
                    value: 0,
                    aligned: true,
                },
            ),
        ));
        b.build().unwrap()
    }

    #[test]
    fn empty_items_cannot_stall_a_terminated_array() {
        let reg = empty_items();
        let err = reg.decode(&[1], "List").unwrap_err();
        assert_eq!(err.kind().category(), "wire");
        assert_eq!(err.path().to_string(), "List.items[0]");

        assert_eq!(
            reg.decode(&[0], "List").unwrap(),
            Value::record([("items", Value::Array(vec![]))])
        );
        let one = Value::record([("items", Value::Array(vec![Value::record::<&str, _>([])]))]);
        let err = reg.encode(&one, "List").unwrap_err();
        assert_eq!(err.path().to_string(), "List.items[0]");
    }

    #[test]
    fn biased_width_counts() {
        let mut b = SchemaRegistry::builder();
        b.bit_group(BitGroupSpec::new("Curve", 4).biased(2).members(&["a", "b"], BitMemberKind::Signed));
        let reg = b.build().unwrap();
        let value = Value::record([("a", Value::Int(1)), ("b", Value::Int(-1))]);
        assert_eq!(reg.encode(&value, "Curve").unwrap(), vec![0b0000_0111]);
        assert_eq!(reg.decode(&[0b0000_0111], "Curve").unwrap(), value);

        let wide = [0b0001_0011, 0b1100_0000];
        let err = reg.decode(&wide, "Curve").unwrap_err();
        assert_eq!(err.kind().category(), "wire");
        assert_eq!(reg.binary_with(CodecConfig::lenient()).decode(&wide, "Curve").unwrap(), value);
    }
}
