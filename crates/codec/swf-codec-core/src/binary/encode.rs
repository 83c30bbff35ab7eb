use std::borrow::Cow;

use crate::bits::BitWriter;
use crate::coerce::{self, signed_bit_width, unsigned_bit_width};
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, ErrorKind, ResultExt};
use crate::fixed::FixedKind;
use crate::registry::{discriminant_code, SchemaRegistry};
use crate::schema::{
    ArraySpec, BitGroupSpec, BitMemberKind, Derivation, FieldRole, FieldSpec, Framing,
    OffsetTable, Presence, Primitive, RecordSpec, SizeSpec, Termination, TypeCodec, VariantSpec,
    ZeroSize,
};
use crate::value::{Record, Value};

use super::decode::extract;
use super::primitive;
use super::{fit_width, value_len, Headers, Slots};

pub(crate) struct Encoder<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
    depth: usize,
    slots: Slots,
    /// Set by an array just before it encodes each item: whether that item
    /// is the last one.
    last_item: Option<bool>,
}

impl<'r> Encoder<'r> {
    pub(crate) fn new(registry: &'r SchemaRegistry, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
            slots: Slots::default(),
            last_item: None,
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

    pub(crate) fn encode(
        &mut self,
        w: &mut BitWriter,
        codec: &TypeCodec,
        value: &Value,
    ) -> CodecResult<()> {
        match codec {
            TypeCodec::Primitive(p) => primitive::write(w, p, value),
            // the constant is written whatever the value holds
            TypeCodec::Literal(lit) => self.encode(w, &lit.codec, &lit.value),
            TypeCodec::Enum(spec) => {
                let label = coerce::expect_label(value)?;
                let variant = spec.by_label(label).ok_or_else(|| {
                    CodecError::from(ErrorKind::UnknownVariant {
                        discriminant: label.to_string(),
                    })
                })?;
                primitive::write(w, &spec.repr, &Value::Int(variant.code))
            }
            TypeCodec::BitGroup(group) => {
                let map = coerce::expect_record(value)?;
                reject_unknown(map, group.members.iter().map(|m| m.name.as_str()))?;
                self.encode_bit_group(w, group, map, None)
            }
            TypeCodec::Array(spec) => self.encode_array(w, spec, coerce::expect_array(value)?),
            TypeCodec::Record(rec) => {
                let map = coerce::expect_record(value)?;
                reject_unknown(map, self.registry.value_keys(rec)?)?;
                self.enter()?;
                self.encode_record(w, rec, map, false)?;
                self.leave();
                Ok(())
            }
            TypeCodec::Variant(spec) => self.encode_variant(w, spec, value),
            TypeCodec::Ref(target) => {
                let resolved = self.registry.deref(codec)?;
                self.encode(w, resolved, value).at_type(&target.name)
            }
            TypeCodec::SlotBits(bits) => {
                let width = self.slots.width(&bits.slot)?;
                let v = coerce::to_int(value)?;
                let target = || format!("{width}-bit field sized by `{}`", bits.slot);
                if width == 0 {
                    if v != 0 {
                        return Err(CodecError::range(v, target()));
                    }
                } else if bits.signed {
                    coerce::check_int(v, width, true, &target())?;
                    w.write_signed_bits(width, v as i32);
                } else {
                    coerce::check_int(v, width, false, &target())?;
                    w.write_bits(width, v as u32);
                }
                Ok(())
            }
            TypeCodec::Switch(switch) => {
                let n = self.slots.get(&switch.slot)?;
                let codec = switch.codec_for(n).ok_or_else(|| {
                    CodecError::invalid(format!("no codec for `{}` = {n}", switch.slot))
                })?;
                self.encode(w, codec, value)
            }
        }
    }

    fn encode_bit_group(
        &mut self,
        w: &mut BitWriter,
        group: &BitGroupSpec,
        map: &Record,
        headers: Option<&Headers<'_>>,
    ) -> CodecResult<()> {
        if group.axis_pair {
            return self.encode_axis_pair(w, group, map);
        }
        let mut raws = Vec::with_capacity(group.members.len());
        let mut width = 0u8;
        for member in &group.members {
            let present = match &member.presence {
                Presence::HeaderBit { header, bit } => headers
                    .and_then(|h| h.bit(header, *bit))
                    .ok_or_else(|| {
                        CodecError::invalid(format!(
                            "member `{}` needs the enclosing `{header}` header",
                            member.name
                        ))
                    })?,
                _ => true,
            };
            if !present {
                continue;
            }
            let value = map
                .get(&member.name)
                .ok_or_else(|| CodecError::missing(&member.name))?;
            let raw = match member.kind {
                BitMemberKind::Signed | BitMemberKind::Unsigned => coerce::to_int(value),
                BitMemberKind::Fixed8 => {
                    coerce::to_fixed(value, FixedKind::Sfixed8P8).map(|x| x.raw())
                }
                BitMemberKind::Fixed16 => {
                    coerce::to_fixed(value, FixedKind::Sfixed16P16).map(|x| x.raw())
                }
            }
            .at_field(&member.name)?;
            let needed = if member.kind == BitMemberKind::Unsigned {
                if raw < 0 {
                    return Err(CodecError::range(raw, "unsigned bit field").at_field(&member.name));
                }
                unsigned_bit_width(raw as u64)
            } else {
                signed_bit_width(raw)
            };
            width = width.max(needed);
            raws.push((member.kind, raw));
        }
        let width = width.max(group.width_bias);
        let limit = group.max_width();
        if width > limit {
            return Err(CodecError::range(
                format!("{width} bits"),
                format!("{} (at most {limit} bits per member)", group.name),
            ));
        }
        w.write_bits(group.width_bits, u32::from(width - group.width_bias));
        for (kind, raw) in raws {
            if kind == BitMemberKind::Unsigned {
                w.write_bits(width, raw as u32);
            } else {
                w.write_signed_bits(width, raw as i32);
            }
        }
        if group.align_end {
            w.align();
        }
        Ok(())
    }

    /// General form when both members are non-zero; otherwise the axis bit
    /// and the one non-zero member, preferring the second axis when both are
    /// zero.
    fn encode_axis_pair(&mut self, w: &mut BitWriter, group: &BitGroupSpec, map: &Record) -> CodecResult<()> {
        let mut pair = [0i64; 2];
        for (slot, member) in pair.iter_mut().zip(&group.members) {
            let value = map
                .get(&member.name)
                .ok_or_else(|| CodecError::missing(&member.name))?;
            *slot = coerce::to_int(value).at_field(&member.name)?;
        }
        let [x, y] = pair;
        let width = group
            .width_bias
            .max(signed_bit_width(x))
            .max(signed_bit_width(y));
        let limit = group.max_width();
        if width > limit {
            return Err(CodecError::range(
                format!("{width} bits"),
                format!("{} (at most {limit} bits per member)", group.name),
            ));
        }
        w.write_bits(group.width_bits, u32::from(width - group.width_bias));
        if x != 0 && y != 0 {
            w.write_bits(1, 1);
            w.write_signed_bits(width, x as i32);
            w.write_signed_bits(width, y as i32);
        } else if x == 0 {
            w.write_bits(2, 0b01);
            w.write_signed_bits(width, y as i32);
        } else {
            w.write_bits(2, 0b00);
            w.write_signed_bits(width, x as i32);
        }
        if group.align_end {
            w.align();
        }
        Ok(())
    }

    fn encode_array(&mut self, w: &mut BitWriter, spec: &ArraySpec, items: &[Value]) -> CodecResult<()> {
        let len = items.len();
        let expected = match &spec.termination {
            Termination::Count(n) => Some(*n),
            Termination::Slots(slots) => Some(self.slots.count(slots)?),
            Termination::OffsetTable(OffsetTable {
                count: Some(slot), ..
            }) => Some(self.slots.count(std::slice::from_ref(slot))?),
            _ => None,
        };
        if let Some(n) = expected.filter(|n| *n != len) {
            return Err(ErrorKind::LengthExceeded {
                len,
                min: n,
                max: Some(n),
            }
            .into());
        }
        if len < spec.min_len || spec.max_len.is_some_and(|max| len > max) {
            return Err(ErrorKind::LengthExceeded {
                len,
                min: spec.min_len,
                max: spec.max_len,
            }
            .into());
        }
        self.enter()?;
        if let Termination::LengthPrefix(prefix) = spec.termination {
            primitive::write_length(w, prefix, len)?;
        }
        if let Termination::OffsetTable(table) = &spec.termination {
            self.encode_offset_table(w, spec, table, items)?;
            self.leave();
            return Ok(());
        }
        let terminator = match spec.termination {
            Termination::Terminator {
                width,
                value,
                aligned,
            } => Some((width, value, aligned)),
            _ => None,
        };
        for (i, item) in items.iter().enumerate() {
            if let Some((_, _, true)) = terminator {
                w.align();
            }
            let start = w.bit_position();
            self.last_item = Some(i + 1 == len);
            let encoded = self.encode(w, &spec.item, item).at_index(i);
            self.last_item = None;
            encoded?;
            if spec.termination.is_open_ended() && w.bit_position() == start {
                return Err(CodecError::invalid("array item encodes to nothing").at_index(i));
            }
            if let Some((width, value, _)) = terminator {
                if w.bits_at(start, width) == Some(value) {
                    return Err(CodecError::invalid(
                        "item encodes as the array terminator",
                    )
                    .at_index(i));
                }
            }
        }
        if let Some((width, value, aligned)) = terminator {
            if aligned {
                w.align();
            }
            w.write_bits(width, value);
        }
        self.leave();
        Ok(())
    }

    fn encode_offset_table(
        &mut self,
        w: &mut BitWriter,
        spec: &ArraySpec,
        table: &OffsetTable,
        items: &[Value],
    ) -> CodecResult<()> {
        let wide = match &table.wide {
            Some(slot) => self.slots.get(slot)? != 0,
            None => false,
        };
        let mut bodies = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut body = BitWriter::new();
            self.encode(&mut body, &spec.item, item).at_index(i)?;
            body.align();
            bodies.push(body.into_bytes());
        }
        let entries = items.len() + usize::from(table.end_offset && !items.is_empty());
        let mut offset = entries * if wide { 4 } else { 2 };
        let mut offsets = Vec::with_capacity(entries);
        for body in &bodies {
            offsets.push(offset);
            offset += body.len();
        }
        if entries > items.len() {
            offsets.push(offset);
        }
        w.align();
        for offset in offsets {
            if wide {
                let offset = u32::try_from(offset).map_err(|_| CodecError::range(offset, "u32 offset"))?;
                w.write_u32(offset);
            } else {
                let offset = u16::try_from(offset).map_err(|_| CodecError::range(offset, "u16 offset"))?;
                w.write_u16(offset);
            }
        }
        for body in &bodies {
            w.write_bytes(body);
        }
        Ok(())
    }

    fn encode_variant(&mut self, w: &mut BitWriter, spec: &VariantSpec, value: &Value) -> CodecResult<()> {
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
        self.encode_case(w, spec, rec, map, literal).at_case(label)?;
        self.leave();
        Ok(())
    }

    fn encode_case(
        &mut self,
        w: &mut BitWriter,
        spec: &VariantSpec,
        rec: &RecordSpec,
        map: &Record,
        literal: &Value,
    ) -> CodecResult<()> {
        reject_unknown(map, self.registry.value_keys(rec)?)?;
        let framed_body = |this: &mut Self| -> CodecResult<Vec<u8>> {
            let mut body = BitWriter::new();
            this.encode_record(&mut body, rec, map, true)?;
            body.align();
            Ok(body.into_bytes())
        };
        match spec.framing {
            Framing::None => self.encode_record(w, rec, map, false),
            Framing::LengthPrefixed(prefix) => {
                self.encode(w, &spec.discriminant_codec, literal)?;
                let body = framed_body(self)?;
                primitive::write_length(w, prefix, body.len())?;
                w.write_bytes(&body);
                Ok(())
            }
            Framing::SwfTagHeader => {
                let code = discriminant_code(self.registry.deref(&spec.discriminant_codec)?, literal)?;
                let body = framed_body(self)?;
                let code = (code as u16) << 6;
                if body.len() < 0x3f {
                    w.write_u16(code | body.len() as u16);
                } else {
                    let len = u32::try_from(body.len())
                        .map_err(|_| CodecError::range(body.len(), "tag body length"))?;
                    w.write_u16(code | 0x3f);
                    w.write_u32(len);
                }
                w.write_bytes(&body);
                Ok(())
            }
        }
    }

    /// Encode `rec` from `map`. With `skip_discriminant`, the first field was
    /// already written by variant framing.
    fn encode_record(
        &mut self,
        w: &mut BitWriter,
        rec: &RecordSpec,
        map: &Record,
        skip_discriminant: bool,
    ) -> CodecResult<()> {
        let last_item = self.last_item.take();
        let mut headers = Headers::default();
        for header in rec.fields.iter() {
            if let FieldRole::PresenceHeader { .. } = header.role {
                let value = self.header_value(rec, &header.name, map)?;
                headers.set(&header.name, value);
            }
        }

        let mut trailing_closed = false;
        let mut i = 0;
        while i < rec.fields.len() {
            let field = &rec.fields[i];
            if i == 0 && skip_discriminant {
                i += 1;
                continue;
            }
            i = match &field.role {
                FieldRole::Size(spec) => {
                    self.encode_sized(w, rec, i, spec, map, &headers, last_item)?
                }
                _ => {
                    self.encode_field(w, rec, i, map, &headers, &mut trailing_closed)
                        .at_field(&field.name)?;
                    i + 1
                }
            };
        }
        if rec.align_end {
            w.align();
        }
        Ok(())
    }

    /// Write the fields after the size field into a scratch buffer, measure
    /// the run, then emit size and buffer. Returns the index after the run.
    #[allow(clippy::too_many_arguments)]
    fn encode_sized(
        &mut self,
        w: &mut BitWriter,
        rec: &RecordSpec,
        at: usize,
        spec: &SizeSpec,
        map: &Record,
        headers: &Headers<'_>,
        last_item: Option<bool>,
    ) -> CodecResult<usize> {
        let (start, end) = rec
            .size_run(at, spec)
            .ok_or_else(|| CodecError::invalid("size run does not resolve"))?;
        let mut trailing_closed = false;
        let mut tail = BitWriter::new();
        for i in at + 1..start {
            self.encode_field(&mut tail, rec, i, map, headers, &mut trailing_closed)
                .at_field(&rec.fields[i].name)?;
        }
        tail.align();
        let run_start = tail.as_bytes().len();
        for i in start..end {
            self.encode_field(&mut tail, rec, i, map, headers, &mut trailing_closed)
                .at_field(&rec.fields[i].name)?;
        }
        tail.align();
        let run_len = tail.as_bytes().len() - run_start;

        let zero = match &spec.zero {
            ZeroSize::Never => false,
            ZeroSize::LastItem => last_item == Some(true),
            ZeroSize::WhenEmpty(name) => value_len(map.get(name)) == 0,
        };
        let size = match (zero, spec.include_self) {
            (true, _) => 0,
            (false, true) => run_len + usize::from(spec.int.bits() / 8),
            (false, false) => run_len,
        };
        primitive::write(w, &Primitive::Int(spec.int), &Value::Int(size as i64))
            .at_field(&rec.fields[at].name)?;
        w.write_bytes(tail.as_bytes());
        Ok(end)
    }

    fn encode_field(
        &mut self,
        w: &mut BitWriter,
        rec: &RecordSpec,
        i: usize,
        map: &Record,
        headers: &Headers<'_>,
        trailing_closed: &mut bool,
    ) -> CodecResult<()> {
        let field = &rec.fields[i];
        match &field.role {
            FieldRole::Hidden => {
                return match self.registry.deref(&field.codec)? {
                    TypeCodec::Literal(lit) => {
                        self.encode(w, &lit.codec, &lit.value)?;
                        self.slots.publish(field, &lit.value)
                    }
                    other => Err(CodecError::mismatch("literal", other.describe())),
                };
            }
            FieldRole::PresenceHeader { width } => {
                let value = headers.value_of(&field.name);
                w.write_bits(*width, value);
                return Ok(());
            }
            FieldRole::Implied => {
                return match (map.get(&field.name), &field.default) {
                    (Some(v), Some(implied)) if v != implied => Err(ErrorKind::ValueMismatch {
                        expected: implied.to_string(),
                        found: v.to_string(),
                    }
                    .into()),
                    _ => Ok(()),
                };
            }
            FieldRole::Derived(rule) => {
                let slot = field
                    .slot
                    .as_deref()
                    .ok_or_else(|| CodecError::invalid("derived field without a slot"))?;
                let n = match rule {
                    Derivation::CountOf(array) => value_len(map.get(array)) as i64,
                    Derivation::CountWidth(array) => {
                        i64::from(unsigned_bit_width(value_len(map.get(array)) as u64))
                    }
                    Derivation::Fit { min } => {
                        i64::from(fit_width(self.registry, rec, i, map, slot, *min)?)
                    }
                };
                self.encode(w, &field.codec, &Value::Int(n))?;
                self.slots.set(slot, n);
                return Ok(());
            }
            FieldRole::Size(_) => {
                return Err(CodecError::invalid("size field inside a measured run"));
            }
            FieldRole::Value => {}
        }

        let value = self.field_value(field, map)?;
        match &field.presence {
            Presence::Required => {
                let value = value.ok_or_else(|| CodecError::missing(&field.name))?;
                self.encode_published(w, field, &value, headers)
            }
            Presence::LeadingBit => {
                let present = self.is_present(field, value.as_deref());
                w.write_bits(1, u32::from(present));
                match value {
                    Some(v) if present => self.encode_published(w, field, &v, headers),
                    _ => Ok(()),
                }
            }
            Presence::HeaderBit { header, bit } => {
                if headers.bit(header, *bit) != Some(true) {
                    return Ok(());
                }
                let value = value
                    .or_else(|| field.default.as_ref().map(Cow::Borrowed))
                    .ok_or_else(|| CodecError::missing(&field.name))?;
                self.encode_published(w, field, &value, headers)
            }
            Presence::HeaderAny { header, mask } => {
                let enabled = headers.value_of(header) & mask != 0;
                match (enabled, value) {
                    (true, Some(v)) => self.encode_published(w, field, &v, headers),
                    (true, None) => Err(CodecError::missing(&field.name)),
                    (false, None) => Ok(()),
                    (false, Some(v)) => Err(ErrorKind::ValueMismatch {
                        expected: format!("no value while `{header}` has none of {mask:#x}"),
                        found: v.to_string(),
                    }
                    .into()),
                }
            }
            Presence::Sentinel(sentinel) => match value {
                None => self.encode_value(w, field, sentinel, headers),
                Some(v) if *v == *sentinel => Err(ErrorKind::ValueMismatch {
                    expected: format!("a value other than the absence marker {sentinel}"),
                    found: v.to_string(),
                }
                .into()),
                Some(v) => self.encode_published(w, field, &v, headers),
            },
            Presence::WhenTrue(_) | Presence::WhenEquals { .. } => {
                let enabled = field.presence.holds_in(map).unwrap_or(false);
                match (enabled, value) {
                    (true, Some(v)) => self.encode_published(w, field, &v, headers),
                    (true, None) => Err(CodecError::missing(&field.name)),
                    (false, None) => Ok(()),
                    (false, Some(v)) => Err(ErrorKind::ValueMismatch {
                        expected: format!(
                            "no value unless `{}` holds",
                            field.presence.dependency().unwrap_or_default()
                        ),
                        found: v.to_string(),
                    }
                    .into()),
                }
            }
            Presence::Remaining => {
                let present = self.is_present(field, value.as_deref());
                match value {
                    Some(v) if present => {
                        if *trailing_closed {
                            return Err(CodecError::invalid(
                                "value follows an absent trailing field",
                            ));
                        }
                        self.encode_published(w, field, &v, headers)
                    }
                    _ => {
                        *trailing_closed = true;
                        Ok(())
                    }
                }
            }
        }
    }

    fn encode_published(
        &mut self,
        w: &mut BitWriter,
        field: &FieldSpec,
        value: &Value,
        headers: &Headers<'_>,
    ) -> CodecResult<()> {
        self.encode_value(w, field, value, headers)?;
        self.slots.publish(field, value)
    }

    fn encode_value(
        &mut self,
        w: &mut BitWriter,
        field: &FieldSpec,
        value: &Value,
        headers: &Headers<'_>,
    ) -> CodecResult<()> {
        if !field.flatten {
            return self.encode(w, &field.codec, value);
        }
        let members = coerce::expect_record(value)?;
        match self.registry.deref(&field.codec)? {
            TypeCodec::BitGroup(group) => self.encode_bit_group(w, group, members, Some(headers)),
            TypeCodec::Record(rec) => {
                self.enter()?;
                self.encode_record(w, rec, members, false)?;
                self.leave();
                Ok(())
            }
            other => Err(CodecError::mismatch("record or bit group", other.describe())),
        }
    }

    fn field_value<'m>(&self, field: &FieldSpec, map: &'m Record) -> CodecResult<Option<Cow<'m, Value>>> {
        if field.flatten {
            Ok(extract(self.registry, field, map)?.map(Cow::Owned))
        } else {
            Ok(map.get(&field.name).map(Cow::Borrowed))
        }
    }

    /// Whether an optional field goes on the wire: any value when there is no
    /// default, otherwise only values that differ from it.
    fn is_present(&self, field: &FieldSpec, value: Option<&Value>) -> bool {
        match (value, &field.default) {
            (None, _) => false,
            (Some(v), Some(default)) => v != default,
            (Some(_), None) => true,
        }
    }

    fn header_value(&self, rec: &RecordSpec, header: &str, map: &Record) -> CodecResult<u32> {
        let mut value = 0u32;
        for field in rec.fields.iter().filter(|f| f.is_value()) {
            if let Presence::HeaderBit { header: h, bit } = &field.presence {
                if h == header {
                    let current = self.field_value(field, map)?;
                    if self.is_present(field, current.as_deref()) {
                        value |= 1 << bit;
                    }
                }
            }
            if field.flatten {
                if let TypeCodec::BitGroup(group) = self.registry.deref(&field.codec)? {
                    for member in &group.members {
                        if let Presence::HeaderBit { header: h, bit } = &member.presence {
                            if h == header && map.contains_key(&member.name) {
                                value |= 1 << bit;
                            }
                        }
                    }
                }
            }
        }
        Ok(value)
    }
}

fn reject_unknown<'k>(map: &Record, known: impl IntoIterator<Item = &'k str>) -> CodecResult<()> {
    let known: Vec<&str> = known.into_iter().collect();
    match map.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(ErrorKind::UnknownField { field: key.clone() }.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::registry::SchemaRegistry;
    use crate::schema::{prim, ArraySpec, FieldSpec, Presence, RecordSpec, Termination, TypeCodec};
    use crate::value::Value;

    fn flagged() -> SchemaRegistry {
        let mut b = SchemaRegistry::builder();
        b.record(
            RecordSpec::new("Flagged")
                .field(FieldSpec::presence_header("flags", 8))
                .field(FieldSpec::optional(
                    "depth",
                    prim::u16(),
                    Presence::header_bit("flags", 0),
                ))
                .field(FieldSpec::optional(
                    "ratio",
                    prim::u8(),
                    Presence::header_bit("flags", 3),
                )),
        );
        b.build().unwrap()
    }

    #[test]
    fn headers_follow_present_fields() {
        let reg = flagged();
        let value = Value::record([("ratio", Value::Int(7))]);
        assert_eq!(reg.encode(&value, "Flagged").unwrap(), vec![0b1000, 7]);
        let value = Value::record([("depth", Value::Int(0x102)), ("ratio", Value::Int(7))]);
        assert_eq!(
            reg.encode(&value, "Flagged").unwrap(),
            vec![0b1001, 0x02, 0x01, 7]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let reg = flagged();
        let value = Value::record([("colour", Value::Int(1))]);
        let err = reg.encode(&value, "Flagged").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::UnknownField {
                field: "colour".into()
            }
        );
    }

    #[test]
    fn sentinel_values_cannot_be_present() {
        let mut b = SchemaRegistry::builder();
        b.record(RecordSpec::new("Clip").field(FieldSpec::optional(
            "clipDepth",
            prim::u16(),
            Presence::Sentinel(Value::Int(0)),
        )));
        let reg = b.build().unwrap();
        assert_eq!(reg.encode(&Value::record::<&str, _>([]), "Clip").unwrap(), vec![0, 0]);
        let err = reg
            .encode(&Value::record([("clipDepth", Value::Int(0))]), "Clip")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));
    }

    #[test]
    fn literals_write_their_constant() {
        let mut b = SchemaRegistry::builder();
        b.record(
            RecordSpec::new("Versioned")
                .field(FieldSpec::literal("version", prim::u8(), Value::Int(2)))
                .required("x", prim::u8()),
        );
        let reg = b.build().unwrap();
        let stale = Value::record([("version", Value::Int(9)), ("x", Value::Int(5))]);
        assert_eq!(reg.encode(&stale, "Versioned").unwrap(), vec![2, 5]);

        // only decode compares
        let err = reg.decode(&[3, 5], "Versioned").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));

        let err = reg
            .encode(&Value::record([("x", Value::Int(5))]), "Versioned")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingRequiredField { .. }));
    }

    #[test]
    fn items_may_not_alias_the_terminator() {
        let mut b = SchemaRegistry::builder();
        b.register(
            "Codes",
            TypeCodec::array(ArraySpec::new(
                prim::u8(),
                Termination::Terminator {
                    width: 8,
                    value: 0,
                    aligned: true,
                },
            )),
        );
        let reg = b.build().unwrap();
        let ok = Value::Array(vec![Value::Int(3), Value::Int(4)]);
        assert_eq!(reg.encode(&ok, "Codes").unwrap(), vec![3, 4, 0]);
        let bad = Value::Array(vec![Value::Int(3), Value::Int(0)]);
        let err = reg.encode(&bad, "Codes").unwrap_err();
        assert_eq!(err.kind().category(), "wire");
        assert_eq!(err.path().to_string(), "Codes[1]");
    }
}
