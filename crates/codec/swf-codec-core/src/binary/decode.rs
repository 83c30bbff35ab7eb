use crate::bits::BitReader;
use crate::coerce::{signed_bit_width, unsigned_bit_width};
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, ErrorKind, ResultExt};
use crate::fixed::FixedPoint;
use crate::registry::SchemaRegistry;
use crate::schema::{
    ArraySpec, BitGroupSpec, BitMemberKind, Derivation, EnumSpec, FieldRole, FieldSpec, Framing,
    OffsetTable, Presence, Primitive, RecordSpec, SizeSpec, Termination, TypeCodec, VariantSpec,
    ZeroSize,
};
use crate::value::{Record, Value};

use super::primitive::{self, canonical};
use super::{bound_mask, fit_width, value_len, Headers, Slots};

pub(crate) struct Decoder<'r> {
    registry: &'r SchemaRegistry,
    config: CodecConfig,
    depth: usize,
    slots: Slots,
}

/// Decoding state of one record.
#[derive(Default)]
struct Frame<'s> {
    out: Record,
    headers: Headers<'s>,
    /// `Fit` fields and the widths they were read with.
    fits: Vec<(usize, i64)>,
    /// Size fields and the sizes they were read with.
    sizes: Vec<(&'s FieldSpec, usize)>,
}

impl<'r> Decoder<'r> {
    pub(crate) fn new(registry: &'r SchemaRegistry, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
            slots: Slots::default(),
        }
    }

    fn strict(&self) -> bool {
        self.config.is_strict()
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

    pub(crate) fn decode(&mut self, r: &mut BitReader<'_>, codec: &TypeCodec) -> CodecResult<Value> {
        match codec {
            TypeCodec::Primitive(p) => primitive::read(r, p, self.strict()),
            TypeCodec::Literal(lit) => {
                let found = self.decode(r, &lit.codec)?;
                if found != lit.value {
                    return Err(ErrorKind::ValueMismatch {
                        expected: lit.value.to_string(),
                        found: found.to_string(),
                    }
                    .into());
                }
                Ok(found)
            }
            TypeCodec::Enum(spec) => self.decode_enum(r, spec),
            TypeCodec::BitGroup(group) => self.decode_bit_group(r, group, None).map(Value::Record),
            TypeCodec::Array(spec) => self.decode_array(r, spec).map(Value::Array),
            TypeCodec::Record(rec) => {
                self.enter()?;
                let out = self.decode_record(r, rec, None)?;
                self.leave();
                Ok(Value::Record(out))
            }
            TypeCodec::Variant(spec) => self.decode_variant(r, spec),
            TypeCodec::Ref(target) => {
                let resolved = self.registry.deref(codec)?;
                self.decode(r, resolved).at_type(&target.name)
            }
            TypeCodec::SlotBits(bits) => {
                let width = self.slots.width(&bits.slot)?;
                Ok(Value::Int(if bits.signed {
                    i64::from(r.read_signed_bits(width)?)
                } else if width == 0 {
                    0
                } else {
                    i64::from(r.read_bits(width)?)
                }))
            }
            TypeCodec::Switch(switch) => {
                let n = self.slots.get(&switch.slot)?;
                let codec = switch.codec_for(n).ok_or_else(|| {
                    CodecError::invalid(format!("no codec for `{}` = {n}", switch.slot))
                })?;
                self.decode(r, codec)
            }
        }
    }

    fn decode_enum(&mut self, r: &mut BitReader<'_>, spec: &EnumSpec) -> CodecResult<Value> {
        let code = match primitive::read(r, &spec.repr, self.strict())? {
            Value::Int(code) => code,
            other => return Err(CodecError::mismatch("integer code", other.kind().name())),
        };
        enum_value(spec, code)
    }

    fn decode_bit_group(
        &mut self,
        r: &mut BitReader<'_>,
        group: &BitGroupSpec,
        headers: Option<&Headers<'_>>,
    ) -> CodecResult<Record> {
        let width = r.read_bits(group.width_bits)? + u32::from(group.width_bias);
        if width > 32 {
            return Err(CodecError::invalid(format!(
                "{} declares {width}-bit members",
                group.name
            )));
        }
        let width = width as u8;
        if group.axis_pair {
            return self.decode_axis_pair(r, group, width);
        }
        let mut out = Record::new();
        let mut minimal = group.width_bias;
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
            let (value, needed) = match member.kind {
                BitMemberKind::Unsigned => {
                    let v = r.read_bits(width)?;
                    (Value::Int(i64::from(v)), unsigned_bit_width(u64::from(v)))
                }
                kind => {
                    let v = i64::from(r.read_signed_bits(width)?);
                    let value = match kind {
                        BitMemberKind::Fixed8 => Value::Fixed(FixedPoint::from_raw(v, 8)),
                        BitMemberKind::Fixed16 => Value::Fixed(FixedPoint::from_raw(v, 16)),
                        _ => Value::Int(v),
                    };
                    (value, signed_bit_width(v))
                }
            };
            minimal = minimal.max(needed);
            out.insert(member.name.clone(), value);
        }
        if width != minimal {
            canonical(
                self.strict(),
                format!("{} uses {width}-bit members where {minimal} suffice", group.name),
            )?;
        }
        if group.align_end {
            r.align(self.strict())?;
        }
        Ok(out)
    }

    fn decode_axis_pair(
        &mut self,
        r: &mut BitReader<'_>,
        group: &BitGroupSpec,
        width: u8,
    ) -> CodecResult<Record> {
        let strict = self.strict();
        let general = r.read_bits(1)? == 1;
        let vertical = !general && r.read_bits(1)? == 1;
        let (x, y) = if general {
            let x = r.read_signed_bits(width)?;
            (x, r.read_signed_bits(width)?)
        } else if vertical {
            (0, r.read_signed_bits(width)?)
        } else {
            (r.read_signed_bits(width)?, 0)
        };
        let (x, y) = (i64::from(x), i64::from(y));
        if general && (x == 0 || y == 0) {
            canonical(strict, format!("{} writes a zero delta in full", group.name))?;
        }
        if !general && !vertical && x == 0 {
            canonical(strict, format!("{} has an empty first-axis delta", group.name))?;
        }
        let minimal = group
            .width_bias
            .max(signed_bit_width(x))
            .max(signed_bit_width(y));
        if width != minimal {
            canonical(
                strict,
                format!("{} uses {width}-bit members where {minimal} suffice", group.name),
            )?;
        }
        let mut out = Record::new();
        for (member, v) in group.members.iter().zip([x, y]) {
            out.insert(member.name.clone(), Value::Int(v));
        }
        if group.align_end {
            r.align(strict)?;
        }
        Ok(out)
    }

    fn decode_array(&mut self, r: &mut BitReader<'_>, spec: &ArraySpec) -> CodecResult<Vec<Value>> {
        self.enter()?;
        let bounds = |len: usize| -> CodecResult<()> {
            if len < spec.min_len || spec.max_len.is_some_and(|max| len > max) {
                return Err(ErrorKind::LengthExceeded {
                    len,
                    min: spec.min_len,
                    max: spec.max_len,
                }
                .into());
            }
            Ok(())
        };
        let over_max = |len: usize| spec.max_len.is_some_and(|max| len > max);

        let mut items = Vec::new();
        match &spec.termination {
            Termination::Count(count) => {
                bounds(*count)?;
                for i in 0..*count {
                    items.push(self.decode(r, &spec.item).at_index(i)?);
                }
            }
            Termination::LengthPrefix(prefix) => {
                let count = primitive::read_length(r, *prefix, self.strict())?;
                bounds(count)?;
                items.reserve(count.min(1024));
                for i in 0..count {
                    items.push(self.decode(r, &spec.item).at_index(i)?);
                }
            }
            Termination::Slots(slots) => {
                let count = self.slots.count(slots)?;
                bounds(count)?;
                items.reserve(count.min(1024));
                for i in 0..count {
                    items.push(self.decode(r, &spec.item).at_index(i)?);
                }
            }
            Termination::OffsetTable(table) => {
                items = self.decode_offset_table(r, spec, table)?;
            }
            Termination::Remaining => {
                while !r.is_exhausted() {
                    let before = r.bit_position();
                    let i = items.len();
                    items.push(self.decode(r, &spec.item).at_index(i)?);
                    if r.bit_position() == before {
                        return Err(CodecError::invalid("array item consumed no input").at_index(i));
                    }
                    if over_max(items.len()) {
                        bounds(items.len())?;
                    }
                }
            }
            Termination::Terminator {
                width,
                value,
                aligned,
            } => loop {
                if *aligned {
                    r.align(self.strict())?;
                }
                if r.peek_bits(*width)? == *value {
                    r.read_bits(*width)?;
                    break;
                }
                let before = r.bit_position();
                let i = items.len();
                items.push(self.decode(r, &spec.item).at_index(i)?);
                if r.bit_position() == before {
                    return Err(CodecError::invalid("array item consumed no input").at_index(i));
                }
                if over_max(items.len()) {
                    bounds(items.len())?;
                }
            },
        }
        bounds(items.len())?;
        self.leave();
        Ok(items)
    }

    /// Offsets count from the start of the table. Items are read in order,
    /// each bounded by the next offset.
    fn decode_offset_table(
        &mut self,
        r: &mut BitReader<'_>,
        spec: &ArraySpec,
        table: &OffsetTable,
    ) -> CodecResult<Vec<Value>> {
        let strict = self.strict();
        r.align(strict)?;
        let wide = match &table.wide {
            Some(slot) => self.slots.get(slot)? != 0,
            None => false,
        };
        let width = if wide { 4 } else { 2 };
        let read_offset = |r: &mut BitReader<'_>| -> CodecResult<usize> {
            Ok(if wide {
                r.read_u32()? as usize
            } else {
                usize::from(r.read_u16()?)
            })
        };
        let base = r.bit_position() / 8;

        let mut offsets = Vec::new();
        let count = match &table.count {
            Some(slot) => self.slots.count(std::slice::from_ref(slot))?,
            None if r.is_exhausted() => 0,
            None => {
                let first = read_offset(r)?;
                if first == 0 || first % width != 0 {
                    return Err(CodecError::invalid(format!(
                        "first offset {first} does not end a table of {width}-byte entries"
                    )));
                }
                offsets.push(first);
                first / width
            }
        };
        let entries = count + usize::from(table.end_offset && count > 0);
        while offsets.len() < entries {
            offsets.push(read_offset(r)?);
        }

        let mut items = Vec::with_capacity(count.min(1024));
        for i in 0..count {
            let at = r.bit_position() / 8 - base;
            let start = offsets[i];
            if start < at {
                return Err(CodecError::invalid(format!(
                    "offset {start} points back into earlier data"
                ))
                .at_index(i));
            }
            if start > at {
                canonical(strict, format!("{} unused bytes before item {i}", start - at))?;
                r.read_bytes(start - at)?;
            }
            let item = match offsets.get(i + 1) {
                Some(&end) => {
                    let len = end.checked_sub(start).ok_or_else(|| {
                        CodecError::invalid(format!("offset {end} is below offset {start}"))
                    })?;
                    let mut span = r.split_off(len).at_index(i)?;
                    let item = self.decode(&mut span, &spec.item).at_index(i)?;
                    span.align(strict)?;
                    if !span.is_exhausted() {
                        canonical(
                            strict,
                            format!("{} unused bytes after item {i}", span.remaining_bytes()),
                        )?;
                    }
                    item
                }
                None => self.decode(r, &spec.item).at_index(i)?,
            };
            items.push(item);
        }
        Ok(items)
    }

    fn decode_variant(&mut self, r: &mut BitReader<'_>, spec: &VariantSpec) -> CodecResult<Value> {
        self.enter()?;
        let strict = self.strict();
        let (literal, body_len) = match spec.framing {
            Framing::None => (self.decode(r, &spec.discriminant_codec)?, None),
            Framing::LengthPrefixed(prefix) => {
                let literal = self.decode(r, &spec.discriminant_codec)?;
                let len = primitive::read_length(r, prefix, strict)?;
                r.align(strict)?;
                (literal, Some(len))
            }
            Framing::SwfTagHeader => {
                r.align(strict)?;
                let header = r.read_u16()?;
                let code = i64::from(header >> 6);
                let len = match header & 0x3f {
                    0x3f => {
                        let long = r.read_u32()?;
                        if long < 0x3f {
                            canonical(strict, format!("long tag header for a {long}-byte body"))?;
                        }
                        long as usize
                    }
                    short => usize::from(short),
                };
                let literal = match self.registry.deref(&spec.discriminant_codec)? {
                    TypeCodec::Enum(e) => enum_value(e, code)?,
                    _ => Value::Int(code),
                };
                (literal, Some(len))
            }
        };

        let case = spec.case_for(&literal).ok_or_else(|| {
            CodecError::from(ErrorKind::UnknownVariant {
                discriminant: literal.to_string(),
            })
        })?;
        let label = case.record.name.as_str();
        let rec = self.registry.record_of(label)?;
        log::trace!("{} case {label}", spec.name);

        let fields = match body_len {
            None => self.decode_record(r, rec, Some(&literal)),
            Some(len) => r.split_off(len).and_then(|mut body| {
                let fields = self.decode_record(&mut body, rec, Some(&literal))?;
                body.align(strict)?;
                if !body.is_exhausted() {
                    return Err(ErrorKind::TrailingBytes {
                        remaining: body.remaining_bytes(),
                    }
                    .into());
                }
                Ok(fields)
            }),
        }
        .at_case(label)?;
        self.leave();
        Ok(Value::Record(fields))
    }

    /// Decode `rec` field by field. `discriminant` stands in for the first
    /// field when a variant already consumed it.
    fn decode_record(
        &mut self,
        r: &mut BitReader<'_>,
        rec: &RecordSpec,
        discriminant: Option<&Value>,
    ) -> CodecResult<Record> {
        let mut frame = Frame::default();
        let mut i = 0;
        while i < rec.fields.len() {
            let field = &rec.fields[i];
            if i == 0 {
                if let Some(literal) = discriminant {
                    frame.out.insert(field.name.clone(), literal.clone());
                    i += 1;
                    continue;
                }
            }
            i = match &field.role {
                FieldRole::Size(spec) => self.decode_sized(r, rec, i, spec, &mut frame)?,
                _ => {
                    self.decode_field(r, rec, i, &mut frame)
                        .at_field(&field.name)?;
                    i + 1
                }
            };
        }
        self.check_header_defaults(rec, &frame.out, &frame.headers)?;
        self.check_derived(rec, &frame)?;
        if rec.align_end {
            r.align(self.strict())?;
        }
        Ok(frame.out)
    }

    /// Decode a size field and the run it measures; returns the index of the
    /// first field after the run.
    fn decode_sized<'s>(
        &mut self,
        r: &mut BitReader<'_>,
        rec: &'s RecordSpec,
        at: usize,
        spec: &SizeSpec,
        frame: &mut Frame<'s>,
    ) -> CodecResult<usize> {
        let strict = self.strict();
        let field = &rec.fields[at];
        let (start, end) = rec
            .size_run(at, spec)
            .ok_or_else(|| CodecError::invalid("size run does not resolve"))?;
        let size = match primitive::read(r, &Primitive::Int(spec.int), strict).at_field(&field.name)? {
            Value::Int(n) => usize::try_from(n).map_err(|_| CodecError::range(n, "size"))?,
            other => return Err(CodecError::mismatch("integer size", other.kind().name())),
        };
        frame.sizes.push((field, size));
        for i in at + 1..start {
            self.decode_field(r, rec, i, frame)
                .at_field(&rec.fields[i].name)?;
        }
        r.align(strict)?;

        if size == 0 && spec.zero != ZeroSize::Never {
            for i in start..end {
                self.decode_field(r, rec, i, frame)
                    .at_field(&rec.fields[i].name)?;
            }
            return Ok(end);
        }
        let self_bytes = if spec.include_self {
            usize::from(spec.int.bits() / 8)
        } else {
            0
        };
        let len = size
            .checked_sub(self_bytes)
            .ok_or_else(|| CodecError::invalid(format!("size {size} is smaller than the size field")))
            .at_field(&field.name)?;
        let mut span = r.split_off(len).at_field(&field.name)?;
        for i in start..end {
            self.decode_field(&mut span, rec, i, frame)
                .at_field(&rec.fields[i].name)?;
        }
        span.align(strict)?;
        if !span.is_exhausted() {
            canonical(
                strict,
                format!("{} bytes measured by `{}` are unused", span.remaining_bytes(), field.name),
            )
            .at_field(&field.name)?;
        }
        if spec.zero == ZeroSize::LastItem && end == rec.fields.len() && r.is_exhausted() {
            canonical(strict, format!("last item carries `{}` = {size}", field.name))
                .at_field(&field.name)?;
        }
        Ok(end)
    }

    fn decode_field<'s>(
        &mut self,
        r: &mut BitReader<'_>,
        rec: &'s RecordSpec,
        i: usize,
        frame: &mut Frame<'s>,
    ) -> CodecResult<()> {
        let field = &rec.fields[i];
        match &field.role {
            FieldRole::Hidden => {
                let value = self.decode(r, &field.codec)?;
                return self.slots.publish(field, &value);
            }
            FieldRole::PresenceHeader { width } => {
                let value = r.read_bits(*width)?;
                let unbound = value & !bound_mask(self.registry, rec, &field.name)?;
                if unbound != 0 {
                    canonical(
                        self.strict(),
                        format!("unassigned bits {unbound:#x} set in `{}`", field.name),
                    )?;
                }
                frame.headers.set(&field.name, value);
                return Ok(());
            }
            FieldRole::Implied => {
                if let Some(default) = &field.default {
                    frame.out.insert(field.name.clone(), default.clone());
                }
                return Ok(());
            }
            FieldRole::Derived(rule) => return self.decode_derived(r, i, field, rule, frame),
            FieldRole::Size(_) => {
                return Err(CodecError::invalid("size field inside a measured run"));
            }
            FieldRole::Value => {}
        }

        let out = &mut frame.out;
        let headers = &frame.headers;
        let present = match &field.presence {
            Presence::Required => true,
            Presence::LeadingBit => r.read_bits(1)? == 1,
            Presence::HeaderBit { header, bit } => headers.bit(header, *bit).unwrap_or(false),
            Presence::HeaderAny { header, mask } => headers.value_of(header) & mask != 0,
            Presence::WhenTrue(_) | Presence::WhenEquals { .. } => {
                field.presence.holds_in(out).unwrap_or(false)
            }
            Presence::Remaining => !r.is_exhausted(),
            Presence::Sentinel(sentinel) => {
                let value = self.decode_field_value(r, field, headers)?;
                if value != *sentinel {
                    self.slots.publish(field, &value)?;
                    insert(out, field, value)?;
                }
                return Ok(());
            }
        };
        if !present {
            if let Some(default) = &field.default {
                self.slots.publish(field, default)?;
                insert(out, field, default.clone())?;
            }
            return Ok(());
        }

        let value = self.decode_field_value(r, field, headers)?;
        let explicit_default = matches!(field.presence, Presence::LeadingBit | Presence::Remaining)
            && field.default.as_ref() == Some(&value);
        if explicit_default {
            canonical(self.strict(), "explicit value equals the field default")?;
        }
        self.slots.publish(field, &value)?;
        insert(out, field, value)
    }

    fn decode_derived(
        &mut self,
        r: &mut BitReader<'_>,
        i: usize,
        field: &FieldSpec,
        rule: &Derivation,
        frame: &mut Frame<'_>,
    ) -> CodecResult<()> {
        let n = match self.decode(r, &field.codec)? {
            Value::Int(n) => n,
            other => return Err(CodecError::mismatch("integer", other.kind().name())),
        };
        match rule {
            Derivation::CountWidth(array) => {
                let len = value_len(frame.out.get(array));
                let needed = i64::from(unsigned_bit_width(len as u64));
                if n != needed {
                    canonical(
                        self.strict(),
                        format!("{n}-bit indices where {len} entries of `{array}` need {needed}"),
                    )?;
                }
            }
            Derivation::Fit { .. } => frame.fits.push((i, n)),
            Derivation::CountOf(_) => {}
        }
        if let Some(slot) = &field.slot {
            self.slots.set(slot, n);
        }
        Ok(())
    }

    fn decode_field_value(
        &mut self,
        r: &mut BitReader<'_>,
        field: &FieldSpec,
        headers: &Headers<'_>,
    ) -> CodecResult<Value> {
        if field.flatten {
            if let TypeCodec::BitGroup(group) = self.registry.deref(&field.codec)? {
                return self
                    .decode_bit_group(r, group, Some(headers))
                    .map(Value::Record);
            }
        }
        self.decode(r, &field.codec)
    }

    /// A set header bit whose fields all hold their defaults could have been
    /// left clear.
    fn check_header_defaults(
        &self,
        rec: &RecordSpec,
        out: &Record,
        headers: &Headers<'_>,
    ) -> CodecResult<()> {
        if !self.strict() {
            return Ok(());
        }
        for header in &rec.fields {
            let FieldRole::PresenceHeader { width } = header.role else {
                continue;
            };
            for bit in 0..width {
                if headers.bit(&header.name, bit) != Some(true)
                    || self.member_bound(rec, &header.name, bit)
                {
                    continue;
                }
                let bound: Vec<&FieldSpec> = rec
                    .fields
                    .iter()
                    .filter(|f| bound_to(&f.presence, &header.name, bit))
                    .collect();
                if bound.is_empty() || bound.iter().any(|f| f.default.is_none()) {
                    continue;
                }
                let all_default = bound.iter().all(|f| {
                    extract(self.registry, f, out)
                        .is_ok_and(|v| v.as_ref() == f.default.as_ref())
                });
                if all_default {
                    return Err(CodecError::non_canonical(format!(
                        "bit {bit} of `{}` is set but its fields hold their defaults",
                        header.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Derived values the encoder would have written differently.
    fn check_derived(&self, rec: &RecordSpec, frame: &Frame<'_>) -> CodecResult<()> {
        for &(i, n) in &frame.fits {
            let field = &rec.fields[i];
            let (FieldRole::Derived(Derivation::Fit { min }), Some(slot)) = (&field.role, &field.slot)
            else {
                continue;
            };
            let fit = i64::from(fit_width(self.registry, rec, i, &frame.out, slot, *min)?);
            if n != fit {
                canonical(
                    self.strict(),
                    format!("`{}` is {n} where {fit} bits suffice", field.name),
                )?;
            }
        }
        for (field, size) in &frame.sizes {
            let FieldRole::Size(SizeSpec {
                zero: ZeroSize::WhenEmpty(name),
                ..
            }) = &field.role
            else {
                continue;
            };
            let empty = value_len(frame.out.get(name)) == 0;
            if empty != (*size == 0) {
                canonical(
                    self.strict(),
                    format!("`{}` is {size} while `{name}` has {} entries", field.name, value_len(frame.out.get(name))),
                )?;
            }
        }
        Ok(())
    }

    fn member_bound(&self, rec: &RecordSpec, header: &str, bit: u8) -> bool {
        rec.fields.iter().filter(|f| f.flatten).any(|f| {
            matches!(self.registry.deref(&f.codec), Ok(TypeCodec::BitGroup(group))
                if group.members.iter().any(|m| bound_to(&m.presence, header, bit)))
        })
    }
}

pub(crate) fn bound_to(presence: &Presence, header: &str, bit: u8) -> bool {
    matches!(presence, Presence::HeaderBit { header: h, bit: b } if h == header && *b == bit)
}

pub(crate) fn enum_value(spec: &EnumSpec, code: i64) -> CodecResult<Value> {
    spec.by_code(code)
        .map(|v| Value::Enum(v.label.clone()))
        .ok_or_else(|| {
            ErrorKind::UnknownVariant {
                discriminant: format!("{} code {code}", spec.name),
            }
            .into()
        })
}

/// Store a decoded field, merging flattened members into the parent.
fn insert(out: &mut Record, field: &FieldSpec, value: Value) -> CodecResult<()> {
    if field.flatten {
        match value {
            Value::Record(members) => out.extend(members),
            other => return Err(CodecError::mismatch("record", other.kind().name())),
        }
    } else {
        out.insert(field.name.clone(), value);
    }
    Ok(())
}

/// Current value of `field` inside `record` (flattened members regrouped).
pub(crate) fn extract(
    registry: &SchemaRegistry,
    field: &FieldSpec,
    record: &Record,
) -> CodecResult<Option<Value>> {
    if !field.flatten {
        return Ok(record.get(&field.name).cloned());
    }
    let members: Record = registry
        .flattened_keys(&field.codec)?
        .into_iter()
        .filter_map(|key| record.get(key).map(|v| (key.to_string(), v.clone())))
        .collect();
    Ok((!members.is_empty()).then_some(Value::Record(members)))
}
