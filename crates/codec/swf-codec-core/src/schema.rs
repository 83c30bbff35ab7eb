//! Schema-as-data: declarative descriptions of binary and JSON encodings.
//!
//! Specs are plain values assembled with the builder helpers below and handed
//! to [`crate::registry::SchemaBuilder`]. Named references stay unbound until
//! the registry build binds them, so declarations can reference each other in
//! any order (including cycles).

use serde::{Serialize, Serializer};

use crate::case::CaseStyle;
use crate::fixed::FixedKind;
use crate::value::{record_path, Record, Value};

/// Index of a type inside a built registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntKind {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
}

impl IntKind {
    pub fn bits(self) -> u8 {
        match self {
            IntKind::U8 | IntKind::I8 => 8,
            IntKind::U16 | IntKind::I16 => 16,
            IntKind::U32 | IntKind::I32 => 32,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32)
    }

    pub fn range(self) -> (i64, i64) {
        int_range(self.bits(), self.is_signed())
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
        }
    }
}

pub(crate) fn int_range(bits: u8, signed: bool) -> (i64, i64) {
    let bits = u32::from(bits);
    if bits == 0 {
        return (0, 0);
    }
    if signed {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    } else {
        (0, (1i64 << bits) - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolRepr {
    /// A single flag bit.
    Bit,
    /// A whole byte, 0 or 1.
    Byte,
}

/// How a count or byte length is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPrefix {
    /// Byte-aligned unsigned integer.
    Int(IntKind),
    /// Unsigned bit field of the given width.
    Bits(u8),
    EncodedU32,
    /// `u8`, escaping to a following `u16` when the byte is `0xff`.
    ExtendedU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMode {
    NullTerminated,
    LengthPrefixed(LengthPrefix),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BytesMode {
    LengthPrefixed(LengthPrefix),
    Fixed(usize),
    /// Everything left in the enclosing bounded body.
    Remaining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool(BoolRepr),
    Int(IntKind),
    /// MSB-first bit-packed integer, `1..=32` bits wide.
    Bits { width: u8, signed: bool },
    Fixed(FixedKind),
    /// IEEE-754 half precision, read into an `f32`.
    Float16,
    Float32,
    Float64,
    EncodedU32,
    Str(StringMode),
    Bytes(BytesMode),
}

impl Primitive {
    /// Byte-oriented primitives align the cursor before touching it.
    pub fn is_byte_aligned(&self) -> bool {
        !matches!(
            self,
            Primitive::Bool(BoolRepr::Bit) | Primitive::Bits { .. }
        )
    }

    pub fn describe(&self) -> String {
        match self {
            Primitive::Bool(BoolRepr::Bit) => "bool bit".to_string(),
            Primitive::Bool(BoolRepr::Byte) => "bool byte".to_string(),
            Primitive::Int(kind) => kind.name().to_string(),
            Primitive::Bits { width, signed } => {
                format!("{}b{width}", if *signed { "s" } else { "u" })
            }
            Primitive::Fixed(kind) => kind.name().to_string(),
            Primitive::Float16 => "f16".to_string(),
            Primitive::Float32 => "f32".to_string(),
            Primitive::Float64 => "f64".to_string(),
            Primitive::EncodedU32 => "encoded u32".to_string(),
            Primitive::Str(_) => "string".to_string(),
            Primitive::Bytes(_) => "bytes".to_string(),
        }
    }
}

/// A named reference to another registry type.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub(crate) id: Option<TypeId>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    /// Bound slot, available once the registry is built.
    pub fn id(&self) -> Option<TypeId> {
        self.id
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeRef {}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// A constant. Decode checks it, encode writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralSpec {
    pub codec: Box<TypeCodec>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumVariant {
    /// Logical PascalCase label.
    pub label: String,
    pub code: i64,
    /// JSON label, memoized at registry build.
    pub wire_label: String,
}

/// Closed set of labelled integer codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumSpec {
    pub name: String,
    /// `Int` or `Bits`.
    pub repr: Primitive,
    pub variants: Vec<EnumVariant>,
    pub case_style: CaseStyle,
}

impl EnumSpec {
    pub fn new(name: impl Into<String>, repr: Primitive) -> Self {
        Self {
            name: name.into(),
            repr,
            variants: Vec::new(),
            case_style: CaseStyle::KebabCase,
        }
    }

    pub fn variant(mut self, label: impl Into<String>, code: i64) -> Self {
        self.variants.push(EnumVariant {
            label: label.into(),
            code,
            wire_label: String::new(),
        });
        self
    }

    pub fn by_code(&self, code: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.code == code)
    }

    pub fn by_label(&self, label: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.label == label)
    }

    pub fn by_wire_label(&self, label: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.wire_label == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitMemberKind {
    Signed,
    Unsigned,
    /// Signed 8.8 fixed point.
    Fixed8,
    /// Signed 16.16 fixed point.
    Fixed16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitMember {
    pub name: String,
    pub kind: BitMemberKind,
    /// `Required` or `HeaderBit` (the latter only when flattened).
    pub presence: Presence,
    pub wire_name: String,
}

/// Members sharing one bit width, written as a `width_bits` count followed by
/// each present member at that width. The canonical count is the minimal one.
///
/// With a `width_bias` the count field stores `width - bias`, and no member is
/// ever narrower than the bias.
///
/// An `axis_pair` group has exactly two members. After the count comes a
/// general flag: set, both members follow; clear, an axis bit picks the one
/// member written (0 the first, 1 the second) and the other reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitGroupSpec {
    pub name: String,
    pub width_bits: u8,
    pub width_bias: u8,
    pub members: Vec<BitMember>,
    pub align_end: bool,
    pub axis_pair: bool,
}

impl BitGroupSpec {
    pub fn new(name: impl Into<String>, width_bits: u8) -> Self {
        Self {
            name: name.into(),
            width_bits,
            width_bias: 0,
            members: Vec::new(),
            align_end: true,
            axis_pair: false,
        }
    }

    pub fn biased(mut self, bias: u8) -> Self {
        self.width_bias = bias;
        self
    }

    /// Widest member width the count field can express.
    pub fn max_width(&self) -> u8 {
        (((1u32 << self.width_bits) - 1) + u32::from(self.width_bias)).min(32) as u8
    }

    pub fn member(self, name: impl Into<String>, kind: BitMemberKind) -> Self {
        self.member_with(name, kind, Presence::Required)
    }

    pub fn member_with(
        mut self,
        name: impl Into<String>,
        kind: BitMemberKind,
        presence: Presence,
    ) -> Self {
        self.members.push(BitMember {
            name: name.into(),
            kind,
            presence,
            wire_name: String::new(),
        });
        self
    }

    pub fn members(self, names: &[&str], kind: BitMemberKind) -> Self {
        names.iter().fold(self, |group, name| group.member(*name, kind))
    }

    pub fn unaligned(mut self) -> Self {
        self.align_end = false;
        self
    }

    pub fn axis_pair(mut self) -> Self {
        self.axis_pair = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Count(usize),
    LengthPrefix(LengthPrefix),
    /// Until the enclosing body is exhausted.
    Remaining,
    /// Items until `width` bits equal to `value`; written after the items.
    Terminator { width: u8, value: u32, aligned: bool },
    /// Count is the product of the named slots, set earlier in the stream.
    Slots(Vec<String>),
    OffsetTable(OffsetTable),
}

impl Termination {
    pub fn slot(name: impl Into<String>) -> Self {
        Termination::Slots(vec![name.into()])
    }

    /// Whether items run to the end of the enclosing body.
    pub fn is_open_ended(&self) -> bool {
        matches!(
            self,
            Termination::Remaining | Termination::Terminator { .. }
        )
    }
}

/// Byte offsets, one per item and counted from the start of the table, then
/// the items themselves. Offsets are `u16`, or `u32` while the `wide` slot is
/// non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetTable {
    /// Slot holding the item count. Without one the count is the first offset
    /// divided by the offset width, and the last item runs to the end of the
    /// body.
    pub count: Option<String>,
    pub wide: Option<String>,
    /// A final offset pointing past the last item; written only when there
    /// are items.
    pub end_offset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArraySpec {
    pub item: Box<TypeCodec>,
    pub min_len: usize,
    pub max_len: Option<usize>,
    pub termination: Termination,
}

impl ArraySpec {
    pub fn new(item: TypeCodec, termination: Termination) -> Self {
        let min_len = match termination {
            Termination::Count(n) => n,
            _ => 0,
        };
        let max_len = match termination {
            Termination::Count(n) => Some(n),
            _ => None,
        };
        Self {
            item: Box::new(item),
            min_len,
            max_len,
            termination,
        }
    }

    pub fn min_len(mut self, min: usize) -> Self {
        self.min_len = min;
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }
}

/// How an optional field signals presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    /// 1-bit flag immediately before the value.
    LeadingBit,
    /// Bit `bit` (from the LSB) of an earlier presence header field.
    HeaderBit { header: String, bit: u8 },
    /// Absent iff the wire value equals this one.
    Sentinel(Value),
    /// Present iff the earlier boolean at this dotted path is true.
    WhenTrue(String),
    /// Present iff the earlier value at this dotted path equals `value`.
    WhenEquals { path: String, value: Value },
    /// Present iff any bit of `mask` is set in an earlier presence header.
    /// Unlike `HeaderBit` it never sets header bits itself.
    HeaderAny { header: String, mask: u32 },
    /// Present iff bytes remain in the enclosing body.
    Remaining,
}

impl Presence {
    pub fn is_optional(&self) -> bool {
        !matches!(self, Presence::Required)
    }

    pub fn header_bit(header: impl Into<String>, bit: u8) -> Self {
        Presence::HeaderBit {
            header: header.into(),
            bit,
        }
    }

    pub fn when_equals(path: impl Into<String>, value: Value) -> Self {
        Presence::WhenEquals {
            path: path.into(),
            value,
        }
    }

    /// Dotted path of a value this presence depends on.
    pub fn dependency(&self) -> Option<&str> {
        match self {
            Presence::WhenTrue(path) | Presence::WhenEquals { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether a value-dependent presence holds against the fields seen so
    /// far; `None` for the other kinds.
    pub fn holds_in(&self, record: &Record) -> Option<bool> {
        match self {
            Presence::WhenTrue(path) => Some(record_path(record, path) == Some(&Value::Bool(true))),
            Presence::WhenEquals { path, value } => Some(record_path(record, path) == Some(value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Value,
    /// On the wire only (reserved bits, padding constants).
    Hidden,
    /// Bitmask whose bits are derived from the presence of later fields.
    PresenceHeader { width: u8 },
    /// In the value only: decodes as the field default, and encode rejects
    /// anything else.
    Implied,
    /// Unsigned integer on the wire only, computed by the encoder and stored
    /// in the field's slot.
    Derived(Derivation),
    /// Byte length of a run of the record's fields, on the wire only.
    Size(SizeSpec),
}

/// How a derived field is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Item count of an array field.
    CountOf(String),
    /// Bits needed to write the item count of an earlier array field.
    CountWidth(String),
    /// Smallest width, and at least `min`, that holds every value the rest of
    /// the record writes through this field's slot before the slot is set
    /// again.
    Fit { min: u8 },
}

/// When a size field may hold zero instead of the run length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSize {
    Never,
    /// The record is the last item of its array; the run then extends to the
    /// end of the body.
    LastItem,
    /// The named array or byte field is empty.
    WhenEmpty(String),
}

/// A byte count covering the fields from `from` (the field after the size
/// when unset) up to, excluding, `until` (the end of the record when unset).
/// Fields between the size and `from` are not counted. The run starts and
/// ends on a byte boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeSpec {
    pub int: IntKind,
    /// The count includes the size field itself.
    pub include_self: bool,
    pub from: Option<String>,
    pub until: Option<String>,
    pub zero: ZeroSize,
}

impl SizeSpec {
    pub fn new(int: IntKind) -> Self {
        Self {
            int,
            include_self: false,
            from: None,
            until: None,
            zero: ZeroSize::Never,
        }
    }

    pub fn including_self(mut self) -> Self {
        self.include_self = true;
        self
    }

    pub fn from(mut self, field: impl Into<String>) -> Self {
        self.from = Some(field.into());
        self
    }

    pub fn until(mut self, field: impl Into<String>) -> Self {
        self.until = Some(field.into());
        self
    }

    pub fn zero_when(mut self, zero: ZeroSize) -> Self {
        self.zero = zero;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Logical camelCase name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    pub wire_name: String,
    pub codec: TypeCodec,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub role: FieldRole,
    pub flatten: bool,
    /// Slot this field sets: derived fields always have one, value fields
    /// publish their integer or boolean value through it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, codec: TypeCodec) -> Self {
        Self {
            name: name.into(),
            rename: None,
            wire_name: String::new(),
            codec,
            presence: Presence::Required,
            default: None,
            role: FieldRole::Value,
            flatten: false,
            slot: None,
        }
    }

    pub fn optional(name: impl Into<String>, codec: TypeCodec, presence: Presence) -> Self {
        Self {
            presence,
            ..Self::new(name, codec)
        }
    }

    /// Visible constant (e.g. a variant discriminant).
    pub fn literal(name: impl Into<String>, codec: TypeCodec, value: Value) -> Self {
        Self::new(name, TypeCodec::literal(codec, value))
    }

    /// Hidden constant such as reserved bits.
    pub fn reserved(name: impl Into<String>, codec: TypeCodec, value: Value) -> Self {
        Self {
            role: FieldRole::Hidden,
            ..Self::literal(name, codec, value)
        }
    }

    pub fn presence_header(name: impl Into<String>, width: u8) -> Self {
        Self {
            role: FieldRole::PresenceHeader { width },
            ..Self::new(
                name,
                TypeCodec::Primitive(Primitive::Bits {
                    width,
                    signed: false,
                }),
            )
        }
    }

    /// Value-only constant, absent from the wire.
    pub fn implied(name: impl Into<String>, codec: TypeCodec, value: Value) -> Self {
        Self {
            role: FieldRole::Implied,
            default: Some(value),
            ..Self::new(name, codec)
        }
    }

    pub fn derived(
        name: impl Into<String>,
        codec: TypeCodec,
        slot: impl Into<String>,
        rule: Derivation,
    ) -> Self {
        Self {
            role: FieldRole::Derived(rule),
            slot: Some(slot.into()),
            ..Self::new(name, codec)
        }
    }

    pub fn size(name: impl Into<String>, spec: SizeSpec) -> Self {
        let codec = TypeCodec::Primitive(Primitive::Int(spec.int));
        Self {
            role: FieldRole::Size(spec),
            ..Self::new(name, codec)
        }
    }

    pub fn publish(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Part of the logical value (and of the JSON object).
    pub fn is_value(&self) -> bool {
        matches!(self.role, FieldRole::Value | FieldRole::Implied)
    }

    /// Present in the value and on the wire.
    pub fn is_wire_value(&self) -> bool {
        self.role == FieldRole::Value
    }

    /// JSON key, valid once the registry is built.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub case_style: CaseStyle,
    /// Pad to a byte boundary after the last field.
    pub align_end: bool,
}

impl RecordSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            case_style: CaseStyle::SnakeCase,
            align_end: true,
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn required(self, name: impl Into<String>, codec: TypeCodec) -> Self {
        self.field(FieldSpec::new(name, codec))
    }

    pub fn unaligned(mut self) -> Self {
        self.align_end = false;
        self
    }

    pub fn case_style(mut self, style: CaseStyle) -> Self {
        self.case_style = style;
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field indices `[start, end)` measured by the size field at `at`.
    pub fn size_run(&self, at: usize, spec: &SizeSpec) -> Option<(usize, usize)> {
        let start = match &spec.from {
            Some(name) => self.position(name)?,
            None => at + 1,
        };
        let end = match &spec.until {
            Some(name) => self.position(name)?,
            None => self.fields.len(),
        };
        (at < start && start <= end).then_some((start, end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    None,
    /// Body byte length after the discriminant.
    LengthPrefixed(LengthPrefix),
    /// SWF RECORDHEADER: `u16 code << 6 | len`, `len == 0x3f` escapes to a `u32`.
    SwfTagHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantCase {
    pub literal: Value,
    pub record: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSpec {
    pub name: String,
    /// Logical name of the discriminant field shared by every case record.
    pub discriminant: String,
    pub discriminant_codec: Box<TypeCodec>,
    pub cases: Vec<VariantCase>,
    pub framing: Framing,
}

impl VariantSpec {
    pub fn new(
        name: impl Into<String>,
        discriminant: impl Into<String>,
        discriminant_codec: TypeCodec,
    ) -> Self {
        Self {
            name: name.into(),
            discriminant: discriminant.into(),
            discriminant_codec: Box::new(discriminant_codec),
            cases: Vec::new(),
            framing: Framing::None,
        }
    }

    pub fn case(mut self, literal: Value, record: impl Into<String>) -> Self {
        self.cases.push(VariantCase {
            literal,
            record: TypeRef::new(record),
        });
        self
    }

    /// Case whose enum label and record name coincide.
    pub fn enum_case(self, label: &str) -> Self {
        self.case(Value::enumeration(label), label)
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn case_for(&self, literal: &Value) -> Option<&VariantCase> {
        self.cases.iter().find(|c| &c.literal == literal)
    }
}

/// A node of the codec tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCodec {
    Primitive(Primitive),
    Literal(LiteralSpec),
    Enum(EnumSpec),
    BitGroup(BitGroupSpec),
    Array(ArraySpec),
    Record(RecordSpec),
    Variant(VariantSpec),
    Ref(TypeRef),
    /// Bit field whose width is the current value of a slot.
    SlotBits(SlotBits),
    /// Codec picked by the current value of a slot.
    Switch(SwitchSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotBits {
    pub slot: String,
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchSpec {
    pub slot: String,
    pub cases: Vec<(i64, TypeCodec)>,
}

impl SwitchSpec {
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, when: i64, codec: TypeCodec) -> Self {
        self.cases.push((when, codec));
        self
    }

    pub fn codec_for(&self, slot_value: i64) -> Option<&TypeCodec> {
        self.cases
            .iter()
            .find(|(when, _)| *when == slot_value)
            .map(|(_, codec)| codec)
    }
}

impl TypeCodec {
    pub fn reference(name: impl Into<String>) -> Self {
        TypeCodec::Ref(TypeRef::new(name))
    }

    pub fn literal(codec: TypeCodec, value: Value) -> Self {
        TypeCodec::Literal(LiteralSpec {
            codec: Box::new(codec),
            value,
        })
    }

    pub fn array(spec: ArraySpec) -> Self {
        TypeCodec::Array(spec)
    }

    /// `Array<item>` with the given termination.
    pub fn array_of(item: TypeCodec, termination: Termination) -> Self {
        TypeCodec::Array(ArraySpec::new(item, termination))
    }

    pub fn describe(&self) -> String {
        match self {
            TypeCodec::Primitive(p) => p.describe(),
            TypeCodec::Literal(l) => format!("literal {}", l.value),
            TypeCodec::Enum(e) => e.name.clone(),
            TypeCodec::BitGroup(g) => g.name.clone(),
            TypeCodec::Array(a) => format!("array of {}", a.item.describe()),
            TypeCodec::Record(r) => r.name.clone(),
            TypeCodec::Variant(v) => v.name.clone(),
            TypeCodec::Ref(r) => r.name.clone(),
            TypeCodec::SlotBits(bits) => format!("bits sized by `{}`", bits.slot),
            TypeCodec::Switch(switch) => format!("switch on `{}`", switch.slot),
        }
    }
}

/// Shorthand constructors used by declaration modules.
pub mod prim {
    use super::*;

    pub fn bit() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Bool(BoolRepr::Bit))
    }

    pub fn bool_byte() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Bool(BoolRepr::Byte))
    }

    pub fn int(kind: IntKind) -> TypeCodec {
        TypeCodec::Primitive(Primitive::Int(kind))
    }

    pub fn u8() -> TypeCodec {
        int(IntKind::U8)
    }

    pub fn u16() -> TypeCodec {
        int(IntKind::U16)
    }

    pub fn u32() -> TypeCodec {
        int(IntKind::U32)
    }

    pub fn i16() -> TypeCodec {
        int(IntKind::I16)
    }

    pub fn ubits(width: u8) -> TypeCodec {
        TypeCodec::Primitive(Primitive::Bits {
            width,
            signed: false,
        })
    }

    pub fn sbits(width: u8) -> TypeCodec {
        TypeCodec::Primitive(Primitive::Bits {
            width,
            signed: true,
        })
    }

    pub fn fixed(kind: FixedKind) -> TypeCodec {
        TypeCodec::Primitive(Primitive::Fixed(kind))
    }

    pub fn f16() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Float16)
    }

    pub fn f32() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Float32)
    }

    pub fn f64() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Float64)
    }

    pub fn encoded_u32() -> TypeCodec {
        TypeCodec::Primitive(Primitive::EncodedU32)
    }

    pub fn cstring() -> TypeCodec {
        TypeCodec::Primitive(Primitive::Str(StringMode::NullTerminated))
    }

    pub fn bytes(mode: BytesMode) -> TypeCodec {
        TypeCodec::Primitive(Primitive::Bytes(mode))
    }

    pub fn reference(name: &str) -> TypeCodec {
        TypeCodec::reference(name)
    }

    pub fn slot_bits(slot: &str, signed: bool) -> TypeCodec {
        TypeCodec::SlotBits(SlotBits {
            slot: slot.to_string(),
            signed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_arrays_pin_both_bounds() {
        let spec = ArraySpec::new(prim::f32(), Termination::Count(20));
        assert_eq!((spec.min_len, spec.max_len), (20, Some(20)));
        let spec = ArraySpec::new(prim::u8(), Termination::Remaining).max_len(4);
        assert_eq!((spec.min_len, spec.max_len), (0, Some(4)));
    }

    #[test]
    fn type_refs_compare_by_name() {
        let mut bound = TypeRef::new("Shape");
        bound.id = Some(TypeId(3));
        assert_eq!(bound, TypeRef::new("Shape"));
        assert_eq!(
            serde_json::to_value(&bound).unwrap(),
            serde_json::json!("Shape")
        );
    }

    #[test]
    fn size_runs_resolve_to_field_ranges() {
        let rec = RecordSpec::new("Jpeg")
            .required("id", prim::u16())
            .field(FieldSpec::size("alphaOffset", SizeSpec::new(IntKind::U32).from("image").until("alpha")))
            .required("deblock", prim::u16())
            .required("image", prim::bytes(BytesMode::Remaining))
            .required("alpha", prim::bytes(BytesMode::Remaining));
        let FieldRole::Size(spec) = &rec.fields[1].role else {
            panic!("not a size field");
        };
        assert_eq!(rec.size_run(1, spec), Some((3, 4)));
        assert_eq!(rec.size_run(1, &SizeSpec::new(IntKind::U8)), Some((2, 5)));
        assert_eq!(rec.size_run(3, &SizeSpec::new(IntKind::U8).until("deblock")), None);
    }

    #[test]
    fn implied_fields_are_values_but_not_wire_values() {
        let field = FieldSpec::implied("a", prim::u8(), Value::Int(255));
        assert!(field.is_value());
        assert!(!field.is_wire_value());
        assert_eq!(field.default, Some(Value::Int(255)));
        assert!(!FieldSpec::derived("n", prim::u8(), "n", Derivation::CountOf("xs".into())).is_value());
    }

    #[test]
    fn int_ranges() {
        assert_eq!(IntKind::U8.range(), (0, 255));
        assert_eq!(IntKind::I16.range(), (-32768, 32767));
        assert_eq!(IntKind::U32.range(), (0, u32::MAX as i64));
        assert_eq!(int_range(5, true), (-16, 15));
    }
}
