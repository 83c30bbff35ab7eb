//! Shorthands shared by the declaration modules.

use swf_codec_core::schema::{
    prim, BytesMode, FieldSpec, LengthPrefix, Presence, RecordSpec, Termination, TypeCodec,
};
use swf_codec_core::Value;

pub(crate) fn ty(name: &str) -> TypeCodec {
    prim::reference(name)
}

/// Case record of a variant: its first field is the discriminant literal.
pub(crate) fn case_record(record: &str, field: &str, enum_name: &str, label: &str) -> RecordSpec {
    RecordSpec::new(record).field(FieldSpec::literal(
        field,
        ty(enum_name),
        Value::enumeration(label),
    ))
}

/// Case record of `Tag`, named after its tag type.
pub(crate) fn tag(name: &str) -> RecordSpec {
    case_record(name, "type", "TagType", name)
}

/// The rest of a tag body.
pub(crate) fn rest() -> TypeCodec {
    prim::bytes(BytesMode::Remaining)
}

pub(crate) fn when(header: &str, bit: u8, name: &str, codec: TypeCodec) -> FieldSpec {
    FieldSpec::optional(name, codec, Presence::header_bit(header, bit))
}

pub(crate) fn reserved_bits(name: &str, width: u8) -> FieldSpec {
    FieldSpec::reserved(name, prim::ubits(width), Value::Int(0))
}

pub(crate) fn counted(item: &str, prefix: LengthPrefix) -> TypeCodec {
    TypeCodec::array_of(ty(item), Termination::LengthPrefix(prefix))
}

pub(crate) fn terminated(item: &str, width: u8, aligned: bool) -> TypeCodec {
    TypeCodec::array_of(
        ty(item),
        Termination::Terminator {
            width,
            value: 0,
            aligned,
        },
    )
}
