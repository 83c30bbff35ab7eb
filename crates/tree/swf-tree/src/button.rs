//! Buttons: character records and condition actions.

use swf_codec_core::schema::{
    prim, FieldSpec, IntKind, LengthPrefix, RecordSpec, SizeSpec, Termination, TypeCodec, ZeroSize,
};
use swf_codec_core::{SchemaBuilder, Value};

use crate::decl::{counted, reserved_bits, rest, tag, terminated, ty, when};

const TRANSITIONS: [&str; 8] = [
    "idleToOverDown",
    "outDownToIdle",
    "outDownToOverDown",
    "overDownToOutDown",
    "overDownToOverUp",
    "overUpToOverDown",
    "overUpToIdle",
    "idleToOverUp",
];

fn states(rec: RecordSpec) -> RecordSpec {
    rec.required("stateHitTest", prim::bit())
        .required("stateDown", prim::bit())
        .required("stateOver", prim::bit())
        .required("stateUp", prim::bit())
        .required("characterId", prim::u16())
        .required("depth", prim::u16())
        .required("matrix", ty("Matrix"))
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    // DefineButton has no colour transform, filters or blend mode
    b.record(
        states(RecordSpec::new("ButtonRecord1").field(reserved_bits("reserved", 4))).field(
            FieldSpec::implied(
                "colorTransform",
                ty("ColorTransformWithAlpha"),
                Value::record::<&str, _>([]),
            ),
        ),
    );
    b.record(
        states(
            RecordSpec::new("ButtonRecord")
                .field(reserved_bits("reserved", 2))
                .field(FieldSpec::presence_header("flags", 2)),
        )
        .required("colorTransform", ty("ColorTransformWithAlpha"))
        .field(when(
            "flags",
            0,
            "filters",
            counted("Filter", LengthPrefix::Int(IntKind::U8)),
        ))
        .field(when("flags", 1, "blendMode", ty("BlendMode"))),
    );

    b.record(
        TRANSITIONS
            .iter()
            .fold(RecordSpec::new("ButtonCondition"), |rec, name| {
                rec.required(*name, prim::bit())
            })
            .required("keyPress", prim::ubits(7))
            .required("overDownToIdle", prim::bit()),
    );
    // `size` is the offset to the next entry, zero on the last one
    b.record(
        RecordSpec::new("ButtonCondAction")
            .field(FieldSpec::size(
                "size",
                SizeSpec::new(IntKind::U16)
                    .including_self()
                    .zero_when(ZeroSize::LastItem),
            ))
            .required("conditions", ty("ButtonCondition"))
            .required("actions", rest()),
    );

    // Actions stay opaque, end marker included.
    b.record(
        tag("DefineButton")
            .required("id", prim::u16())
            .field(FieldSpec::implied("trackAsMenu", prim::bit(), Value::Bool(false)))
            .required("characters", terminated("ButtonRecord1", 8, true))
            .required("actions", rest()),
    );
    b.record(
        tag("DefineButton2")
            .required("id", prim::u16())
            .field(reserved_bits("reserved", 7))
            .required("trackAsMenu", prim::bit())
            .field(FieldSpec::size(
                "actionOffset",
                SizeSpec::new(IntKind::U16)
                    .including_self()
                    .until("actions")
                    .zero_when(ZeroSize::WhenEmpty("actions".into())),
            ))
            .required("characters", terminated("ButtonRecord", 8, true))
            .required(
                "actions",
                TypeCodec::array_of(ty("ButtonCondAction"), Termination::Remaining),
            ),
    );
}
