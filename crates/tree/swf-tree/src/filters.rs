//! Surface filters (FILTER), a closed variant keyed by the filter id byte.

use swf_codec_core::schema::{
    prim, Derivation, EnumSpec, FieldSpec, IntKind, Primitive, RecordSpec, Termination,
    TypeCodec, VariantSpec,
};
use swf_codec_core::{FixedKind, SchemaBuilder, Value};

use crate::decl::{case_record, reserved_bits, ty};

const FILTERS: [(&str, i64); 8] = [
    ("DropShadow", 0),
    ("Blur", 1),
    ("Glow", 2),
    ("Bevel", 3),
    ("GradientGlow", 4),
    ("Convolution", 5),
    ("ColorMatrix", 6),
    ("GradientBevel", 7),
];

fn filter(label: &str) -> RecordSpec {
    case_record(label, "filter", "FilterType", label)
}

fn fixed16() -> TypeCodec {
    prim::fixed(FixedKind::Sfixed16P16)
}

fn fixed8() -> TypeCodec {
    prim::fixed(FixedKind::Sfixed8P8)
}

/// Always set by authoring tools.
fn composite_source() -> FieldSpec {
    FieldSpec::reserved("compositeSource", prim::bit(), Value::Bool(true))
}

fn per_color(item: TypeCodec) -> TypeCodec {
    TypeCodec::array_of(item, Termination::slot("colorCount"))
}

fn blur(rec: RecordSpec) -> RecordSpec {
    rec.required("blurX", fixed16()).required("blurY", fixed16())
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    b.enumeration(
        FILTERS.iter().fold(
            EnumSpec::new("FilterType", Primitive::Int(IntKind::U8)),
            |spec, (label, code)| spec.variant(*label, *code),
        ),
    );
    b.variant(
        FILTERS
            .iter()
            .fold(
                VariantSpec::new("Filter", "filter", ty("FilterType")),
                |spec, (label, _)| spec.enum_case(label),
            ),
    );

    b.record(
        blur(filter("DropShadow").required("color", ty("StraightSRgba8")))
            .required("angle", fixed16())
            .required("distance", fixed16())
            .required("strength", fixed8())
            .required("innerShadow", prim::bit())
            .required("knockout", prim::bit())
            .field(composite_source())
            .required("passes", prim::ubits(5)),
    );
    b.record(
        blur(filter("Blur"))
            .required("passes", prim::ubits(5))
            .field(reserved_bits("reserved", 3)),
    );
    b.record(
        blur(filter("Glow").required("color", ty("StraightSRgba8")))
            .required("strength", fixed8())
            .required("innerGlow", prim::bit())
            .required("knockout", prim::bit())
            .field(composite_source())
            .required("passes", prim::ubits(5)),
    );
    b.record(
        blur(
            filter("Bevel")
                .required("shadowColor", ty("StraightSRgba8"))
                .required("highlightColor", ty("StraightSRgba8")),
        )
        .required("angle", fixed16())
        .required("distance", fixed16())
        .required("strength", fixed8())
        .required("innerShadow", prim::bit())
        .required("knockout", prim::bit())
        .field(composite_source())
        .required("onTop", prim::bit())
        .required("passes", prim::ubits(4)),
    );
    // colours and ratios are stored as two arrays of one length
    for label in ["GradientGlow", "GradientBevel"] {
        b.record(
            blur(
                filter(label)
                    .field(FieldSpec::derived(
                        "colorCount",
                        prim::u8(),
                        "colorCount",
                        Derivation::CountOf("colors".into()),
                    ))
                    .required("colors", per_color(ty("StraightSRgba8")))
                    .required("ratios", per_color(prim::u8())),
            )
            .required("angle", fixed16())
            .required("distance", fixed16())
            .required("strength", fixed8())
            .required("innerShadow", prim::bit())
            .required("knockout", prim::bit())
            .field(composite_source())
            .required("onTop", prim::bit())
            .required("passes", prim::ubits(4)),
        );
    }
    b.record(
        filter("Convolution")
            .field(FieldSpec::new("columns", prim::u8()).publish("columns"))
            .field(FieldSpec::new("rows", prim::u8()).publish("rows"))
            .required("divisor", prim::f32())
            .required("bias", prim::f32())
            .required(
                "matrix",
                TypeCodec::array_of(
                    prim::f32(),
                    Termination::Slots(vec!["columns".into(), "rows".into()]),
                ),
            )
            .required("defaultColor", ty("StraightSRgba8"))
            .field(reserved_bits("reserved", 6))
            .required("clamp", prim::bit())
            .required("preserveAlpha", prim::bit()),
    );
    b.record(
        filter("ColorMatrix")
            .required("matrix", TypeCodec::array_of(prim::f32(), Termination::Count(20))),
    );
}
