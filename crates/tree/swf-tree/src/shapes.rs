//! Fill and line styles, shape records and their morph counterparts.
//!
//! Shapes come in four generations, one per DefineShape tag. They differ in
//! colour width, style count encoding and line style layout, so each
//! generation gets its own family of types, suffixed with its version
//! (`Shape1`, `Shape2`, `Shape` for DefineShape3, `Shape4`).
//!
//! Style indices in style-change records are as wide as the `fillBits` and
//! `lineBits` nibbles written after the most recent style arrays.

use swf_codec_core::schema::{
    prim, BitGroupSpec, BitMemberKind, Derivation, EnumSpec, FieldSpec, IntKind, LengthPrefix,
    Presence, Primitive, RecordSpec, SizeSpec, VariantSpec,
};
use swf_codec_core::{FixedKind, SchemaBuilder, Value};

use crate::decl::{case_record, counted, reserved_bits, terminated, ty, when};

const BITMAP_FILLS: [(&str, i64); 4] = [
    ("RepeatingBitmap", 0x40),
    ("ClippedBitmap", 0x41),
    ("NonSmoothedRepeatingBitmap", 0x42),
    ("NonSmoothedClippedBitmap", 0x43),
];

/// One shape generation.
struct Family {
    suffix: &'static str,
    fill: &'static str,
    line: &'static str,
    counts: LengthPrefix,
}

const FAMILIES: [Family; 4] = [
    Family {
        suffix: "1",
        fill: "FillStyle1",
        line: "LineStyle1",
        counts: LengthPrefix::Int(IntKind::U8),
    },
    Family {
        suffix: "2",
        fill: "FillStyle1",
        line: "LineStyle1",
        counts: LengthPrefix::ExtendedU8,
    },
    Family {
        suffix: "",
        fill: "FillStyle",
        line: "LineStyle",
        counts: LengthPrefix::ExtendedU8,
    },
    Family {
        suffix: "4",
        fill: "FillStyle",
        line: "LineStyle2",
        counts: LengthPrefix::ExtendedU8,
    },
];

fn fill(record: &str, label: &str) -> RecordSpec {
    case_record(record, "type", "FillStyleType", label)
}

fn bits(width: u8) -> Primitive {
    Primitive::Bits {
        width,
        signed: false,
    }
}

/// Style-index bit count, checked against the style array it indexes.
fn count_width(name: &str, array: &str) -> FieldSpec {
    FieldSpec::derived(name, prim::ubits(4), name, Derivation::CountWidth(array.into()))
}

/// Style-index bit count of a shape without style arrays of its own.
fn fit_width(name: &str, min: u8) -> FieldSpec {
    FieldSpec::derived(name, prim::ubits(4), name, Derivation::Fit { min })
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    declare_fills(b);
    declare_line_styles(b);
    declare_edges(b);
    for family in &FAMILIES {
        declare_family(b, family);
    }
    declare_simple_shapes(b);
    declare_morph_styles(b);
}

fn declare_fills(b: &mut SchemaBuilder) {
    b.enumeration(
        BITMAP_FILLS.iter().fold(
            EnumSpec::new("FillStyleType", Primitive::Int(IntKind::U8))
                .variant("Solid", 0x00)
                .variant("LinearGradient", 0x10)
                .variant("RadialGradient", 0x12)
                .variant("FocalGradient", 0x13),
            |spec, (label, code)| spec.variant(*label, *code),
        ),
    );

    // RGBA fills, DefineShape3 onwards
    let mut fills = VariantSpec::new("FillStyle", "type", ty("FillStyleType"))
        .case(Value::enumeration("Solid"), "SolidFill")
        .case(Value::enumeration("LinearGradient"), "LinearGradientFill")
        .case(Value::enumeration("RadialGradient"), "RadialGradientFill")
        .case(Value::enumeration("FocalGradient"), "FocalGradientFill");
    // RGB fills of DefineShape and DefineShape2
    let mut fills1 = VariantSpec::new("FillStyle1", "type", ty("FillStyleType"))
        .case(Value::enumeration("Solid"), "SolidFill1")
        .case(Value::enumeration("LinearGradient"), "LinearGradientFill1")
        .case(Value::enumeration("RadialGradient"), "RadialGradientFill1");
    for (label, _) in BITMAP_FILLS {
        let record = format!("{label}Fill");
        fills = fills.case(Value::enumeration(label), record.as_str());
        fills1 = fills1.case(Value::enumeration(label), record.as_str());
        b.record(
            fill(&record, label)
                .required("bitmapId", prim::u16())
                .required("matrix", ty("Matrix")),
        );
    }
    b.variant(fills);
    b.variant(fills1);

    b.record(fill("SolidFill", "Solid").required("color", ty("StraightSRgba8")));
    b.record(fill("SolidFill1", "Solid").required("color", ty("OpaqueSRgba8")));
    for label in ["LinearGradient", "RadialGradient"] {
        b.record(
            fill(&format!("{label}Fill"), label)
                .required("matrix", ty("Matrix"))
                .required("gradient", ty("Gradient")),
        );
        b.record(
            fill(&format!("{label}Fill1"), label)
                .required("matrix", ty("Matrix"))
                .required("gradient", ty("Gradient1")),
        );
    }
    b.record(
        fill("FocalGradientFill", "FocalGradient")
            .required("matrix", ty("Matrix"))
            .required("gradient", ty("FocalGradient")),
    );
}

fn declare_line_styles(b: &mut SchemaBuilder) {
    b.record(
        RecordSpec::new("LineStyle1")
            .required("width", prim::u16())
            .required("color", ty("OpaqueSRgba8")),
    );
    b.record(
        RecordSpec::new("LineStyle")
            .required("width", prim::u16())
            .required("color", ty("StraightSRgba8")),
    );

    b.enumeration(
        EnumSpec::new("CapStyle", bits(2))
            .variant("Round", 0)
            .variant("None", 1)
            .variant("Square", 2),
    );
    b.enumeration(
        EnumSpec::new("JoinStyle", bits(2))
            .variant("Round", 0)
            .variant("Bevel", 1)
            .variant("Miter", 2),
    );
    b.record(
        line_style2_flags(RecordSpec::new("LineStyle2").required("width", prim::u16()))
            .field(FieldSpec::optional(
                "color",
                ty("StraightSRgba8"),
                Presence::when_equals("hasFill", Value::Bool(false)),
            ))
            .field(FieldSpec::optional(
                "fill",
                ty("FillStyle"),
                Presence::WhenTrue("hasFill".into()),
            )),
    );
}

/// LINESTYLE2 flags through the miter limit, shared with the morph form.
fn line_style2_flags(rec: RecordSpec) -> RecordSpec {
    rec.required("startCap", ty("CapStyle"))
        .required("join", ty("JoinStyle"))
        .required("hasFill", prim::bit())
        .required("noHScale", prim::bit())
        .required("noVScale", prim::bit())
        .required("pixelHinting", prim::bit())
        .field(reserved_bits("reserved", 5))
        .required("noClose", prim::bit())
        .required("endCap", ty("CapStyle"))
        .field(FieldSpec::optional(
            "miterLimit",
            prim::fixed(FixedKind::Ufixed8P8),
            Presence::when_equals("join", Value::enumeration("Miter")),
        ))
}

fn declare_edges(b: &mut SchemaBuilder) {
    b.enumeration(
        EnumSpec::new("ShapeRecordType", bits(1))
            .variant("StyleChange", 0)
            .variant("Edge", 1),
    );
    b.record(
        case_record("EdgeRecord", "type", "ShapeRecordType", "Edge")
            .required("segment", ty("Segment"))
            .unaligned(),
    );

    b.enumeration(
        EnumSpec::new("SegmentType", bits(1))
            .variant("Curved", 0)
            .variant("Straight", 1),
    );
    b.variant(
        VariantSpec::new("Segment", "segmentType", ty("SegmentType"))
            .case(Value::enumeration("Curved"), "CurvedSegment")
            .case(Value::enumeration("Straight"), "StraightSegment"),
    );
    // NumBits + 2
    b.bit_group(
        BitGroupSpec::new("CurveDeltas", 4)
            .biased(2)
            .members(&["controlX", "controlY", "anchorX", "anchorY"], BitMemberKind::Signed)
            .unaligned(),
    );
    // horizontal and vertical lines write a single delta
    b.bit_group(
        BitGroupSpec::new("LineDeltas", 4)
            .biased(2)
            .members(&["deltaX", "deltaY"], BitMemberKind::Signed)
            .axis_pair()
            .unaligned(),
    );
    b.record(
        case_record("CurvedSegment", "segmentType", "SegmentType", "Curved")
            .field(FieldSpec::new("deltas", ty("CurveDeltas")).flatten())
            .unaligned(),
    );
    b.record(
        case_record("StraightSegment", "segmentType", "SegmentType", "Straight")
            .field(FieldSpec::new("deltas", ty("LineDeltas")).flatten())
            .unaligned(),
    );

    b.bit_group(
        BitGroupSpec::new("MoveTo", 5)
            .members(&["x", "y"], BitMemberKind::Signed)
            .unaligned(),
    );
}

fn declare_family(b: &mut SchemaBuilder, family: &Family) {
    let v = family.suffix;
    b.record(
        RecordSpec::new(format!("ShapeStyles{v}"))
            .required("fill", counted(family.fill, family.counts))
            .required("line", counted(family.line, family.counts))
            .field(count_width("fillBits", "fill"))
            .field(count_width("lineBits", "line")),
    );
    b.record(
        case_record(&format!("StyleChangeRecord{v}"), "type", "ShapeRecordType", "StyleChange")
            .field(FieldSpec::presence_header("flags", 5))
            .field(when("flags", 0, "moveTo", ty("MoveTo")))
            .field(when("flags", 1, "fillStyle0", prim::slot_bits("fillBits", false)))
            .field(when("flags", 2, "fillStyle1", prim::slot_bits("fillBits", false)))
            .field(when("flags", 3, "lineStyle", prim::slot_bits("lineBits", false)))
            .field(when("flags", 4, "newStyles", ty(&format!("ShapeStyles{v}"))))
            .unaligned(),
    );
    b.variant(
        VariantSpec::new(format!("ShapeRecord{v}"), "type", ty("ShapeRecordType"))
            .case(Value::enumeration("StyleChange"), format!("StyleChangeRecord{v}"))
            .case(Value::enumeration("Edge"), "EdgeRecord"),
    );
    b.record(
        RecordSpec::new(format!("Shape{v}"))
            .field(FieldSpec::new("styles", ty(&format!("ShapeStyles{v}"))).flatten())
            .required("records", terminated(&format!("ShapeRecord{v}"), 6, false)),
    );
}

/// SHAPE without style arrays: glyphs and morph edges.
fn declare_simple_shapes(b: &mut SchemaBuilder) {
    // the records' bit counts come from the enclosing morph tag
    b.record(RecordSpec::new("ShapeRecords").required("records", terminated("ShapeRecord", 6, false)));
    b.record(
        RecordSpec::new("SimpleShape")
            .field(fit_width("fillBits", 0))
            .field(fit_width("lineBits", 0))
            .required("records", terminated("ShapeRecord", 6, false)),
    );
    // glyph outlines are filled with style 1
    b.record(
        RecordSpec::new("Glyph")
            .field(fit_width("fillBits", 1))
            .field(fit_width("lineBits", 0))
            .required("records", terminated("ShapeRecord", 6, false)),
    );
}

fn declare_morph_styles(b: &mut SchemaBuilder) {
    b.record(
        RecordSpec::new("MorphColorStop")
            .required("startRatio", prim::u8())
            .required("startColor", ty("StraightSRgba8"))
            .required("endRatio", prim::u8())
            .required("endColor", ty("StraightSRgba8")),
    );
    b.record(
        RecordSpec::new("MorphGradient")
            .required("colors", counted("MorphColorStop", LengthPrefix::Int(IntKind::U8))),
    );

    let mut fills = VariantSpec::new("MorphFillStyle", "type", ty("FillStyleType"))
        .case(Value::enumeration("Solid"), "MorphSolidFill")
        .case(Value::enumeration("LinearGradient"), "MorphLinearGradientFill")
        .case(Value::enumeration("RadialGradient"), "MorphRadialGradientFill");
    b.record(
        fill("MorphSolidFill", "Solid")
            .required("startColor", ty("StraightSRgba8"))
            .required("endColor", ty("StraightSRgba8")),
    );
    for label in ["LinearGradient", "RadialGradient"] {
        b.record(
            fill(&format!("Morph{label}Fill"), label)
                .required("startMatrix", ty("Matrix"))
                .required("endMatrix", ty("Matrix"))
                .required("gradient", ty("MorphGradient")),
        );
    }
    for (label, _) in BITMAP_FILLS {
        fills = fills.case(Value::enumeration(label), format!("Morph{label}Fill"));
        b.record(
            fill(&format!("Morph{label}Fill"), label)
                .required("bitmapId", prim::u16())
                .required("startMatrix", ty("Matrix"))
                .required("endMatrix", ty("Matrix")),
        );
    }
    b.variant(fills);

    b.record(
        RecordSpec::new("MorphLineStyle")
            .required("startWidth", prim::u16())
            .required("endWidth", prim::u16())
            .required("startColor", ty("StraightSRgba8"))
            .required("endColor", ty("StraightSRgba8")),
    );
    b.record(
        line_style2_flags(
            RecordSpec::new("MorphLineStyle2")
                .required("startWidth", prim::u16())
                .required("endWidth", prim::u16()),
        )
        .field(FieldSpec::optional(
            "startColor",
            ty("StraightSRgba8"),
            Presence::when_equals("hasFill", Value::Bool(false)),
        ))
        .field(FieldSpec::optional(
            "endColor",
            ty("StraightSRgba8"),
            Presence::when_equals("hasFill", Value::Bool(false)),
        ))
        .field(FieldSpec::optional(
            "fill",
            ty("MorphFillStyle"),
            Presence::WhenTrue("hasFill".into()),
        )),
    );
}

/// Fields shared by both morph shape tags after their bounds: the offset to
/// the end edges, the style arrays and both edge lists.
pub(crate) fn morph_body(rec: RecordSpec, line: &str) -> RecordSpec {
    rec.field(FieldSpec::size("offset", SizeSpec::new(IntKind::U32).until("endEdges")))
        .required("fillStyles", counted("MorphFillStyle", LengthPrefix::ExtendedU8))
        .required("lineStyles", counted(line, LengthPrefix::ExtendedU8))
        .field(count_width("fillBits", "fillStyles"))
        .field(count_width("lineBits", "lineStyles"))
        .required("startEdges", ty("ShapeRecords"))
        .required("endEdges", ty("SimpleShape"))
}

