//! Colours, geometry and the small records every other module builds on.

use swf_codec_core::schema::{
    prim, ArraySpec, BitGroupSpec, BitMemberKind, EnumSpec, FieldSpec, IntKind, LengthPrefix,
    Presence, Primitive, RecordSpec, Termination, TypeCodec,
};
use swf_codec_core::{FixedKind, SchemaBuilder, Value};

use crate::decl::ty;

fn bits(width: u8) -> Primitive {
    Primitive::Bits {
        width,
        signed: false,
    }
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    // Colours
    b.record(
        RecordSpec::new("SRgb8")
            .required("r", prim::u8())
            .required("g", prim::u8())
            .required("b", prim::u8()),
    );
    b.record(
        RecordSpec::new("StraightSRgba8")
            .required("r", prim::u8())
            .required("g", prim::u8())
            .required("b", prim::u8())
            .required("a", prim::u8()),
    );
    // RGB read into the RGBA model; encoding rejects any alpha but 255
    b.record(
        RecordSpec::new("OpaqueSRgba8")
            .required("r", prim::u8())
            .required("g", prim::u8())
            .required("b", prim::u8())
            .field(FieldSpec::implied("a", prim::u8(), Value::Int(255))),
    );
    b.record(
        RecordSpec::new("ColorStop")
            .required("ratio", prim::u8())
            .required("color", ty("StraightSRgba8")),
    );
    b.record(
        RecordSpec::new("ColorStop1")
            .required("ratio", prim::u8())
            .required("color", ty("OpaqueSRgba8")),
    );

    // Gradients
    b.enumeration(
        EnumSpec::new("GradientSpread", bits(2))
            .variant("Pad", 0)
            .variant("Reflect", 1)
            .variant("Repeat", 2),
    );
    b.enumeration(
        EnumSpec::new("ColorSpace", bits(2))
            .variant("SRgb", 0)
            .variant("LinearRgb", 1),
    );
    b.record(gradient("Gradient", "ColorStop"));
    b.record(gradient("Gradient1", "ColorStop1"));
    b.record(
        RecordSpec::new("FocalGradient")
            .field(FieldSpec::new("gradient", ty("Gradient")).flatten())
            .required("focalPoint", prim::fixed(FixedKind::Sfixed8P8)),
    );

    // Geometry
    b.bit_group(
        BitGroupSpec::new("Rect", 5).members(&["xMin", "xMax", "yMin", "yMax"], BitMemberKind::Signed),
    );
    b.record(
        RecordSpec::new("Vector2D")
            .required("x", prim::int(IntKind::I32))
            .required("y", prim::int(IntKind::I32)),
    );
    declare_matrix(b);
    declare_color_transform(b);

    b.record(
        RecordSpec::new("NamedId")
            .required("id", prim::u16())
            .required("name", prim::cstring()),
    );
    b.enumeration(
        EnumSpec::new("LanguageCode", Primitive::Int(IntKind::U8))
            .variant("Auto", 0)
            .variant("Latin", 1)
            .variant("Japanese", 2)
            .variant("Korean", 3)
            .variant("SimplifiedChinese", 4)
            .variant("TraditionalChinese", 5),
    );
    // 0 also means normal in the wild; only the explicit code is accepted
    b.enumeration(
        [
            "Normal",
            "Layer",
            "Multiply",
            "Screen",
            "Lighten",
            "Darken",
            "Difference",
            "Add",
            "Subtract",
            "Invert",
            "Alpha",
            "Erase",
            "Overlay",
            "Hardlight",
        ]
        .iter()
        .zip(1..)
        .fold(
            EnumSpec::new("BlendMode", Primitive::Int(IntKind::U8)),
            |spec, (label, code)| spec.variant(*label, code),
        ),
    );
}

fn gradient(name: &str, stop: &str) -> RecordSpec {
    RecordSpec::new(name)
        .required("spread", ty("GradientSpread"))
        .required("colorSpace", ty("ColorSpace"))
        .required(
            "colors",
            TypeCodec::array(
                ArraySpec::new(ty(stop), Termination::LengthPrefix(LengthPrefix::Bits(4)))
                    .max_len(15),
            ),
        )
}

/// MATRIX: optional scale and rotate/skew pairs, then the translation.
fn declare_matrix(b: &mut SchemaBuilder) {
    b.bit_group(
        BitGroupSpec::new("MatrixScale", 5)
            .members(&["scaleX", "scaleY"], BitMemberKind::Fixed16)
            .unaligned(),
    );
    b.bit_group(
        BitGroupSpec::new("MatrixRotate", 5)
            .members(&["rotateSkew0", "rotateSkew1"], BitMemberKind::Fixed16)
            .unaligned(),
    );
    b.bit_group(
        BitGroupSpec::new("MatrixTranslate", 5)
            .members(&["translateX", "translateY"], BitMemberKind::Signed)
            .unaligned(),
    );
    b.record(
        RecordSpec::new("Matrix")
            .field(
                FieldSpec::optional("scale", ty("MatrixScale"), Presence::LeadingBit)
                    .flatten()
                    .default_value(Value::record([
                        ("scaleX", Value::fixed16(1.0)),
                        ("scaleY", Value::fixed16(1.0)),
                    ])),
            )
            .field(
                FieldSpec::optional("rotate", ty("MatrixRotate"), Presence::LeadingBit)
                    .flatten()
                    .default_value(Value::record([
                        ("rotateSkew0", Value::fixed16(0.0)),
                        ("rotateSkew1", Value::fixed16(0.0)),
                    ])),
            )
            .field(FieldSpec::new("translate", ty("MatrixTranslate")).flatten()),
    );
}

/// CXFORM and CXFORMWITHALPHA. Absent multiplier terms mean identity,
/// absent add terms zero.
fn declare_color_transform(b: &mut SchemaBuilder) {
    for (name, channels) in [
        ("ColorTransform", &["red", "green", "blue"][..]),
        ("ColorTransformWithAlpha", &["red", "green", "blue", "alpha"][..]),
    ] {
        let mult = Presence::header_bit("flags", 0);
        let add = Presence::header_bit("flags", 1);
        let group = channels.iter().fold(
            BitGroupSpec::new(format!("{name}Terms"), 4),
            |group, channel| {
                group.member_with(format!("{channel}Mult"), BitMemberKind::Fixed8, mult.clone())
            },
        );
        let group = channels.iter().fold(group, |group, channel| {
            group.member_with(format!("{channel}Add"), BitMemberKind::Signed, add.clone())
        });
        b.bit_group(group);
        b.record(
            RecordSpec::new(name)
                .field(FieldSpec::presence_header("flags", 2))
                .field(FieldSpec::new("terms", ty(&format!("{name}Terms"))).flatten()),
        );
    }
}
