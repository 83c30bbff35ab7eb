//! Tags: a closed variant over the tag code, framed by the SWF record header.
//!
//! Tag bodies are declared next to the types they use; this module holds the
//! tag table, control tags and the shape definitions.

use swf_codec_core::schema::{
    prim, BytesMode, EnumSpec, FieldSpec, Framing, IntKind, LengthPrefix, Presence, Primitive,
    RecordSpec, TypeCodec, VariantSpec,
};
use swf_codec_core::{SchemaBuilder, Value};

use crate::decl::{counted, reserved_bits, rest, tag, terminated, ty};
use crate::shapes;

const TAGS: [(&str, i64); 51] = [
    ("ShowFrame", 1),
    ("DefineShape", 2),
    ("PlaceObject", 4),
    ("RemoveObject", 5),
    ("DefineBits", 6),
    ("DefineButton", 7),
    ("DefineJpegTables", 8),
    ("SetBackgroundColor", 9),
    ("DefineFont", 10),
    ("DefineText", 11),
    ("DoAction", 12),
    ("DefineFontInfo", 13),
    ("DefineSound", 14),
    ("SoundStreamHead", 18),
    ("SoundStreamBlock", 19),
    ("DefineBitsLossless", 20),
    ("DefineBitsJpeg2", 21),
    ("DefineShape2", 22),
    ("PlaceObject2", 26),
    ("RemoveObject2", 28),
    ("DefineShape3", 32),
    ("DefineText2", 33),
    ("DefineButton2", 34),
    ("DefineBitsJpeg3", 35),
    ("DefineBitsLossless2", 36),
    ("DefineEditText", 37),
    ("DefineSprite", 39),
    ("FrameLabel", 43),
    ("SoundStreamHead2", 45),
    ("DefineMorphShape", 46),
    ("DefineFont2", 48),
    ("ExportAssets", 56),
    ("ImportAssets", 57),
    ("EnableDebugger", 58),
    ("DoInitAction", 59),
    ("DefineFontInfo2", 62),
    ("EnableDebugger2", 64),
    ("FileAttributes", 69),
    ("PlaceObject3", 70),
    ("DefineFontAlignZones", 73),
    ("CsmTextSettings", 74),
    ("DefineFont3", 75),
    ("Metadata", 77),
    ("DefineShape4", 83),
    ("DefineMorphShape2", 84),
    ("DefineSceneAndFrameLabelData", 86),
    ("DefineBinaryData", 87),
    ("DefineFontName", 88),
    ("DefineBitsJpeg4", 90),
    ("DefineFont4", 91),
    ("Telemetry", 93),
];

fn zero(name: &str, codec: TypeCodec) -> FieldSpec {
    FieldSpec::reserved(name, codec, Value::Int(0))
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    b.enumeration(TAGS.iter().fold(
        EnumSpec::new(
            "TagType",
            Primitive::Bits {
                width: 10,
                signed: false,
            },
        ),
        |spec, (label, code)| spec.variant(*label, *code),
    ));
    b.variant(
        TAGS.iter()
            .fold(VariantSpec::new("Tag", "type", ty("TagType")), |spec, (label, _)| {
                spec.enum_case(label)
            })
            .framing(Framing::SwfTagHeader),
    );
    // tags until the End tag (an all-zero header)
    b.register("TagStream", terminated("Tag", 16, true));

    declare_control(b);
    declare_shapes(b);

    b.record(
        tag("DefineSprite")
            .required("id", prim::u16())
            .required("frameCount", prim::u16())
            .required("tags", ty("TagStream")),
    );
    b.record(
        tag("DefineBinaryData")
            .required("id", prim::u16())
            .field(zero("reserved", prim::u32()))
            .required("data", rest()),
    );

    // Actions stay opaque
    b.record(tag("DoAction").required("actions", rest()));
    b.record(
        tag("DoInitAction")
            .required("spriteId", prim::u16())
            .required("actions", rest()),
    );
}

fn declare_control(b: &mut SchemaBuilder) {
    b.record(tag("ShowFrame"));
    b.record(tag("SetBackgroundColor").required("color", ty("SRgb8")));
    b.record(
        tag("FrameLabel")
            .required("name", prim::cstring())
            .field(
                FieldSpec::optional("isAnchor", prim::bool_byte(), Presence::Remaining)
                    .default_value(Value::Bool(false)),
            ),
    );
    b.record(
        tag("ExportAssets").required("assets", counted("NamedId", LengthPrefix::Int(IntKind::U16))),
    );
    b.record(
        tag("ImportAssets")
            .required("url", prim::cstring())
            .required("assets", counted("NamedId", LengthPrefix::Int(IntKind::U16))),
    );
    b.record(tag("EnableDebugger").required("password", prim::cstring()));
    b.record(
        tag("EnableDebugger2")
            .field(zero("reserved", prim::u16()))
            .required("password", prim::cstring()),
    );
    b.record(
        tag("FileAttributes")
            .field(reserved_bits("reserved", 1))
            .required("useDirectBlit", prim::bit())
            .required("useGpu", prim::bit())
            .required("hasMetadata", prim::bit())
            .required("useAs3", prim::bit())
            .required("noCrossDomainCaching", prim::bit())
            .required("useRelativeUrls", prim::bit())
            .required("useNetwork", prim::bit())
            .field(reserved_bits("reserved2", 24)),
    );
    b.record(tag("Metadata").required("metadata", prim::cstring()));
    b.record(
        RecordSpec::new("Scene")
            .required("offset", prim::encoded_u32())
            .required("name", prim::cstring()),
    );
    b.record(
        RecordSpec::new("Label")
            .required("frame", prim::encoded_u32())
            .required("name", prim::cstring()),
    );
    b.record(
        tag("DefineSceneAndFrameLabelData")
            .required("scenes", counted("Scene", LengthPrefix::EncodedU32))
            .required("labels", counted("Label", LengthPrefix::EncodedU32)),
    );
    b.record(
        tag("Telemetry")
            .field(zero("reserved", prim::u16()))
            .field(FieldSpec::optional(
                "password",
                prim::bytes(BytesMode::Fixed(32)),
                Presence::Remaining,
            )),
    );
}

fn declare_shapes(b: &mut SchemaBuilder) {
    for (name, shape) in [
        ("DefineShape", "Shape1"),
        ("DefineShape2", "Shape2"),
        ("DefineShape3", "Shape"),
    ] {
        b.record(
            tag(name)
                .required("id", prim::u16())
                .required("bounds", ty("Rect"))
                .required("shape", ty(shape)),
        );
    }
    b.record(
        tag("DefineShape4")
            .required("id", prim::u16())
            .required("bounds", ty("Rect"))
            .required("edgeBounds", ty("Rect"))
            .field(reserved_bits("reserved", 5))
            .required("usesFillWindingRule", prim::bit())
            .required("usesNonScalingStrokes", prim::bit())
            .required("usesScalingStrokes", prim::bit())
            .required("shape", ty("Shape4")),
    );

    b.record(shapes::morph_body(
        tag("DefineMorphShape")
            .required("id", prim::u16())
            .required("bounds", ty("Rect"))
            .required("morphBounds", ty("Rect")),
        "MorphLineStyle",
    ));
    b.record(shapes::morph_body(
        tag("DefineMorphShape2")
            .required("id", prim::u16())
            .required("bounds", ty("Rect"))
            .required("morphBounds", ty("Rect"))
            .required("edgeBounds", ty("Rect"))
            .required("morphEdgeBounds", ty("Rect"))
            .field(reserved_bits("reserved", 6))
            .required("usesNonScalingStrokes", prim::bit())
            .required("usesScalingStrokes", prim::bit()),
        "MorphLineStyle2",
    ));
}
