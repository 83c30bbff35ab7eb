//! Bitmap definitions. Image payloads (JPEG, zlib) stay opaque.

use swf_codec_core::schema::{prim, EnumSpec, FieldSpec, IntKind, Presence, Primitive, SizeSpec};
use swf_codec_core::{FixedKind, SchemaBuilder, Value};

use crate::decl::{rest, tag, ty};

pub(crate) fn declare(b: &mut SchemaBuilder) {
    // JPEG data whose tables live in the shared DefineJpegTables tag
    b.record(
        tag("DefineBits")
            .required("id", prim::u16())
            .required("data", rest()),
    );
    b.record(tag("DefineJpegTables").required("data", rest()));
    b.record(
        tag("DefineBitsJpeg2")
            .required("id", prim::u16())
            .required("imageData", rest()),
    );
    b.record(
        tag("DefineBitsJpeg3")
            .required("id", prim::u16())
            .field(FieldSpec::size(
                "alphaDataOffset",
                SizeSpec::new(IntKind::U32).until("alphaData"),
            ))
            .required("imageData", rest())
            .required("alphaData", rest()),
    );
    // the deblocking filter sits between the offset and the data it measures
    b.record(
        tag("DefineBitsJpeg4")
            .required("id", prim::u16())
            .field(FieldSpec::size(
                "alphaDataOffset",
                SizeSpec::new(IntKind::U32)
                    .from("imageData")
                    .until("alphaData"),
            ))
            .required("deblock", prim::fixed(FixedKind::Ufixed8P8))
            .required("imageData", rest())
            .required("alphaData", rest()),
    );

    b.enumeration(
        EnumSpec::new("BitmapFormat", Primitive::Int(IntKind::U8))
            .variant("ColorMap8", 3)
            .variant("Rgb15", 4)
            .variant("Rgb24", 5),
    );
    for name in ["DefineBitsLossless", "DefineBitsLossless2"] {
        b.record(
            tag(name)
                .required("id", prim::u16())
                .required("format", ty("BitmapFormat"))
                .required("width", prim::u16())
                .required("height", prim::u16())
                .field(FieldSpec::optional(
                    "colorTableSize",
                    prim::u8(),
                    Presence::when_equals("format", Value::enumeration("ColorMap8")),
                ))
                .required("data", rest()),
        );
    }
}
