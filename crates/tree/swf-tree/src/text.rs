//! Static and editable text, and the text rendering settings tag.

use swf_codec_core::schema::{
    prim, Derivation, EnumSpec, FieldSpec, IntKind, LengthPrefix, Presence, Primitive, RecordSpec,
};
use swf_codec_core::{SchemaBuilder, Value};

use crate::decl::{counted, reserved_bits, tag, terminated, ty, when};

fn bits(width: u8) -> Primitive {
    Primitive::Bits {
        width,
        signed: false,
    }
}

/// Bit count shared by every glyph entry of the text, the smallest that
/// holds all of them.
fn entry_width(name: &str) -> FieldSpec {
    FieldSpec::derived(name, prim::u8(), name, Derivation::Fit { min: 0 })
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    b.enumeration(
        EnumSpec::new("TextRenderer", bits(2))
            .variant("Normal", 0)
            .variant("Advanced", 1),
    );
    b.enumeration(
        EnumSpec::new("GridFitting", bits(3))
            .variant("None", 0)
            .variant("Pixel", 1)
            .variant("SubPixel", 2),
    );
    b.enumeration(
        EnumSpec::new("TextAlignment", Primitive::Int(IntKind::U8))
            .variant("Left", 0)
            .variant("Right", 1)
            .variant("Center", 2)
            .variant("Justify", 3),
    );

    b.record(
        RecordSpec::new("GlyphEntry")
            .required("index", prim::slot_bits("glyphBits", false))
            .required("advance", prim::slot_bits("advanceBits", true))
            .unaligned(),
    );
    b.record(text_record("TextRecord1", "OpaqueSRgba8"));
    b.record(text_record("TextRecord", "StraightSRgba8"));

    b.record(static_text(tag("DefineText"), "TextRecord1"));
    b.record(static_text(tag("DefineText2"), "TextRecord"));
    declare_edit_text(b);

    b.record(
        tag("CsmTextSettings")
            .required("textId", prim::u16())
            .required("renderer", ty("TextRenderer"))
            .required("fitting", ty("GridFitting"))
            .field(reserved_bits("reserved", 3))
            .required("thickness", prim::f32())
            .required("sharpness", prim::f32())
            .field(FieldSpec::reserved("reserved2", prim::u8(), Value::Int(0))),
    );
}

// font id and height share the has-font bit
fn text_record(name: &str, color: &str) -> RecordSpec {
    RecordSpec::new(name)
        .field(FieldSpec::reserved("typeFlag", prim::ubits(1), Value::Int(1)))
        .field(reserved_bits("reserved", 3))
        .field(FieldSpec::presence_header("flags", 4))
        .field(when("flags", 3, "fontId", prim::u16()))
        .field(when("flags", 2, "color", ty(color)))
        .field(when("flags", 0, "offsetX", prim::i16()))
        .field(when("flags", 1, "offsetY", prim::i16()))
        .field(when("flags", 3, "fontSize", prim::u16()))
        .required("entries", counted("GlyphEntry", LengthPrefix::Int(IntKind::U8)))
}

fn static_text(rec: RecordSpec, record: &str) -> RecordSpec {
    rec.required("id", prim::u16())
        .required("bounds", ty("Rect"))
        .required("matrix", ty("Matrix"))
        .field(entry_width("glyphBits"))
        .field(entry_width("advanceBits"))
        .required("records", terminated(record, 8, true))
}

/// DefineEditText. Flag bits sit in file order; the font size is present
/// whenever either font flag is.
fn declare_edit_text(b: &mut SchemaBuilder) {
    let layout = |name: &str, codec| when("layoutFlag", 0, name, codec);
    b.record(
        tag("DefineEditText")
            .required("id", prim::u16())
            .required("bounds", ty("Rect"))
            .field(FieldSpec::presence_header("textFlag", 1))
            .required("wordWrap", prim::bit())
            .required("multiline", prim::bit())
            .required("password", prim::bit())
            .required("readonly", prim::bit())
            .field(FieldSpec::presence_header("flags", 2))
            .field(FieldSpec::presence_header("fontFlags", 2))
            .required("autoSize", prim::bit())
            .field(FieldSpec::presence_header("layoutFlag", 1))
            .required("noSelect", prim::bit())
            .required("border", prim::bit())
            .required("wasStatic", prim::bit())
            .required("html", prim::bit())
            .required("useGlyphFont", prim::bit())
            .field(when("fontFlags", 1, "fontId", prim::u16()))
            .field(when("fontFlags", 0, "fontClass", prim::cstring()))
            .field(FieldSpec::optional(
                "fontSize",
                prim::u16(),
                Presence::HeaderAny {
                    header: "fontFlags".into(),
                    mask: 0b11,
                },
            ))
            .field(when("flags", 1, "color", ty("StraightSRgba8")))
            .field(when("flags", 0, "maxLength", prim::u16()))
            .field(layout("align", ty("TextAlignment")))
            .field(layout("marginLeft", prim::u16()).default_value(Value::Int(0)))
            .field(layout("marginRight", prim::u16()).default_value(Value::Int(0)))
            .field(layout("indent", prim::u16()).default_value(Value::Int(0)))
            .field(layout("leading", prim::i16()).default_value(Value::Int(0)))
            .required("variableName", prim::cstring())
            .field(when("textFlag", 0, "text", prim::cstring())),
    );
}
