//! Font definitions and the tags that annotate them.
//!
//! DefineFont2 and DefineFont3 tables are sized by the glyph count and by two
//! width flags: `wideOffsets` picks 16 or 32-bit glyph offsets, `wideCodes`
//! 8 or 16-bit code units. Both flags are published as slots so the tables
//! after them can read the widths.

use swf_codec_core::schema::{
    prim, Derivation, EnumSpec, FieldSpec, IntKind, LengthPrefix, OffsetTable, Primitive,
    RecordSpec, StringMode, SwitchSpec, Termination, TypeCodec,
};
use swf_codec_core::{SchemaBuilder, Value};

use crate::decl::{counted, reserved_bits, rest, tag, ty, when};

/// Font name preceded by its byte length.
fn short_name() -> TypeCodec {
    TypeCodec::Primitive(Primitive::Str(StringMode::LengthPrefixed(LengthPrefix::Int(
        IntKind::U8,
    ))))
}

/// Code unit or kerning code, 16 bits wide while `wideCodes` is set.
fn code_unit() -> TypeCodec {
    TypeCodec::Switch(
        SwitchSpec::new("wideCodes")
            .case(0, prim::u8())
            .case(1, prim::u16()),
    )
}

fn per_glyph(item: TypeCodec) -> TypeCodec {
    TypeCodec::array_of(item, Termination::slot("glyphCount"))
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    // glyph count is the first offset over two
    b.record(
        tag("DefineFont")
            .required("id", prim::u16())
            .required(
                "glyphs",
                TypeCodec::array_of(
                    ty("Glyph"),
                    Termination::OffsetTable(OffsetTable {
                        count: None,
                        wide: None,
                        end_offset: false,
                    }),
                ),
            ),
    );

    b.record(
        RecordSpec::new("KerningRecord")
            .required("left", code_unit())
            .required("right", code_unit())
            .required("adjustment", prim::i16()),
    );
    b.record(
        RecordSpec::new("FontLayout")
            .required("ascent", prim::u16())
            .required("descent", prim::u16())
            .required("leading", prim::i16())
            .required("advances", per_glyph(prim::i16()))
            .required("bounds", per_glyph(ty("Rect")))
            .required("kerning", counted("KerningRecord", LengthPrefix::Int(IntKind::U16))),
    );
    b.record(outline_font(
        tag("DefineFont2"),
        FieldSpec::new("wideCodes", prim::bit()).publish("wideCodes"),
    ));
    // code units are always 16 bits wide here
    b.record(outline_font(
        tag("DefineFont3"),
        FieldSpec::reserved("wideCodes", prim::bit(), Value::Bool(true)).publish("wideCodes"),
    ));

    b.record(font_info(tag("DefineFontInfo")).required("codeUnits", code_units()));
    b.record(
        font_info(tag("DefineFontInfo2"))
            .required("language", ty("LanguageCode"))
            .required("codeUnits", code_units()),
    );

    declare_align_zones(b);
    b.record(
        tag("DefineFontName")
            .required("fontId", prim::u16())
            .required("name", prim::cstring())
            .required("copyright", prim::cstring()),
    );
    // CFF font data, embedded as is
    b.record(
        tag("DefineFont4")
            .required("id", prim::u16())
            .field(reserved_bits("reserved", 5))
            .field(FieldSpec::presence_header("flags", 1))
            .required("isItalic", prim::bit())
            .required("isBold", prim::bit())
            .required("fontName", prim::cstring())
            .field(when("flags", 0, "data", rest())),
    );
}

/// DefineFont2 and DefineFont3, which differ in the code unit flag only.
fn outline_font(rec: RecordSpec, wide_codes: FieldSpec) -> RecordSpec {
    rec.required("id", prim::u16())
        .field(FieldSpec::presence_header("flags", 1))
        .required("shiftJis", prim::bit())
        .required("isSmall", prim::bit())
        .required("isAnsi", prim::bit())
        .field(FieldSpec::new("wideOffsets", prim::bit()).publish("wideOffsets"))
        .field(wide_codes)
        .required("isItalic", prim::bit())
        .required("isBold", prim::bit())
        .required("language", ty("LanguageCode"))
        .required("fontName", short_name())
        .field(FieldSpec::derived(
            "glyphCount",
            prim::u16(),
            "glyphCount",
            Derivation::CountOf("glyphs".into()),
        ))
        // the end offset locates the code table
        .required(
            "glyphs",
            TypeCodec::array_of(
                ty("Glyph"),
                Termination::OffsetTable(OffsetTable {
                    count: Some("glyphCount".into()),
                    wide: Some("wideOffsets".into()),
                    end_offset: true,
                }),
            ),
        )
        .required("codeUnits", per_glyph(code_unit()))
        .field(when("flags", 0, "layout", ty("FontLayout")))
}

fn font_info(rec: RecordSpec) -> RecordSpec {
    rec.required("fontId", prim::u16())
        .required("fontName", short_name())
        .field(reserved_bits("reserved", 2))
        .required("isSmall", prim::bit())
        .required("isShiftJis", prim::bit())
        .required("isAnsi", prim::bit())
        .required("isItalic", prim::bit())
        .required("isBold", prim::bit())
        .field(FieldSpec::new("wideCodes", prim::bit()).publish("wideCodes"))
}

fn code_units() -> TypeCodec {
    TypeCodec::array_of(code_unit(), Termination::Remaining)
}

fn declare_align_zones(b: &mut SchemaBuilder) {
    b.enumeration(
        EnumSpec::new(
            "CsmTableHint",
            Primitive::Bits {
                width: 2,
                signed: false,
            },
        )
        .variant("Thin", 0)
        .variant("Medium", 1)
        .variant("Thick", 2),
    );
    b.record(
        RecordSpec::new("ZoneData")
            .required("origin", prim::f16())
            .required("size", prim::f16()),
    );
    b.record(
        RecordSpec::new("FontAlignmentZone")
            .required("data", counted("ZoneData", LengthPrefix::Int(IntKind::U8)))
            .field(reserved_bits("reserved", 6))
            .required("hasY", prim::bit())
            .required("hasX", prim::bit()),
    );
    b.record(
        tag("DefineFontAlignZones")
            .required("fontId", prim::u16())
            .required("csmTableHint", ty("CsmTableHint"))
            .field(reserved_bits("reserved", 6))
            .required(
                "zones",
                TypeCodec::array_of(ty("FontAlignmentZone"), Termination::Remaining),
            ),
    );
}
