//! Fields whose wire form depends on other fields: byte sizes, published
//! widths and counts, offset tables.

use serde_json::json;
use swf_codec_core::schema::{
    prim, BitGroupSpec, BitMemberKind, BytesMode, Derivation, EnumSpec, FieldSpec, IntKind,
    LengthPrefix, OffsetTable, Presence, Primitive, RecordSpec, SizeSpec, SwitchSpec, Termination,
    TypeCodec, ZeroSize,
};
use swf_codec_core::{CodecConfig, ErrorKind, SchemaError, SchemaRegistry, Value};

const U8_PREFIX: Termination = Termination::LengthPrefix(LengthPrefix::Int(IntKind::U8));

fn ints(values: &[i64]) -> Value {
    Value::Array(values.iter().copied().map(Value::Int).collect())
}

fn is_non_canonical(kind: &ErrorKind) -> bool {
    matches!(kind, ErrorKind::NonCanonical { .. })
}

/// Button-style condition actions: each item leads with the offset to the
/// next one, and the last item writes zero.
fn actions() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Action")
            .field(FieldSpec::size(
                "size",
                SizeSpec::new(IntKind::U16)
                    .including_self()
                    .zero_when(ZeroSize::LastItem),
            ))
            .required("code", prim::u8())
            .required("body", prim::bytes(BytesMode::Remaining)),
    );
    b.record(RecordSpec::new("Actions").required(
        "items",
        TypeCodec::array_of(prim::reference("Action"), Termination::Remaining),
    ));
    b.build().unwrap()
}

fn action(code: i64, body: &[u8]) -> Value {
    Value::record([("code", Value::Int(code)), ("body", Value::Bytes(body.to_vec()))])
}

#[test]
fn last_item_size_is_zero() {
    let reg = actions();
    let value = Value::record([(
        "items",
        Value::Array(vec![action(1, &[0xaa]), action(2, &[0xbb, 0xcc])]),
    )]);
    let bytes = [4, 0, 1, 0xaa, 0, 0, 2, 0xbb, 0xcc];
    assert_eq!(reg.encode(&value, "Actions").unwrap(), bytes);
    assert_eq!(reg.decode(&bytes, "Actions").unwrap(), value);

    let sized_last = [4, 0, 1, 0xaa, 5, 0, 2, 0xbb, 0xcc];
    let err = reg.decode(&sized_last, "Actions").unwrap_err();
    assert!(is_non_canonical(err.kind()), "{err}");
    assert_eq!(err.path().to_string(), "Actions.items[1]/Action.size");
    let lenient = reg.binary_with(CodecConfig::lenient());
    assert_eq!(lenient.decode(&sized_last, "Actions").unwrap(), value);
}

#[test]
fn sizes_bound_what_they_measure() {
    let reg = actions();
    // the first item measures only its code, so its body bytes read as the
    // next item's size
    let err = reg.decode(&[3, 0, 1, 0xaa, 0, 0, 2], "Actions").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnexpectedEof { .. }));
    assert_eq!(err.path().to_string(), "Actions.items[1]/Action.size");
    let err = reg.decode(&[1, 0, 1], "Actions").unwrap_err();
    assert_eq!(err.kind().category(), "wire");
}

fn button() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Button")
            .required("id", prim::u8())
            .field(FieldSpec::size(
                "actionOffset",
                SizeSpec::new(IntKind::U16)
                    .including_self()
                    .until("actions")
                    .zero_when(ZeroSize::WhenEmpty("actions".into())),
            ))
            .required(
                "characters",
                TypeCodec::array_of(
                    prim::u8(),
                    Termination::Terminator {
                        width: 8,
                        value: 0,
                        aligned: true,
                    },
                ),
            )
            .required("actions", prim::bytes(BytesMode::Remaining)),
    );
    b.build().unwrap()
}

#[test]
fn offset_is_zero_without_actions() {
    let reg = button();
    let with = Value::record([
        ("id", Value::Int(7)),
        ("characters", ints(&[5])),
        ("actions", Value::Bytes(vec![9])),
    ]);
    assert_eq!(reg.encode(&with, "Button").unwrap(), [7, 4, 0, 5, 0, 9]);
    assert_eq!(reg.decode(&[7, 4, 0, 5, 0, 9], "Button").unwrap(), with);

    let without = Value::record([
        ("id", Value::Int(7)),
        ("characters", ints(&[5])),
        ("actions", Value::Bytes(vec![])),
    ]);
    assert_eq!(reg.encode(&without, "Button").unwrap(), [7, 0, 0, 5, 0]);
    assert_eq!(reg.decode(&[7, 0, 0, 5, 0], "Button").unwrap(), without);

    let err = reg.decode(&[7, 4, 0, 5, 0], "Button").unwrap_err();
    assert!(is_non_canonical(err.kind()), "{err}");
    let err = reg.decode(&[7, 0, 0, 5, 0, 9], "Button").unwrap_err();
    assert!(is_non_canonical(err.kind()), "{err}");
}

/// Palette indices as wide as the palette count needs.
fn picker() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Picker")
            .required("colors", TypeCodec::array_of(prim::u8(), U8_PREFIX))
            .field(FieldSpec::derived(
                "indexBits",
                prim::ubits(4),
                "indexBits",
                Derivation::CountWidth("colors".into()),
            ))
            .required(
                "picks",
                TypeCodec::array_of(prim::slot_bits("indexBits", false), Termination::Count(2)),
            ),
    );
    b.build().unwrap()
}

#[test]
fn index_width_follows_the_palette() {
    let reg = picker();
    let value = Value::record([("colors", ints(&[10, 20, 30])), ("picks", ints(&[2, 1]))]);
    let bytes = [3, 10, 20, 30, 0b0010_1001];
    assert_eq!(reg.encode(&value, "Picker").unwrap(), bytes);
    assert_eq!(reg.decode(&bytes, "Picker").unwrap(), value);

    let too_wide = Value::record([("colors", ints(&[10, 20, 30])), ("picks", ints(&[4, 1]))]);
    let err = reg.encode(&too_wide, "Picker").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Range { .. }));
    assert_eq!(err.path().to_string(), "Picker.picks[0]");

    let padded = [3, 10, 20, 30, 0b0011_0100, 0b0100_0000];
    assert!(is_non_canonical(reg.decode(&padded, "Picker").unwrap_err().kind()));
    let lenient = reg.binary_with(CodecConfig::lenient());
    assert_eq!(lenient.decode(&padded, "Picker").unwrap(), value);

    let doc = reg.encode_json(&value, "Picker").unwrap();
    assert_eq!(doc, json!({"colors": [10, 20, 30], "picks": [2, 1]}));
    assert_eq!(reg.decode_json(&doc, "Picker").unwrap(), value);
}

#[test]
fn fitted_width_is_the_smallest_that_holds_every_value() {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Run")
            .field(FieldSpec::derived(
                "glyphBits",
                prim::u8(),
                "glyphBits",
                Derivation::Fit { min: 0 },
            ))
            .required(
                "glyphs",
                TypeCodec::array_of(prim::slot_bits("glyphBits", false), U8_PREFIX),
            ),
    );
    let reg = b.build().unwrap();
    let value = Value::record([("glyphs", ints(&[5, 1]))]);
    assert_eq!(reg.encode(&value, "Run").unwrap(), [3, 2, 0b1010_0100]);
    assert_eq!(reg.decode(&[3, 2, 0b1010_0100], "Run").unwrap(), value);

    let wide = [4, 2, 0b0101_0001];
    assert!(is_non_canonical(reg.decode(&wide, "Run").unwrap_err().kind()));
    assert_eq!(
        reg.binary_with(CodecConfig::lenient()).decode(&wide, "Run").unwrap(),
        value
    );

    let empty = Value::record([("glyphs", ints(&[]))]);
    assert_eq!(reg.encode(&empty, "Run").unwrap(), [0, 0]);
}

fn font() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Font")
            .field(FieldSpec::new("wide", prim::bool_byte()).publish("wide"))
            .field(FieldSpec::derived(
                "count",
                prim::u16(),
                "count",
                Derivation::CountOf("glyphs".into()),
            ))
            .required(
                "glyphs",
                TypeCodec::array_of(
                    prim::cstring(),
                    Termination::OffsetTable(OffsetTable {
                        count: Some("count".into()),
                        wide: Some("wide".into()),
                        end_offset: true,
                    }),
                ),
            ),
    );
    b.build().unwrap()
}

fn glyphs(wide: bool) -> Value {
    Value::record([
        ("wide", Value::Bool(wide)),
        (
            "glyphs",
            Value::Array(vec![Value::Str("a".into()), Value::Str("bc".into())]),
        ),
    ])
}

#[test]
fn offsets_count_from_the_table_start() {
    let reg = font();
    let narrow = [0, 2, 0, 6, 0, 8, 0, 11, 0, b'a', 0, b'b', b'c', 0];
    assert_eq!(reg.encode(&glyphs(false), "Font").unwrap(), narrow);
    assert_eq!(reg.decode(&narrow, "Font").unwrap(), glyphs(false));

    let wide = reg.encode(&glyphs(true), "Font").unwrap();
    assert_eq!(&wide[..7], &[1, 2, 0, 12, 0, 0, 0]);
    assert_eq!(wide.len(), 3 + 12 + 5);
    assert_eq!(reg.decode(&wide, "Font").unwrap(), glyphs(true));
}

#[test]
fn offset_gaps_are_non_canonical() {
    let reg = font();
    let gap = [0, 1, 0, 5, 0, 7, 0, 0xee, b'a', 0];
    assert!(is_non_canonical(reg.decode(&gap, "Font").unwrap_err().kind()));
    let value = reg
        .binary_with(CodecConfig::lenient())
        .decode(&gap, "Font")
        .unwrap();
    assert_eq!(value.get("glyphs"), Some(&Value::Array(vec![Value::Str("a".into())])));

    let overlap = [0, 1, 0, 2, 0, 4, 0, b'a', 0];
    let err = reg.decode(&overlap, "Font").unwrap_err();
    assert_eq!(err.path().to_string(), "Font.glyphs[0]");
}

fn line() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.bit_group(
        BitGroupSpec::new("Line", 4)
            .biased(2)
            .members(&["dx", "dy"], BitMemberKind::Signed)
            .axis_pair(),
    );
    b.build().unwrap()
}

fn delta(dx: i64, dy: i64) -> Value {
    Value::record([("dx", Value::Int(dx)), ("dy", Value::Int(dy))])
}

#[test]
fn axis_lines_write_one_delta() {
    let reg = line();
    assert_eq!(reg.encode(&delta(0, -3), "Line").unwrap(), [0x16, 0x80]);
    assert_eq!(reg.decode(&[0x16, 0x80], "Line").unwrap(), delta(0, -3));
    assert_eq!(reg.encode(&delta(1, 0), "Line").unwrap(), [0x01]);
    assert_eq!(reg.decode(&[0x01], "Line").unwrap(), delta(1, 0));
    assert_eq!(reg.encode(&delta(5, -1), "Line").unwrap(), [0x2a, 0xf8]);
    assert_eq!(reg.decode(&[0x2a, 0xf8], "Line").unwrap(), delta(5, -1));
}

#[test]
fn general_line_with_a_zero_delta_is_non_canonical() {
    let reg = line();
    let general = [0x0a, 0x00];
    assert!(is_non_canonical(reg.decode(&general, "Line").unwrap_err().kind()));
    let lenient = reg.binary_with(CodecConfig::lenient());
    assert_eq!(lenient.decode(&general, "Line").unwrap(), delta(1, 0));
}

#[test]
fn axis_pairs_need_two_signed_members() {
    let mut b = SchemaRegistry::builder();
    b.bit_group(
        BitGroupSpec::new("Line", 4)
            .members(&["dx"], BitMemberKind::Signed)
            .axis_pair(),
    );
    assert!(matches!(b.build().unwrap_err(), SchemaError::InvalidLayout { .. }));
}

fn opaque() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Rgb")
            .required("r", prim::u8())
            .required("g", prim::u8())
            .required("b", prim::u8())
            .field(FieldSpec::implied("a", prim::u8(), Value::Int(255))),
    );
    b.build().unwrap()
}

#[test]
fn implied_alpha_is_opaque() {
    let reg = opaque();
    let color = |a: i64| {
        Value::record([
            ("r", Value::Int(1)),
            ("g", Value::Int(2)),
            ("b", Value::Int(3)),
            ("a", Value::Int(a)),
        ])
    };
    assert_eq!(reg.decode(&[1, 2, 3], "Rgb").unwrap(), color(255));
    assert_eq!(reg.encode(&color(255), "Rgb").unwrap(), [1, 2, 3]);
    let err = reg.encode(&color(128), "Rgb").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));
    assert_eq!(err.path().to_string(), "Rgb.a");

    let doc = json!({"r": 1, "g": 2, "b": 3});
    assert_eq!(reg.decode_json(&doc, "Rgb").unwrap(), color(255));
    assert_eq!(
        reg.encode_json(&color(255), "Rgb").unwrap(),
        json!({"r": 1, "g": 2, "b": 3, "a": 255})
    );
    let err = reg
        .decode_json(&json!({"r": 1, "g": 2, "b": 3, "a": 0}), "Rgb")
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));
}

#[test]
fn presence_can_follow_an_enum_value() {
    let mut b = SchemaRegistry::builder();
    b.enumeration(
        EnumSpec::new("Format", Primitive::Int(IntKind::U8))
            .variant("Palette", 3)
            .variant("Rgb", 5),
    );
    b.record(
        RecordSpec::new("Bitmap")
            .required("format", prim::reference("Format"))
            .field(FieldSpec::optional(
                "tableSize",
                prim::u8(),
                Presence::when_equals("format", Value::enumeration("Palette")),
            ))
            .required("data", prim::bytes(BytesMode::Remaining)),
    );
    let reg = b.build().unwrap();
    let palette = Value::record([
        ("format", Value::enumeration("Palette")),
        ("tableSize", Value::Int(15)),
        ("data", Value::Bytes(vec![1])),
    ]);
    assert_eq!(reg.encode(&palette, "Bitmap").unwrap(), [3, 15, 1]);
    assert_eq!(reg.decode(&[3, 15, 1], "Bitmap").unwrap(), palette);
    let rgb = Value::record([
        ("format", Value::enumeration("Rgb")),
        ("data", Value::Bytes(vec![15, 1])),
    ]);
    assert_eq!(reg.decode(&[5, 15, 1], "Bitmap").unwrap(), rgb);

    let stray = Value::record([
        ("format", Value::enumeration("Rgb")),
        ("tableSize", Value::Int(15)),
        ("data", Value::Bytes(vec![])),
    ]);
    let err = reg.encode(&stray, "Bitmap").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));
}

#[test]
fn shared_presence_reads_any_header_bit() {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Text")
            .field(FieldSpec::presence_header("fontFlags", 2))
            .field(FieldSpec::optional(
                "fontId",
                prim::u16(),
                Presence::header_bit("fontFlags", 1),
            ))
            .field(FieldSpec::optional(
                "fontClass",
                prim::cstring(),
                Presence::header_bit("fontFlags", 0),
            ))
            .field(FieldSpec::optional(
                "fontSize",
                prim::u16(),
                Presence::HeaderAny {
                    header: "fontFlags".into(),
                    mask: 0b11,
                },
            )),
    );
    let reg = b.build().unwrap();
    let by_class = Value::record([
        ("fontClass", Value::Str("A".into())),
        ("fontSize", Value::Int(12)),
    ]);
    let bytes = [0b0100_0000, b'A', 0, 12, 0];
    assert_eq!(reg.encode(&by_class, "Text").unwrap(), bytes);
    assert_eq!(reg.decode(&bytes, "Text").unwrap(), by_class);

    let orphan = Value::record([("fontSize", Value::Int(12))]);
    let err = reg.encode(&orphan, "Text").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ValueMismatch { .. }));
    assert_eq!(reg.decode(&[0], "Text").unwrap(), Value::record::<&str, _>([]));
}

fn codes() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Codes")
            .field(FieldSpec::new("wide", prim::bit()).publish("wide"))
            .required(
                "codes",
                TypeCodec::array_of(
                    TypeCodec::Switch(
                        SwitchSpec::new("wide")
                            .case(0, prim::u8())
                            .case(1, prim::u16()),
                    ),
                    U8_PREFIX,
                ),
            ),
    );
    b.build().unwrap()
}

#[test]
fn a_flag_switches_the_code_width() {
    let reg = codes();
    let value = |wide: bool, codes: &[i64]| {
        Value::record([("wide", Value::Bool(wide)), ("codes", ints(codes))])
    };
    assert_eq!(reg.encode(&value(true, &[0x102]), "Codes").unwrap(), [0x80, 1, 2, 1]);
    assert_eq!(reg.decode(&[0x80, 1, 2, 1], "Codes").unwrap(), value(true, &[0x102]));
    assert_eq!(reg.encode(&value(false, &[7]), "Codes").unwrap(), [0x00, 1, 7]);
    let err = reg.encode(&value(false, &[0x102]), "Codes").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Range { .. }));

    let doc = reg.encode_json(&value(true, &[0x102]), "Codes").unwrap();
    assert_eq!(doc, json!({"wide": true, "codes": [258]}));
    assert_eq!(reg.decode_json(&doc, "Codes").unwrap(), value(true, &[0x102]));
}

#[test]
fn slots_must_be_set_somewhere() {
    let mut b = SchemaRegistry::builder();
    b.record(RecordSpec::new("Orphan").required("x", prim::slot_bits("nowhere", true)));
    match b.build().unwrap_err() {
        SchemaError::InvalidLayout { name, reason } => {
            assert_eq!(name, "Orphan");
            assert!(reason.contains("nowhere"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn counted_fields_must_name_arrays() {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("R")
            .field(FieldSpec::derived(
                "n",
                prim::u8(),
                "n",
                Derivation::CountWidth("later".into()),
            ))
            .required("later", TypeCodec::array_of(prim::u8(), U8_PREFIX)),
    );
    assert!(matches!(b.build().unwrap_err(), SchemaError::InvalidLayout { .. }));
}
