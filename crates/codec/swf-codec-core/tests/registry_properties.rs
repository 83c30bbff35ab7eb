use serde_json::json;
use swf_codec_core::schema::{
    prim, ArraySpec, BytesMode, EnumSpec, FieldSpec, IntKind, LengthPrefix, Presence, Primitive,
    RecordSpec, Termination, TypeCodec, VariantSpec,
};
use swf_codec_core::{ErrorKind, FixedKind, FixedPoint, SchemaRegistry, Value};

const U8_PREFIX: Termination = Termination::LengthPrefix(LengthPrefix::Int(IntKind::U8));

/// `Folder` holds `Entry` items and every `Entry` owns a `Folder`.
fn folders() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.record(
        RecordSpec::new("Entry")
            .required("label", prim::u8())
            .required("folder", prim::reference("Folder")),
    );
    b.record(RecordSpec::new("Folder").required(
        "entries",
        TypeCodec::array_of(prim::reference("Entry"), U8_PREFIX),
    ));
    b.build().unwrap()
}

fn entry(label: i64, children: Vec<Value>) -> Value {
    Value::record([
        ("label", Value::Int(label)),
        (
            "folder",
            Value::record([("entries", Value::Array(children))]),
        ),
    ])
}

fn shapes() -> SchemaRegistry {
    let mut b = SchemaRegistry::builder();
    b.variant(
        VariantSpec::new("Shape", "kind", prim::u8())
            .case(Value::Int(1), "Circle")
            .case(Value::Int(2), "Square"),
    );
    b.record(
        RecordSpec::new("Circle")
            .field(FieldSpec::literal("kind", prim::u8(), Value::Int(1)))
            .required("radius", prim::u16()),
    );
    b.record(
        RecordSpec::new("Square")
            .field(FieldSpec::literal("kind", prim::u8(), Value::Int(2)))
            .required("side", prim::u16()),
    );
    b.record(RecordSpec::new("Palette").required(
        "colors",
        TypeCodec::array(ArraySpec::new(prim::u8(), U8_PREFIX).max_len(3)),
    ));
    b.record(RecordSpec::new("Scale").required("x", prim::fixed(FixedKind::Sfixed16P16)));
    b.build().unwrap()
}

#[test]
fn mutually_recursive_types_decode_three_levels() {
    let reg = folders();
    let value = entry(1, vec![entry(2, vec![entry(3, vec![])])]);
    let bytes = [1, 1, 2, 1, 3, 0];
    assert_eq!(reg.decode(&bytes, "Entry").unwrap(), value);
    assert_eq!(reg.encode(&value, "Entry").unwrap(), bytes);

    let doc = reg.encode_json(&value, "Entry").unwrap();
    assert_eq!(doc["folder"]["entries"][0]["folder"]["entries"][0]["label"], json!(3));
    assert_eq!(reg.decode_json(&doc, "Entry").unwrap(), value);
}

#[test]
fn truncated_recursion_reports_the_innermost_field() {
    let reg = folders();
    let err = reg.decode(&[1, 1, 2, 1, 3], "Entry").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnexpectedEof { .. }));
    assert_eq!(
        err.path().to_string(),
        "Entry.folder/Folder.entries[0]/Entry.folder/Folder.entries[0]/Entry.folder/Folder.entries"
    );
}

#[test]
fn max_length_is_inclusive() {
    let reg = shapes();
    let palette = |n: i64| {
        Value::record([(
            "colors",
            Value::Array((0..n).map(Value::Int).collect()),
        )])
    };
    assert_eq!(reg.encode(&palette(3), "Palette").unwrap(), vec![3, 0, 1, 2]);

    let over = ErrorKind::LengthExceeded {
        len: 4,
        min: 0,
        max: Some(3),
    };
    assert_eq!(reg.encode(&palette(4), "Palette").unwrap_err().kind(), &over);
    assert_eq!(
        reg.decode(&[4, 0, 1, 2, 3], "Palette").unwrap_err().kind(),
        &over
    );
    let doc = json!({"colors": [0, 1, 2, 3]});
    assert_eq!(reg.decode_json(&doc, "Palette").unwrap_err().kind(), &over);
}

#[test]
fn discriminant_selects_its_case() {
    let reg = shapes();
    let square = reg.decode(&[2, 0x10, 0x00], "Shape").unwrap();
    assert_eq!(
        square,
        Value::record([("kind", Value::Int(2)), ("side", Value::Int(16))])
    );
    assert_eq!(reg.encode(&square, "Shape").unwrap(), vec![2, 0x10, 0x00]);

    let err = reg.decode(&[3, 0, 0], "Shape").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownVariant { .. }));
    assert_eq!(err.kind().category(), "variant");

    let stray = Value::record([("kind", Value::Int(7)), ("side", Value::Int(1))]);
    let err = reg.encode(&stray, "Shape").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownVariant { .. }));
}

#[test]
fn sixteen_dot_sixteen_one() {
    let reg = shapes();
    let one = Value::Fixed(FixedPoint::from_raw(65536, 16));
    let value = reg.decode(&[0x00, 0x00, 0x01, 0x00], "Scale").unwrap();
    assert_eq!(value.get("x"), Some(&one));
    assert_eq!(reg.encode_json(&value, "Scale").unwrap(), json!({"x": 1.0}));
    assert_eq!(
        reg.decode_json(&json!({"x": 1.0}), "Scale").unwrap(),
        Value::record([("x", Value::fixed16(1.0))])
    );
}

#[test]
fn absent_optional_is_not_written() {
    let mut b = SchemaRegistry::builder();
    b.enumeration(
        EnumSpec::new("Kind", Primitive::Int(IntKind::U8))
            .variant("X", 0)
            .variant("Y", 1),
    );
    b.variant(
        VariantSpec::new("Node", "type", prim::reference("Kind"))
            .enum_case("X")
            .enum_case("Y"),
    );
    b.record(
        RecordSpec::new("X")
            .field(FieldSpec::literal(
                "type",
                prim::reference("Kind"),
                Value::enumeration("X"),
            ))
            .field(FieldSpec::optional("name", prim::cstring(), Presence::Remaining)),
    );
    b.record(
        RecordSpec::new("Y")
            .field(FieldSpec::literal(
                "type",
                prim::reference("Kind"),
                Value::enumeration("Y"),
            ))
            .required("data", prim::bytes(BytesMode::Remaining)),
    );
    let reg = b.build().unwrap();

    let value = reg.decode_json(&json!({"type": "x"}), "Node").unwrap();
    assert_eq!(value.get("name"), None);
    assert_eq!(reg.encode(&value, "Node").unwrap(), vec![0]);
    assert_eq!(reg.encode_json(&value, "Node").unwrap(), json!({"type": "x"}));

    let named = reg.decode(&[0, b'a', 0], "Node").unwrap();
    assert_eq!(named.get("name"), Some(&Value::Str("a".into())));
}

mod round_trips {
    use super::*;
    use proptest::prelude::*;

    fn sample_registry() -> SchemaRegistry {
        let mut b = SchemaRegistry::builder();
        b.record(
            RecordSpec::new("Sample")
                .required("flag", prim::bit())
                .required("small", prim::sbits(7))
                .required("id", prim::u16())
                .required("count", prim::encoded_u32())
                .required("name", prim::cstring())
                .required(
                    "data",
                    prim::bytes(BytesMode::LengthPrefixed(LengthPrefix::Int(IntKind::U8))),
                )
                .field(FieldSpec::optional(
                    "ratio",
                    prim::fixed(FixedKind::Sfixed8P8),
                    Presence::LeadingBit,
                )),
        );
        b.build().unwrap()
    }

    fn sample() -> impl Strategy<Value = Value> {
        (
            any::<bool>(),
            -64i64..64,
            any::<u16>(),
            any::<u32>(),
            "[a-zA-Z0-9 ]{0,12}",
            prop::collection::vec(any::<u8>(), 0..32),
            prop::option::of(any::<i16>()),
        )
            .prop_map(|(flag, small, id, count, name, data, ratio)| {
                let mut fields = vec![
                    ("flag", Value::Bool(flag)),
                    ("small", Value::Int(small)),
                    ("id", Value::Int(i64::from(id))),
                    ("count", Value::Int(i64::from(count))),
                    ("name", Value::Str(name)),
                    ("data", Value::Bytes(data)),
                ];
                if let Some(raw) = ratio {
                    fields.push(("ratio", Value::Fixed(FixedPoint::from_raw(i64::from(raw), 8))));
                }
                Value::record(fields)
            })
    }

    proptest! {
        #[test]
        fn binary_round_trips(value in sample()) {
            let reg = sample_registry();
            let bytes = reg.encode(&value, "Sample").unwrap();
            let decoded = reg.decode(&bytes, "Sample").unwrap();
            prop_assert_eq!(&decoded, &value);
            prop_assert_eq!(reg.encode(&decoded, "Sample").unwrap(), bytes);
        }

        #[test]
        fn json_round_trips(value in sample()) {
            let reg = sample_registry();
            let doc = reg.encode_json(&value, "Sample").unwrap();
            prop_assert_eq!(reg.decode_json(&doc, "Sample").unwrap(), value);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..24)) {
            let reg = sample_registry();
            if let Ok(value) = reg.decode(&bytes, "Sample") {
                prop_assert_eq!(reg.encode(&value, "Sample").unwrap(), bytes);
            }
        }
    }
}
