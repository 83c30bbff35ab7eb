use proptest::prelude::*;
use swf_codec_core::Value;
use swf_tree::{registry, TAG};

fn int(v: impl Into<i64>) -> Value {
    Value::Int(v.into())
}

fn rgb() -> impl Strategy<Value = Value> {
    (any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(r, g, b)| Value::record([("r", int(r)), ("g", int(g)), ("b", int(b))]))
}

fn fixed_pair() -> impl Strategy<Value = Option<(f64, f64)>> {
    prop::option::of((-100.0f64..100.0, -100.0f64..100.0))
}

fn matrix() -> impl Strategy<Value = Value> {
    (fixed_pair(), fixed_pair(), any::<i16>(), any::<i16>()).prop_map(
        |(scale, rotate, tx, ty)| {
            let (sx, sy) = scale.unwrap_or((1.0, 1.0));
            let (r0, r1) = rotate.unwrap_or((0.0, 0.0));
            Value::record([
                ("scaleX", Value::fixed16(sx)),
                ("scaleY", Value::fixed16(sy)),
                ("rotateSkew0", Value::fixed16(r0)),
                ("rotateSkew1", Value::fixed16(r1)),
                ("translateX", int(tx)),
                ("translateY", int(ty)),
            ])
        },
    )
}

fn place_object() -> impl Strategy<Value = Value> {
    (
        any::<bool>(),
        any::<u16>(),
        prop::option::of(any::<u16>()),
        prop::option::of(matrix()),
        prop::option::of("[a-z]{0,8}"),
        prop::option::of(any::<u16>()),
    )
        .prop_map(|(is_update, depth, character, matrix, name, ratio)| {
            let mut fields = vec![
                ("type", Value::enumeration("PlaceObject3")),
                ("isUpdate", Value::Bool(is_update)),
                ("hasImage", Value::Bool(false)),
                ("depth", int(depth)),
            ];
            if let Some(id) = character {
                fields.push(("characterId", int(id)));
            }
            if let Some(matrix) = matrix {
                fields.push(("matrix", matrix));
            }
            if let Some(ratio) = ratio {
                fields.push(("ratio", int(ratio)));
            }
            if let Some(name) = name {
                fields.push(("name", Value::Str(name)));
            }
            Value::record(fields)
        })
}

proptest! {
    #[test]
    fn background_color_round_trips(color in rgb()) {
        let value = Value::record([
            ("type", Value::enumeration("SetBackgroundColor")),
            ("color", color),
        ]);
        let bytes = registry().encode(&value, TAG).unwrap();
        prop_assert_eq!(bytes.len(), 5);
        prop_assert_eq!(registry().decode(&bytes, TAG).unwrap(), value);
    }

    #[test]
    fn place_object_round_trips(value in place_object()) {
        let bytes = registry().encode(&value, TAG).unwrap();
        let decoded = registry().decode(&bytes, TAG).unwrap();
        prop_assert_eq!(&decoded, &value);
        prop_assert_eq!(registry().encode(&decoded, TAG).unwrap(), bytes);

        let doc = registry().encode_json(&value, TAG).unwrap();
        prop_assert_eq!(registry().decode_json(&doc, TAG).unwrap(), value);
    }

    #[test]
    fn matrices_stay_canonical(value in matrix()) {
        let bytes = registry().encode(&value, "Matrix").unwrap();
        let decoded = registry().decode(&bytes, "Matrix").unwrap();
        prop_assert_eq!(registry().encode(&decoded, "Matrix").unwrap(), bytes);
    }
}
