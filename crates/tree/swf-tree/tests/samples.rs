use serde_json::Value as JsonValue;
use swf_test_fixtures::samples;
use swf_tree::registry;

#[test]
fn samples_decode_to_their_json() {
    let reg = registry();
    for name in samples::keys() {
        let ty = samples::type_name(&name).unwrap();
        let bytes = samples::bytes(&name).unwrap();
        let doc: JsonValue = samples::load(&name).unwrap();

        let value = reg
            .decode(&bytes, ty)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(reg.encode_json(&value, ty).unwrap(), doc, "{name}");
        assert_eq!(reg.decode_json(&doc, ty).unwrap(), value, "{name}");
    }
}

#[test]
fn samples_reencode_byte_for_byte() {
    let reg = registry();
    for name in samples::keys() {
        let ty = samples::type_name(&name).unwrap();
        let doc: JsonValue = samples::load(&name).unwrap();
        let value = reg
            .decode_json(&doc, ty)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(reg.encode(&value, ty).unwrap(), samples::bytes(&name).unwrap(), "{name}");
    }
}

#[test]
fn stream_stops_at_the_end_tag() {
    let reg = registry();
    let mut bytes = samples::bytes("stream").unwrap();
    let value = reg.decode(&bytes, swf_tree::TAG_STREAM).unwrap();
    assert_eq!(value.as_array().map(|tags| tags.len()), Some(2));

    bytes.push(0x00);
    let (_, used) = reg
        .binary()
        .decode_prefix(&bytes, swf_tree::TAG_STREAM)
        .unwrap();
    assert_eq!(used, bytes.len() - 1);
}
