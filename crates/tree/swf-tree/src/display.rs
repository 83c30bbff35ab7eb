//! Display list placement tags and the clip event handlers they attach.

use swf_codec_core::schema::{prim, FieldSpec, IntKind, LengthPrefix, Presence, RecordSpec, SizeSpec};
use swf_codec_core::{SchemaBuilder, Value};

use crate::decl::{counted, reserved_bits, rest, tag, terminated, ty, when};

/// CLIPEVENTFLAGS in file order, most significant bit first.
const EVENTS: [&str; 16] = [
    "keyUp",
    "keyDown",
    "mouseUp",
    "mouseDown",
    "mouseMove",
    "unload",
    "enterFrame",
    "load",
    "dragOver",
    "rollOut",
    "rollOver",
    "releaseOutside",
    "release",
    "press",
    "initialize",
    "data",
];

pub(crate) fn declare(b: &mut SchemaBuilder) {
    b.record(
        EVENTS
            .iter()
            .fold(RecordSpec::new("ClipEventFlags"), |rec, name| {
                rec.required(*name, prim::bit())
            })
            .field(reserved_bits("reserved", 5))
            .required("construct", prim::bit())
            .required("keyPress", prim::bit())
            .required("dragOut", prim::bit())
            .field(reserved_bits("reserved2", 8)),
    );
    // the record size counts the key code too
    b.record(
        RecordSpec::new("ClipAction")
            .required("events", ty("ClipEventFlags"))
            .field(FieldSpec::size("actionRecordSize", SizeSpec::new(IntKind::U32)))
            .field(FieldSpec::optional(
                "keyCode",
                prim::u8(),
                Presence::WhenTrue("events.keyPress".into()),
            ))
            .required("actions", rest()),
    );
    b.record(
        RecordSpec::new("ClipActions")
            .field(FieldSpec::reserved("reserved", prim::u16(), Value::Int(0)))
            .required("allEvents", ty("ClipEventFlags"))
            .required("records", terminated("ClipAction", 32, true)),
    );

    b.record(
        tag("PlaceObject")
            .required("characterId", prim::u16())
            .required("depth", prim::u16())
            .required("matrix", ty("Matrix"))
            .field(FieldSpec::optional(
                "colorTransform",
                ty("ColorTransform"),
                Presence::Remaining,
            )),
    );
    b.record(
        placement(tag("PlaceObject2").field(FieldSpec::presence_header("flags", 7)))
            .field(when("flags", 6, "clipActions", ty("ClipActions"))),
    );
    declare_place_object3(b);

    b.record(
        tag("RemoveObject")
            .required("characterId", prim::u16())
            .required("depth", prim::u16()),
    );
    b.record(tag("RemoveObject2").required("depth", prim::u16()));
}

/// PlaceObject2 after its flags, up to the clip actions.
fn placement(rec: RecordSpec) -> RecordSpec {
    rec.required("isUpdate", prim::bit())
        .required("depth", prim::u16())
        .field(when("flags", 0, "characterId", prim::u16()))
        .field(when("flags", 1, "matrix", ty("Matrix")))
        .field(when("flags", 2, "colorTransform", ty("ColorTransformWithAlpha")))
        .field(when("flags", 3, "ratio", prim::u16()))
        .field(when("flags", 4, "name", prim::cstring()))
        .field(when("flags", 5, "clipDepth", prim::u16()))
}

/// PlaceObject3. The flag bytes are split around `hasImage`, the only flag
/// that is a plain value rather than a presence bit.
fn declare_place_object3(b: &mut SchemaBuilder) {
    b.record(
        tag("PlaceObject3")
            .field(FieldSpec::presence_header("flags", 7))
            .required("isUpdate", prim::bit())
            .field(reserved_bits("reserved", 1))
            .field(FieldSpec::presence_header("flags2", 2))
            .required("hasImage", prim::bit())
            .field(FieldSpec::presence_header("flags3", 4))
            .required("depth", prim::u16())
            .field(when("flags3", 3, "className", prim::cstring()))
            .field(when("flags", 0, "characterId", prim::u16()))
            .field(when("flags", 1, "matrix", ty("Matrix")))
            .field(when("flags", 2, "colorTransform", ty("ColorTransformWithAlpha")))
            .field(when("flags", 3, "ratio", prim::u16()))
            .field(when("flags", 4, "name", prim::cstring()))
            .field(when("flags", 5, "clipDepth", prim::u16()))
            .field(when(
                "flags3",
                0,
                "filters",
                counted("Filter", LengthPrefix::Int(IntKind::U8)),
            ))
            .field(when("flags3", 1, "blendMode", ty("BlendMode")))
            .field(when("flags3", 2, "bitmapCache", prim::bool_byte()))
            .field(when("flags2", 0, "visible", prim::bool_byte()))
            .field(when("flags2", 1, "backgroundColor", ty("StraightSRgba8")))
            .field(when("flags", 6, "clipActions", ty("ClipActions"))),
    );
}
