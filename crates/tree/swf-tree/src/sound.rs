use swf_codec_core::schema::{prim, EnumSpec, FieldSpec, Presence, Primitive, RecordSpec};
use swf_codec_core::SchemaBuilder;

use crate::decl::{reserved_bits, rest, tag, ty};

fn bits(width: u8) -> Primitive {
    Primitive::Bits {
        width,
        signed: false,
    }
}

pub(crate) fn declare(b: &mut SchemaBuilder) {
    b.enumeration(
        EnumSpec::new("SoundRate", bits(2))
            .variant("Rate5500", 0)
            .variant("Rate11025", 1)
            .variant("Rate22050", 2)
            .variant("Rate44100", 3),
    );
    b.enumeration(
        EnumSpec::new("SoundSize", bits(1))
            .variant("Bits8", 0)
            .variant("Bits16", 1),
    );
    b.enumeration(
        EnumSpec::new("SoundType", bits(1))
            .variant("Mono", 0)
            .variant("Stereo", 1),
    );
    b.enumeration(
        EnumSpec::new("AudioCodingFormat", bits(4))
            .variant("UncompressedNativeEndian", 0)
            .variant("Adpcm", 1)
            .variant("Mp3", 2)
            .variant("UncompressedLittleEndian", 3)
            .variant("Nellymoser16", 4)
            .variant("Nellymoser8", 5)
            .variant("Nellymoser", 6)
            .variant("Speex", 11),
    );

    b.record(
        tag("DefineSound")
            .required("id", prim::u16())
            .required("format", ty("AudioCodingFormat"))
            .required("soundRate", ty("SoundRate"))
            .required("soundSize", ty("SoundSize"))
            .required("soundType", ty("SoundType"))
            .required("sampleCount", prim::u32())
            .required("data", rest()),
    );
    b.record(stream_head(tag("SoundStreamHead")));
    b.record(stream_head(tag("SoundStreamHead2")));
    b.record(tag("SoundStreamBlock").required("data", rest()));
}

/// SOUNDSTREAMHEAD body, shared by both stream head tags.
///
/// The latency seek is only written for MP3 streams; since it ends the body,
/// its presence is read from the remaining length.
fn stream_head(rec: RecordSpec) -> RecordSpec {
    rec.field(reserved_bits("reserved", 4))
        .required("playbackRate", ty("SoundRate"))
        .required("playbackSize", ty("SoundSize"))
        .required("playbackType", ty("SoundType"))
        .required("compression", ty("AudioCodingFormat"))
        .required("streamRate", ty("SoundRate"))
        .required("streamSize", ty("SoundSize"))
        .required("streamType", ty("SoundType"))
        .required("sampleCount", prim::u16())
        .field(FieldSpec::optional("latencySeek", prim::i16(), Presence::Remaining))
}
