//! swf-codec-core: declarative schema registry with binary and JSON codecs.
//!
//! Types are described as data ([`schema`]), collected into an immutable
//! [`SchemaRegistry`], and driven through either adapter:
//!
//! ```
//! use swf_codec_core::schema::{prim, RecordSpec};
//! use swf_codec_core::{SchemaRegistry, Value};
//!
//! let mut builder = SchemaRegistry::builder();
//! builder.record(RecordSpec::new("SetBackgroundColor").required("color", prim::u16()));
//! let registry = builder.build().unwrap();
//! let value = Value::record([("color", Value::Int(0x1234))]);
//! let bytes = registry.encode(&value, "SetBackgroundColor").unwrap();
//! assert_eq!(bytes, [0x34, 0x12]);
//! assert_eq!(registry.decode(&bytes, "SetBackgroundColor").unwrap(), value);
//! ```

pub mod binary;
pub mod bits;
pub mod case;
pub mod coerce;
pub mod config;
pub mod error;
pub mod fixed;
pub mod json;
pub mod registry;
pub mod schema;
pub mod value;

pub use binary::BinaryCodec;
pub use case::CaseStyle;
pub use config::{Canonical, CodecConfig, UnknownFieldPolicy};
pub use error::{CodecError, CodecResult, ErrorKind, ErrorPath, PathSegment, SchemaError};
pub use fixed::{FixedKind, FixedPoint};
pub use json::JsonCodec;
pub use registry::{SchemaBuilder, SchemaRegistry, TypeDef};
pub use value::{Record, Value, ValueKind};
