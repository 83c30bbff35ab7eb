//! swf-tree: the SWF data model declared as schema data.
//!
//! Every record, filter, shape and tag type is registered by name in one
//! [`SchemaRegistry`]; decoding and encoding go through the registry's binary
//! and JSON adapters. Tags are read with the `Tag` type (one framed tag) or
//! `TagStream` (tags up to the End tag).

mod basic_types;
mod bitmaps;
mod button;
mod decl;
mod display;
mod filters;
mod fonts;
mod shapes;
mod sound;
mod tags;
mod text;

use once_cell::sync::Lazy;
use swf_codec_core::{SchemaError, SchemaRegistry};

pub use swf_codec_core;

/// One framed tag.
pub const TAG: &str = "Tag";
/// Tags up to and including the End tag.
pub const TAG_STREAM: &str = "TagStream";

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| match build_registry() {
    Ok(registry) => registry,
    Err(err) => panic!("SWF declarations are inconsistent: {err}"),
});

/// Process-wide registry, built on first use.
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Build a fresh registry from the declarations.
pub fn build_registry() -> Result<SchemaRegistry, SchemaError> {
    let mut builder = SchemaRegistry::builder();
    basic_types::declare(&mut builder);
    filters::declare(&mut builder);
    shapes::declare(&mut builder);
    text::declare(&mut builder);
    fonts::declare(&mut builder);
    bitmaps::declare(&mut builder);
    button::declare(&mut builder);
    display::declare(&mut builder);
    sound::declare(&mut builder);
    tags::declare(&mut builder);
    let registry = builder.build()?;
    log::trace!("swf declarations: {} types", registry.len());
    Ok(registry)
}
