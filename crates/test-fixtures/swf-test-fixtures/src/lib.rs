//! Shared tag samples: a JSON document and its wire bytes per entry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    samples: HashMap<String, SampleEntry>,
}

#[derive(Debug, Deserialize)]
struct SampleEntry {
    /// Registry type the sample decodes as.
    #[serde(rename = "type")]
    type_name: String,
    json: String,
    hex: String,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod samples {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.samples.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn type_name(name: &str) -> Result<&'static str> {
        let entry = lookup(&MANIFEST.samples, "sample", name)?;
        Ok(entry.type_name.as_str())
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.samples, "sample", name)?;
        read_to_string(&entry.json)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.samples, "sample", name)?;
        let text = read_to_string(&entry.json)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse JSON fixture {}", entry.json))
    }

    /// Wire bytes; the hex file may spread them over whitespace-separated groups.
    pub fn bytes(name: &str) -> Result<Vec<u8>> {
        let entry = lookup(&MANIFEST.samples, "sample", name)?;
        let text = read_to_string(&entry.hex)?;
        let digits: String = text.split_whitespace().collect();
        hex::decode(&digits).with_context(|| format!("malformed hex fixture {}", entry.hex))
    }
}
