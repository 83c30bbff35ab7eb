//! swf-tree-export: inspect the SWF registry from the command line.
//!
//! - `swf-tree-export schema` prints every declaration as JSON
//! - `swf-tree-export types` lists registered type names
//! - `swf-tree-export decode Tag 4302ff0000` prints the JSON form
//! - `swf-tree-export encode Tag tag.json` prints the hex form

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use swf_codec_core::{Canonical, CodecConfig, SchemaRegistry, UnknownFieldPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swf-tree-export")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    codec: CodecFlags,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CodecFlags {
    /// Accept non-canonical binary input
    #[arg(long, global = true)]
    lenient: bool,

    /// Skip unknown JSON keys instead of rejecting them
    #[arg(long, global = true)]
    allow_unknown_fields: bool,

    /// Maximum nesting of records, arrays and variants
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

impl CodecFlags {
    fn config(&self) -> CodecConfig {
        let mut config = CodecConfig::default();
        if self.lenient {
            config.canonical = Canonical::Lenient;
        }
        if self.allow_unknown_fields {
            config.unknown_fields = UnknownFieldPolicy::Ignore;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registry declarations as JSON
    Schema {
        /// Only print this type
        #[arg(long)]
        only: Option<String>,
    },

    /// List registered type names
    Types,

    /// Decode binary input into JSON
    Decode {
        /// Registered type name, e.g. `Tag` or `TagStream`
        type_name: String,
        /// Hex string, or `@path` to read raw bytes from a file
        input: String,
    },

    /// Encode a JSON document into hex
    Encode {
        /// Registered type name
        type_name: String,
        /// JSON document path
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = swf_tree::registry();
    let config = cli.codec.config();
    log::debug!("codec config: {config:?}");

    match cli.command {
        Command::Schema { only } => {
            let doc = match only {
                Some(name) => {
                    let codec = registry
                        .resolve(&name)
                        .ok_or_else(|| anyhow!("unknown type `{name}`"))?;
                    serde_json::to_value(codec)?
                }
                None => serde_json::to_value(registry)?,
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Types => {
            let mut names: Vec<&str> = registry.names().collect();
            names.sort_unstable();
            for name in names {
                println!("{name}");
            }
        }
        Command::Decode { type_name, input } => {
            let bytes = read_input(&input)?;
            let value = registry
                .binary_with(config)
                .decode(&bytes, &type_name)
                .with_context(|| format!("decoding {} bytes as `{type_name}`", bytes.len()))?;
            let doc = registry
                .json_with(config)
                .encode(&value, &type_name)
                .with_context(|| format!("rendering `{type_name}` as JSON"))?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Encode { type_name, file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let doc: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let bytes = encode(registry, config, &doc, &type_name)?;
            println!("{}", hex::encode(bytes));
        }
    }
    Ok(())
}

fn encode(
    registry: &SchemaRegistry,
    config: CodecConfig,
    doc: &serde_json::Value,
    type_name: &str,
) -> Result<Vec<u8>> {
    let value = registry
        .json_with(config)
        .decode(doc, type_name)
        .with_context(|| format!("reading JSON as `{type_name}`"))?;
    registry
        .binary_with(config)
        .encode(&value, type_name)
        .with_context(|| format!("encoding `{type_name}`"))
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    match input.strip_prefix('@') {
        Some(path) => fs::read(path).with_context(|| format!("reading {path}")),
        None => {
            let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&digits).context("input is neither hex nor @file")
        }
    }
}
