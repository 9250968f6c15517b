use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use openehr::Composition;
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vpr_codec::constants::{DEFAULT_MAX_DEPTH, WALKER_MODE_ENV};
use vpr_codec::{walker_mode_from_env_value, CodecConfig, Decoder, Encoder, WalkerMode};

#[derive(Parser)]
#[command(name = "vpr")]
#[command(about = "VPR composition storage codec")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a composition for storage
    Encode {
        /// Composition file (.json, or .yaml/.yml)
        file: PathBuf,
        /// Walker mode: path, named, expanded or raw (overrides VPR_WALKER_MODE)
        #[arg(long)]
        mode: Option<WalkerMode>,
        /// Print on one line
        #[arg(long)]
        compact: bool,
        /// Treat the file as a stand-alone item structure (JSON only)
        #[arg(long)]
        structure: bool,
    },
    /// Print the containment labels of a composition
    Labels {
        /// Composition file (.json, or .yaml/.yml)
        file: PathBuf,
    },
    /// Rebuild canonical JSON from a flattened document
    Decode {
        /// Flattened document (JSON)
        file: PathBuf,
        /// Print on one line
        #[arg(long)]
        compact: bool,
    },
}

/// Entry point for the `vpr` command.
///
/// # Environment Variables
/// - `VPR_WALKER_MODE`: default walker mode for `encode` (default: "path")
/// - `RUST_LOG`: log filter, added to the default `vpr=info`
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("vpr=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let env_mode = walker_mode_from_env_value(std::env::var(WALKER_MODE_ENV).ok())?;

    match cli.command {
        Some(Commands::Encode {
            file,
            mode,
            compact,
            structure,
        }) => {
            let config = CodecConfig::new(mode.unwrap_or(env_mode), DEFAULT_MAX_DEPTH)?;
            tracing::debug!(mode = %config.walker_mode(), file = %file.display(), "encode");
            let encoder = Encoder::new(&config);
            let encoded = if structure {
                let text = read_text(&file)?;
                let structure = openehr::read_item_structure_json(&text)
                    .with_context(|| format!("reading {}", file.display()))?;
                encoder.encode_item_structure(&structure)?
            } else {
                encoder.encode_composition(&read_composition(&file)?)?
            };
            print_json(&Value::Object(encoded.document), compact)?;
        }
        Some(Commands::Labels { file }) => {
            let config = CodecConfig::new(env_mode, DEFAULT_MAX_DEPTH)?;
            let encoded = Encoder::new(&config).encode_composition(&read_composition(&file)?)?;
            if encoded.containment.is_empty() {
                println!("No archetype slots found.");
            }
            for (label, path) in &encoded.containment {
                println!("{label}\t{path}");
            }
        }
        Some(Commands::Decode { file, compact }) => {
            let text = read_text(&file)?;
            let document: Map<String, Value> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let decoded = Decoder::new(&CodecConfig::default()).decode(&document)?;
            print_json(&Value::Object(decoded), compact)?;
        }
        None => {
            println!("Use 'vpr --help' for commands");
        }
    }

    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_composition(path: &Path) -> anyhow::Result<Composition> {
    let text = read_text(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let composition = if is_yaml {
        openehr::read_composition_yaml(&text)
    } else {
        openehr::read_composition_json(&text)
    };
    composition.with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &Value, compact: bool) -> anyhow::Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}
