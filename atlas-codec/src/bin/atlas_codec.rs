//! Payload codec command line
//!
//! ```text
//! atlas-codec compress|decompress|savings <payload.json>
//! ```
//!
//! The hash lookup table is loaded from and saved to `ATLAS_LOOKUP_PATH`
//! when set. `ATLAS_LOG_JSON` switches logs to JSON lines on stderr.

use anyhow::{bail, Context};
use atlas_codec::{CodecConfig, MemoryHashLookup, Outcome, PayloadCodec};
use serde_json::{json, Value};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if std::env::var("ATLAS_LOG_JSON").is_ok() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (mode, path) = match args.as_slice() {
        [mode, path] => (mode.as_str(), path.as_str()),
        _ => bail!("usage: atlas-codec compress|decompress|savings <payload.json>"),
    };

    let config = CodecConfig::from_env()?;
    let lookup = match &config.lookup_path {
        Some(p) if p.exists() => MemoryHashLookup::load_from(p)
            .with_context(|| format!("loading lookup table {}", p.display()))?,
        _ => MemoryHashLookup::new(),
    };
    let lookup = Arc::new(lookup);
    let codec = PayloadCodec::new(lookup.clone(), config.clone());

    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let input: Value = serde_json::from_str(&content).with_context(|| format!("parsing {}", path))?;

    let output = match mode {
        "compress" => report(codec.compress(&input)),
        "decompress" => report(codec.decompress(&input)),
        "savings" => {
            let (outcome, savings) = codec.compress_measured(&input);
            json!({ "compressed": report(outcome), "savings": savings })
        }
        other => bail!("unknown mode '{}'", other),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(p) = &config.lookup_path {
        lookup
            .save_to(p)
            .with_context(|| format!("saving lookup table {}", p.display()))?;
    }

    Ok(())
}

fn report(outcome: Outcome<Value>) -> Value {
    for degradation in &outcome.degradations {
        tracing::warn!("Degraded: {}", degradation);
    }
    outcome.value
}
