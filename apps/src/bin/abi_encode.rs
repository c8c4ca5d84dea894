use std::{fs, path::PathBuf};

use alloy_primitives::hex;
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use sig_util::{solidity_pack, AbiEncoder, Value};
use tracing::debug;

/// ABI-encodes (or tightly packs) a list of values.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON file of the form `{ "types": [...], "values": [...] }`.
    #[clap(long = "file", value_name = "FILE")]
    file_path: PathBuf,

    /// Use `abi.encodePacked` layout instead of the standard ABI.
    #[clap(long)]
    packed: bool,

    /// Reject fixed-size arrays given fewer elements than their size.
    #[clap(long, conflicts_with = "packed")]
    strict: bool,
}

#[derive(Deserialize)]
struct EncodeRequest {
    types: Vec<String>,
    values: Vec<Value>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }

    let args = Args::parse();

    let contents = fs::read_to_string(&args.file_path)
        .with_context(|| format!("failed to read {}", args.file_path.display()))?;
    let request: EncodeRequest = serde_json::from_str(&contents)?;
    debug!(types = ?request.types, "encoding {} values", request.values.len());

    let encoded = if args.packed {
        solidity_pack(&request.types, &request.values)?
    } else {
        AbiEncoder::new()
            .with_strict_arrays(args.strict)
            .encode(&request.types, &request.values)?
    };

    println!("{}", hex::encode_prefixed(encoded));
    Ok(())
}
