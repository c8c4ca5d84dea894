use std::{fs, path::PathBuf};

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::Parser;
use sig_util::{recover_typed_signature, RecoverTypedSignatureOptions, SignTypedDataVersion, TypedData};
use tracing::debug;

/// Recovers the address that signed a typed data document.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding a single typed data document.
    #[clap(long = "file", value_name = "FILE")]
    file_path: PathBuf,

    /// Signing scheme (V1, V3 or V4).
    #[clap(long, default_value = "V4")]
    version: SignTypedDataVersion,

    /// 65-byte `0x`-prefixed signature.
    #[clap(long)]
    signature: String,

    /// Fail unless the recovered address matches.
    #[clap(long, env = "EXPECTED_SIGNER")]
    expected: Option<Address>,
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
    let document: serde_json::Value = serde_json::from_str(&contents)?;

    let signer = recover_typed_signature(&RecoverTypedSignatureOptions {
        data: Some(TypedData::from_json(document)?),
        signature: Some(args.signature),
        version: args.version,
    })?;

    if let Some(expected) = args.expected {
        if signer != expected {
            bail!(
                "Recovered address {:#x} does not match expected address {:#x}",
                signer,
                expected
            );
        }
    }

    println!("Signer: {:#x}", signer);
    Ok(())
}
