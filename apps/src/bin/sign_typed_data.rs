use std::{fs, path::PathBuf};

use alloy_signer_local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::Parser;
use sig_util::{sign_typed_data, typed_data_hash, SignTypedDataOptions, SignTypedDataVersion, TypedData};
use tracing::{debug, info};

/// Signs every typed data document in a file.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding one or more typed data documents. Documents may be concatenated.
    #[clap(long = "file", value_name = "FILE")]
    file_path: PathBuf,

    /// Signing scheme (V1, V3 or V4).
    #[clap(long, default_value = "V4")]
    version: SignTypedDataVersion,

    /// Hex-encoded secp256k1 private key. A random key is used when absent.
    #[clap(long, env = "USER_PRIVATE_KEY")]
    private_key: Option<PrivateKeySigner>,
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

    let signer = args.private_key.unwrap_or_else(|| {
        info!("No private key supplied, generating a random one");
        PrivateKeySigner::random()
    });

    let contents = fs::read_to_string(&args.file_path)
        .with_context(|| format!("failed to read {}", args.file_path.display()))?;

    let documents = serde_json::Deserializer::from_str(&contents).into_iter::<serde_json::Value>();
    let mut count = 0usize;
    for (index, document) in documents.enumerate() {
        let document = document.with_context(|| format!("document {index} is not valid JSON"))?;
        let data = TypedData::from_json(document)?;

        let hash = typed_data_hash(&data, args.version)?;
        let signature = sign_typed_data(&SignTypedDataOptions {
            private_key: Some(signer.to_bytes()),
            data: Some(data),
            version: args.version,
        })?;

        println!("Document {index}");
        println!("  Hash: {hash}");
        println!("  Signature: {signature}");
        count += 1;
    }

    if count == 0 {
        bail!("no typed data documents found in {}", args.file_path.display());
    }

    println!("Signer: {:#x}", signer.address());
    Ok(())
}
