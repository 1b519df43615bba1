use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tryon_relay::application::{ServerConfig, StorageSettings, serve};
use tryon_relay::infrastructure::inference;

#[derive(Debug, Parser)]
#[command(author, version, about = "Relay virtual try-on requests to a hosted model", long_about = None)]
struct Cli {
    #[arg(long, env = "TRYON_BIND_ADDRESS", default_value = "127.0.0.1:3000")]
    bind_address: SocketAddr,

    /// Base URL of the inference space; defaults to the hosted space resolved
    /// from the built-in service identifier.
    #[arg(long, env = "TRYON_INFERENCE_URL")]
    inference_url: Option<String>,

    #[arg(long, env = "SUPABASE_URL")]
    storage_url: Option<String>,

    #[arg(long, env = "SUPABASE_KEY")]
    storage_key: Option<String>,

    #[arg(long, env = "SUPABASE_BUCKET_NAME", default_value = "virtual-try-extracted")]
    bucket: String,

    #[arg(long, env = "TRYON_SCRATCH_DIR", default_value = "temp_images")]
    scratch_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before clap parses env vars)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();

    let storage = match (cli.storage_url, cli.storage_key) {
        (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
            Some(StorageSettings { url, key })
        }
        _ => None,
    };

    let inference_url = cli
        .inference_url
        .unwrap_or_else(|| inference::service_base_url(inference::SERVICE_ID));

    let config = ServerConfig {
        bind_address: cli.bind_address,
        inference_url,
        storage,
        bucket: cli.bucket,
        scratch_dir: cli.scratch_dir,
    };

    serve(config).await
}

#[allow(clippy::expect_used)] // Startup: panicking is appropriate if logging cannot be initialized
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("RUST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
}
