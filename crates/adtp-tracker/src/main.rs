//! adtp-tracker binary entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adtp_crypto::Identity;
use adtp_tracker::{MemoryStore, Tracker};

#[derive(Parser)]
#[command(name = "adtp-tracker")]
#[command(about = "AirDispatch tracking server - a trust-rooted directory for the overlay")]
struct Args {
    /// Port on which to run the tracking server
    #[arg(short, long, default_value_t = adtp_net::DEFAULT_TRACKER_PORT, env = "ADTP_TRACKER_PORT")]
    port: u16,

    /// File that will save or load the tracker identity
    #[arg(short, long, env = "ADTP_TRACKER_KEY")]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let identity = match &args.key {
        Some(path) if path.exists() => {
            Identity::load_from_file(path).context("unable to load tracker key")?
        }
        key => {
            let identity = Identity::generate();
            if let Some(path) = key {
                identity
                    .save_to_file(path)
                    .context("unable to save tracker key")?;
            }
            identity
        }
    };
    info!("loaded address {}", identity.fingerprint());

    let tracker = Tracker::new(Arc::new(identity), Arc::new(MemoryStore::new()));
    tracker.start_server(args.port).await?;

    Ok(())
}
